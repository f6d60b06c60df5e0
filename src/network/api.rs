use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;

use crate::common::{ChatError, Credentials, Message, Result, UserId, UserRecord};
use crate::config::Endpoints;

/// Thin wrapper over the backend's REST endpoints. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    endpoints: Endpoints,
}

impl ApiClient {
    pub fn new(endpoints: Endpoints) -> Self {
        Self::with_client(Client::new(), endpoints)
    }

    pub fn with_client(http: Client, endpoints: Endpoints) -> Self {
        Self { http, endpoints }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// `POST /register`
    pub async fn register(&self, credentials: &Credentials) -> Result<UserRecord> {
        self.post_json("register", self.endpoints.register(), credentials)
            .await
    }

    /// `POST /login`. The backend answers 404 for unknown names.
    pub async fn login(&self, credentials: &Credentials) -> Result<UserRecord> {
        self.post_json("login", self.endpoints.login(), credentials)
            .await
    }

    /// `GET /users`
    pub async fn users(&self) -> Result<Vec<UserRecord>> {
        let response = self.http.get(self.endpoints.users()).send().await?;
        decode("users", response).await
    }

    /// `GET /messages?userId1=&userId2=`. Order is not guaranteed.
    pub async fn messages(&self, user_id1: UserId, user_id2: UserId) -> Result<Vec<Message>> {
        let response = self
            .http
            .get(self.endpoints.messages())
            .query(&[("userId1", user_id1.0), ("userId2", user_id2.0)])
            .send()
            .await?;
        decode("messages", response).await
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        url: Url,
        credentials: &Credentials,
    ) -> Result<T> {
        let response = self.http.post(url).json(credentials).send().await?;
        decode(endpoint, response).await
    }
}

async fn decode<T: DeserializeOwned>(endpoint: &'static str, response: Response) -> Result<T> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(ChatError::Status {
            endpoint,
            status: status.as_u16(),
            body: body.trim().to_string(),
        });
    }
    Ok(serde_json::from_str(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Serves one canned HTTP response and reports the raw request it saw.
    async fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (request_tx, request_rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = stream.read(&mut buf).await.unwrap();
                raw.extend_from_slice(&buf[..n]);
                if n == 0 || request_complete(&raw) {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.ok();
            let _ = request_tx.send(String::from_utf8_lossy(&raw).into_owned());
        });

        (format!("http://{addr}"), request_rx)
    }

    fn request_complete(raw: &[u8]) -> bool {
        let text = String::from_utf8_lossy(raw);
        let Some((head, body)) = text.split_once("\r\n\r\n") else {
            return false;
        };
        let length = head
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        body.len() >= length
    }

    fn client_for(base: &str) -> ApiClient {
        let http = Client::builder().no_proxy().build().unwrap();
        ApiClient::with_client(http, Endpoints::new(base, None).unwrap())
    }

    #[tokio::test]
    async fn login_posts_credentials_and_decodes_user() {
        let (base, request) =
            serve_once("200 OK", r#"{"id":4,"first_name":"Ada","last_name":"Lovelace"}"#).await;

        let user = client_for(&base)
            .login(&Credentials::new("Ada", "Lovelace"))
            .await
            .unwrap();

        assert_eq!(user.id, UserId(4));
        assert_eq!(user.display_name(), "Ada Lovelace");

        let request = request.await.unwrap();
        assert!(request.starts_with("POST /login "));
        assert!(request.contains(r#""first_name":"Ada""#));
        assert!(request.contains(r#""last_name":"Lovelace""#));
    }

    #[tokio::test]
    async fn login_not_found_is_a_status_error() {
        let (base, _request) = serve_once("404 Not Found", "User not found").await;

        let err = client_for(&base)
            .login(&Credentials::new("No", "Body"))
            .await
            .unwrap_err();

        match err {
            ChatError::Status {
                endpoint,
                status,
                body,
            } => {
                assert_eq!(endpoint, "login");
                assert_eq!(status, 404);
                assert_eq!(body, "User not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn messages_sends_both_ids_in_query() {
        let (base, request) = serve_once(
            "200 OK",
            r#"[{"sender_id":2,"receiver_id":1,"content":"hi","timestamp":"2024-01-01T00:00:01Z"}]"#,
        )
        .await;

        let messages = client_for(&base)
            .messages(UserId(1), UserId(2))
            .await
            .unwrap();

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "hi");
        let request = request.await.unwrap();
        assert!(request.starts_with("GET /messages?userId1=1&userId2=2 "));
    }

    #[tokio::test]
    async fn malformed_roster_is_a_serialization_error() {
        let (base, _request) = serve_once("200 OK", r#"{"users":"nope"}"#).await;

        let err = client_for(&base).users().await.unwrap_err();

        assert!(matches!(err, ChatError::Serialization(_)));
    }
}
