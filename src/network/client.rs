use std::future::Future;

use tokio::sync::mpsc;

use crate::common::{
    ChatError, Message, NetworkCommand, NetworkEvent, OutgoingMessage, RequestKind, Result,
    UserId,
};

use super::api::ApiClient;
use super::socket::{ChatSocket, Inbound};

/// Network event loop: turns UI commands into HTTP calls and socket frames,
/// and socket frames into UI events.
pub struct ChatClient {
    api: ApiClient,
    event_sender: mpsc::Sender<NetworkEvent>,
    command_receiver: mpsc::Receiver<NetworkCommand>,
    socket: Option<ChatSocket>,
}

impl ChatClient {
    pub fn new(
        api: ApiClient,
        event_sender: mpsc::Sender<NetworkEvent>,
        command_receiver: mpsc::Receiver<NetworkCommand>,
    ) -> Self {
        Self {
            api,
            event_sender,
            command_receiver,
            socket: None,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        log::info!("Network event loop started");

        loop {
            tokio::select! {
                command = self.command_receiver.recv() => {
                    if let Some(command) = command {
                        self.handle_command(command).await;
                    } else {
                        break;
                    }
                }
                inbound = next_inbound(&mut self.socket) => {
                    self.handle_inbound(inbound).await;
                }
            }
        }

        if let Some(socket) = self.socket.take() {
            socket.close().await;
        }
        log::info!("Network event loop stopped");
        Ok(())
    }

    async fn handle_command(&mut self, command: NetworkCommand) {
        match command {
            NetworkCommand::Register(credentials) => {
                let api = self.api.clone();
                self.spawn_request(RequestKind::Register, async move {
                    api.register(&credentials).await.map(NetworkEvent::Registered)
                });
            }
            NetworkCommand::Login(credentials) => {
                let api = self.api.clone();
                self.spawn_request(RequestKind::Login, async move {
                    api.login(&credentials).await.map(NetworkEvent::LoggedIn)
                });
            }
            NetworkCommand::FetchRoster => {
                let api = self.api.clone();
                self.spawn_request(RequestKind::Roster, async move {
                    api.users().await.map(NetworkEvent::RosterLoaded)
                });
            }
            NetworkCommand::FetchHistory {
                session_id,
                peer_id,
            } => {
                let api = self.api.clone();
                self.spawn_request(RequestKind::History, async move {
                    api.messages(session_id, peer_id)
                        .await
                        .map(|messages| NetworkEvent::HistoryLoaded { peer_id, messages })
                });
            }
            NetworkCommand::Connect { user_id } => self.connect(user_id).await,
            NetworkCommand::SendMessage(message) => self.send_message(message).await,
        }
    }

    /// HTTP requests are independent: no cancellation, no ordering between them.
    fn spawn_request<F>(&self, request: RequestKind, task: F)
    where
        F: Future<Output = Result<NetworkEvent>> + Send + 'static,
    {
        let event_sender = self.event_sender.clone();
        tokio::spawn(async move {
            let event = match task.await {
                Ok(event) => event,
                Err(err) => {
                    log::warn!("{request} request failed: {err}");
                    NetworkEvent::RequestFailed {
                        request,
                        reason: err.to_string(),
                    }
                }
            };
            if let Err(err) = event_sender.send(event).await {
                log::warn!("Failed to notify UI about {request} result: {err}");
            }
        });
    }

    async fn connect(&mut self, user_id: UserId) {
        if let Some(previous) = self.socket.take() {
            log::info!(
                "Replacing socket of user {} with user {user_id}",
                previous.user_id()
            );
            previous.close().await;
        }

        match ChatSocket::connect(self.api.endpoints(), user_id).await {
            Ok(socket) => {
                log::info!("Socket connection established for user {user_id}");
                self.socket = Some(socket);
                self.emit(NetworkEvent::SocketOpened(user_id)).await;
            }
            Err(err) => {
                log::error!("Socket connection for user {user_id} failed: {err}");
                self.emit(NetworkEvent::RequestFailed {
                    request: RequestKind::Connect,
                    reason: err.to_string(),
                })
                .await;
            }
        }
    }

    async fn send_message(&mut self, message: OutgoingMessage) {
        let result = match self.socket.as_mut() {
            Some(socket) => socket.send(&message).await,
            None => Err(ChatError::NotConnected),
        };

        let event = match result {
            Ok(()) => {
                log::debug!(
                    "Sent message from {} to {}",
                    message.sender_id,
                    message.receiver_id
                );
                NetworkEvent::MessageSent(message)
            }
            Err(err) => {
                log::warn!("Send to {} failed: {err}", message.receiver_id);
                NetworkEvent::SendFailed {
                    message,
                    reason: err.to_string(),
                }
            }
        };
        self.emit(event).await;
    }

    async fn handle_inbound(&mut self, inbound: Result<Inbound>) {
        match inbound {
            Ok(Inbound::Message(message)) => self.forward_message(message).await,
            Ok(Inbound::Ping(payload)) => {
                if let Some(socket) = self.socket.as_mut() {
                    if let Err(err) = socket.pong(payload).await {
                        log::warn!("Failed to answer ping: {err}");
                    }
                }
            }
            Ok(Inbound::Closed) => {
                self.socket = None;
                log::info!("Socket connection closed; reconnection is not attempted");
                self.emit(NetworkEvent::SocketClosed).await;
            }
            Ok(Inbound::Ignored) => {}
            Err(err) => log::error!("Dropping malformed socket frame: {err}"),
        }
    }

    async fn forward_message(&self, message: Message) {
        log::debug!(
            "Message received from {} to {}",
            message.sender_id,
            message.receiver_id
        );
        self.emit(NetworkEvent::MessageReceived(message)).await;
    }

    async fn emit(&self, event: NetworkEvent) {
        if let Err(err) = self.event_sender.send(event).await {
            log::warn!("Failed to notify UI: {err}");
        }
    }
}

/// Resolves only while a socket is open; otherwise stays pending so the
/// select loop just waits on commands.
async fn next_inbound(socket: &mut Option<ChatSocket>) -> Result<Inbound> {
    match socket {
        Some(socket) => socket.next_inbound().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Credentials;
    use crate::config::Endpoints;
    use futures::{SinkExt, StreamExt};
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio::time::timeout;
    use tokio_tungstenite::accept_async;
    use tokio_tungstenite::tungstenite::Message as WsMessage;

    const WAIT: Duration = Duration::from_secs(5);

    fn spawn_client(base: &str) -> (mpsc::Sender<NetworkCommand>, mpsc::Receiver<NetworkEvent>) {
        let http = reqwest::Client::builder().no_proxy().build().unwrap();
        let api = ApiClient::with_client(http, Endpoints::new(base, None).unwrap());
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (event_tx, event_rx) = mpsc::channel(16);
        tokio::spawn(ChatClient::new(api, event_tx, cmd_rx).run());
        (cmd_tx, event_rx)
    }

    async fn next_event(events: &mut mpsc::Receiver<NetworkEvent>) -> NetworkEvent {
        timeout(WAIT, events.recv())
            .await
            .expect("timed out waiting for network event")
            .expect("network loop stopped")
    }

    #[tokio::test]
    async fn send_without_socket_reports_not_connected() {
        let (commands, mut events) = spawn_client("http://127.0.0.1:9");

        commands
            .send(NetworkCommand::SendMessage(OutgoingMessage {
                sender_id: UserId(1),
                receiver_id: UserId(2),
                content: "hello".to_string(),
            }))
            .await
            .unwrap();

        match next_event(&mut events).await {
            NetworkEvent::SendFailed { message, reason } => {
                assert_eq!(message.content, "hello");
                assert_eq!(reason, "WebSocket is not connected.");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn failed_login_becomes_request_failed_event() {
        // Nothing listens on the discard port.
        let (commands, mut events) = spawn_client("http://127.0.0.1:9");

        commands
            .send(NetworkCommand::Login(Credentials::new("Ada", "Lovelace")))
            .await
            .unwrap();

        match next_event(&mut events).await {
            NetworkEvent::RequestFailed { request, .. } => assert_eq!(request, RequestKind::Login),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn socket_round_trip_against_fake_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (received_tx, mut received_rx) = mpsc::channel::<String>(4);

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            ws.send(WsMessage::Text(
                r#"{"sender_id":2,"receiver_id":1,"content":"hi","timestamp":"2024-05-01T08:00:00Z"}"#
                    .to_string(),
            ))
            .await
            .unwrap();
            ws.send(WsMessage::Text("not json".to_string())).await.unwrap();
            while let Some(Ok(frame)) = ws.next().await {
                if let WsMessage::Text(text) = frame {
                    received_tx.send(text).await.unwrap();
                    break;
                }
            }
            ws.close(None).await.ok();
        });

        let (commands, mut events) = spawn_client(&format!("http://{addr}"));
        commands
            .send(NetworkCommand::Connect { user_id: UserId(1) })
            .await
            .unwrap();

        assert!(matches!(
            next_event(&mut events).await,
            NetworkEvent::SocketOpened(UserId(1))
        ));
        match next_event(&mut events).await {
            NetworkEvent::MessageReceived(message) => {
                assert_eq!(message.sender_id, UserId(2));
                assert_eq!(message.content, "hi");
            }
            other => panic!("unexpected event: {other:?}"),
        }

        commands
            .send(NetworkCommand::SendMessage(OutgoingMessage {
                sender_id: UserId(1),
                receiver_id: UserId(2),
                content: "yo".to_string(),
            }))
            .await
            .unwrap();

        match next_event(&mut events).await {
            NetworkEvent::MessageSent(message) => assert_eq!(message.content, "yo"),
            other => panic!("unexpected event: {other:?}"),
        }

        let sent = timeout(WAIT, received_rx.recv()).await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&sent).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"sender_id": 1, "receiver_id": 2, "content": "yo"})
        );

        // The malformed frame was dropped; the next event is the close.
        assert!(matches!(
            next_event(&mut events).await,
            NetworkEvent::SocketClosed
        ));
    }
}
