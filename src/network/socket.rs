use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::common::{Message, OutgoingMessage, Result, UserId};
use crate::config::Endpoints;

pub type SocketStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// What one inbound frame means for the client.
#[derive(Debug)]
pub enum Inbound {
    Message(Message),
    Ping(Vec<u8>),
    Closed,
    /// Pong, binary or other frames we have no use for.
    Ignored,
}

/// Live socket for one session.
pub struct ChatSocket {
    user_id: UserId,
    stream: SocketStream,
}

impl ChatSocket {
    pub async fn connect(endpoints: &Endpoints, user_id: UserId) -> Result<Self> {
        let url = endpoints.socket(user_id);
        log::info!("Opening socket {url}");
        let (stream, _response) = connect_async(url.as_str()).await?;
        Ok(Self { user_id, stream })
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub async fn send(&mut self, message: &OutgoingMessage) -> Result<()> {
        self.stream.send(encode_outgoing(message)?).await?;
        Ok(())
    }

    pub async fn pong(&mut self, payload: Vec<u8>) -> Result<()> {
        self.stream.send(WsMessage::Pong(payload)).await?;
        Ok(())
    }

    /// Next decoded frame. A stream error or end maps to `Closed`;
    /// a frame that fails to decode is returned as an error.
    pub async fn next_inbound(&mut self) -> Result<Inbound> {
        match self.stream.next().await {
            Some(Ok(frame)) => decode_frame(frame),
            Some(Err(err)) => {
                log::warn!("Socket error for user {}: {err}", self.user_id);
                Ok(Inbound::Closed)
            }
            None => Ok(Inbound::Closed),
        }
    }

    pub async fn close(mut self) {
        if let Err(err) = self.stream.close(None).await {
            log::debug!("Closing socket for user {} failed: {err}", self.user_id);
        }
    }
}

pub fn encode_outgoing(message: &OutgoingMessage) -> Result<WsMessage> {
    Ok(WsMessage::Text(serde_json::to_string(message)?))
}

pub fn decode_frame(frame: WsMessage) -> Result<Inbound> {
    match frame {
        WsMessage::Text(text) => Ok(Inbound::Message(serde_json::from_str(&text)?)),
        WsMessage::Ping(payload) => Ok(Inbound::Ping(payload)),
        WsMessage::Close(_) => Ok(Inbound::Closed),
        _ => Ok(Inbound::Ignored),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ChatError;

    #[test]
    fn text_frame_decodes_to_message() {
        let frame = WsMessage::Text(
            r#"{"sender_id":2,"receiver_id":1,"content":"hey","timestamp":"2024-05-01T08:00:00Z"}"#
                .to_string(),
        );

        match decode_frame(frame).unwrap() {
            Inbound::Message(message) => {
                assert_eq!(message.sender_id, UserId(2));
                assert_eq!(message.content, "hey");
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn malformed_text_frame_is_an_error() {
        let frame = WsMessage::Text("{\"sender_id\":".to_string());
        assert!(matches!(
            decode_frame(frame),
            Err(ChatError::Serialization(_))
        ));
    }

    #[test]
    fn control_frames_are_classified() {
        assert!(matches!(
            decode_frame(WsMessage::Ping(vec![1, 2])).unwrap(),
            Inbound::Ping(payload) if payload == vec![1, 2]
        ));
        assert!(matches!(
            decode_frame(WsMessage::Close(None)).unwrap(),
            Inbound::Closed
        ));
        assert!(matches!(
            decode_frame(WsMessage::Binary(vec![0])).unwrap(),
            Inbound::Ignored
        ));
    }

    #[test]
    fn outgoing_encodes_as_text_json() {
        let frame = encode_outgoing(&OutgoingMessage {
            sender_id: UserId(1),
            receiver_id: UserId(2),
            content: "hello".to_string(),
        })
        .unwrap();

        match frame {
            WsMessage::Text(text) => {
                let value: serde_json::Value = serde_json::from_str(&text).unwrap();
                assert_eq!(value["content"], "hello");
                assert!(value.get("timestamp").is_none());
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}
