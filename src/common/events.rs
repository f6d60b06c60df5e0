use std::fmt;

use super::types::{Message, OutgoingMessage, UserId, UserRecord};

/// Which request an outcome belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Register,
    Login,
    Roster,
    History,
    Connect,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RequestKind::Register => "register",
            RequestKind::Login => "login",
            RequestKind::Roster => "roster",
            RequestKind::History => "history",
            RequestKind::Connect => "connect",
        };
        f.write_str(label)
    }
}

/// Events the network task sends up to the UI.
#[derive(Debug, Clone)]
pub enum NetworkEvent {
    Registered(UserRecord),
    LoggedIn(UserRecord),
    RosterLoaded(Vec<UserRecord>),
    /// History snapshot, tagged with the peer it was requested for.
    HistoryLoaded {
        peer_id: UserId,
        messages: Vec<Message>,
    },
    MessageReceived(Message),
    /// The frame was written to the socket. Not a delivery receipt.
    MessageSent(OutgoingMessage),
    SendFailed {
        message: OutgoingMessage,
        reason: String,
    },
    SocketOpened(UserId),
    SocketClosed,
    RequestFailed {
        request: RequestKind,
        reason: String,
    },
}
