use super::types::{Credentials, OutgoingMessage, UserId};

/// Commands the UI sends down to the network task.
#[derive(Debug, Clone)]
pub enum NetworkCommand {
    Register(Credentials),
    Login(Credentials),
    /// Fetch the full roster snapshot.
    FetchRoster,
    /// Fetch the whole history between the session and `peer_id`.
    FetchHistory { session_id: UserId, peer_id: UserId },
    /// Open the real-time socket for `user_id`. Replaces any open socket.
    Connect { user_id: UserId },
    SendMessage(OutgoingMessage),
}
