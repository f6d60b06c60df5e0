use std::collections::{HashMap, HashSet, VecDeque};

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::common::{
    Message, NetworkCommand, NetworkEvent, OutgoingMessage, RequestKind, UserId, UserRecord,
};

/// Cap on retained diagnostics.
pub const MAX_DEBUG_EVENTS: usize = 100;

/// Debug event shown in the diagnostics panel.
#[derive(Debug, Clone)]
pub struct DebugEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Author {
    Me,
    Peer,
}

/// Local progress of an entry. `Sent` only means the frame left this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sending,
    Sent,
    Failed,
}

/// One rendered line of the active conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Stable widget id for the chat area.
    pub id: Uuid,
    pub author: Author,
    pub content: String,
    /// `None` until the server has stamped the message.
    pub timestamp: Option<DateTime<Utc>>,
    pub delivery: Delivery,
}

impl LogEntry {
    fn stored(author: Author, message: &Message) -> Self {
        Self {
            id: Uuid::new_v4(),
            author,
            content: message.content.clone(),
            timestamp: Some(message.timestamp),
            delivery: Delivery::Sent,
        }
    }

    fn optimistic(content: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            author: Author::Me,
            content,
            timestamp: None,
            delivery: Delivery::Sending,
        }
    }

    /// Rendered locally and never stamped by the server.
    fn is_local(&self) -> bool {
        self.author == Author::Me && self.timestamp.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketStatus {
    NotConnected,
    Connecting,
    Open,
    /// Terminal for the session; nothing reopens it.
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A blocking, user-visible alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

/// Register and login inputs.
#[derive(Debug, Clone, Default)]
pub struct AuthForm {
    pub register_first_name: String,
    pub register_last_name: String,
    pub login_first_name: String,
    pub login_last_name: String,
}

/// History fetch the caller must issue after a peer change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryRequest {
    pub session_id: UserId,
    pub peer_id: UserId,
}

impl From<HistoryRequest> for NetworkCommand {
    fn from(request: HistoryRequest) -> Self {
        NetworkCommand::FetchHistory {
            session_id: request.session_id,
            peer_id: request.peer_id,
        }
    }
}

/// What `append_incoming` did with a pushed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncomingOutcome {
    Appended,
    /// Server echo of our own send; stamped the local entry.
    Confirmed,
    /// Addressed to us from a roster peer outside the active conversation.
    Unread,
    Dropped,
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum SendError {
    #[error("Please log in first.")]
    NotLoggedIn,
    #[error("Please select a user and type a message.")]
    NoPeerSelected,
    #[error("Please select a user and type a message.")]
    EmptyContent,
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("no user is logged in")]
    NotLoggedIn,
    #[error("user {0} is not in the roster")]
    UnknownPeer(UserId),
    #[error("cannot start a conversation with yourself")]
    SelfSelected,
}

/// Conversation view model: session, roster, selected peer and the
/// rendered log of the active conversation.
pub struct ConversationState {
    session: Option<UserRecord>,
    roster: Vec<UserRecord>,
    selected_peer: Option<UserId>,
    log: Vec<LogEntry>,
    history_pending: bool,
    unread: HashMap<UserId, usize>,
    socket: SocketStatus,
    notices: VecDeque<Notice>,
    pub input_text: String,
    pub auth: AuthForm,
    pub debug_events: Vec<DebugEvent>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self {
            session: None,
            roster: Vec::new(),
            selected_peer: None,
            log: Vec::new(),
            history_pending: false,
            unread: HashMap::new(),
            socket: SocketStatus::NotConnected,
            notices: VecDeque::new(),
            input_text: String::new(),
            auth: AuthForm::default(),
            debug_events: Vec::new(),
        }
    }

    pub fn with_session(user: UserRecord) -> Self {
        let mut state = Self::new();
        state.set_session(Some(user));
        state
    }

    // ========== Session ==========

    /// Records the logged-in identity. `None` leaves everything untouched.
    /// A new identity starts from an empty roster and conversation.
    pub fn set_session(&mut self, user: Option<UserRecord>) -> bool {
        let Some(user) = user else {
            log::warn!("User ID not available yet, delaying socket connection");
            self.add_debug_event("SESSION", "Login returned no user id".to_string());
            return false;
        };

        self.add_debug_event(
            "SESSION",
            format!("Logged in as {} (id {})", user.display_name(), user.id),
        );
        self.session = Some(user);
        self.roster.clear();
        self.selected_peer = None;
        self.log.clear();
        self.history_pending = false;
        self.unread.clear();
        self.socket = SocketStatus::NotConnected;
        true
    }

    pub fn session(&self) -> Option<&UserRecord> {
        self.session.as_ref()
    }

    pub fn session_id(&self) -> Option<UserId> {
        self.session.as_ref().map(|user| user.id)
    }

    /// "Hi, First Last" once logged in.
    pub fn banner(&self) -> Option<String> {
        self.session
            .as_ref()
            .map(|user| format!("Hi, {}", user.display_name()))
    }

    // ========== Roster ==========

    /// Replaces the roster; the first record wins for duplicate ids.
    pub fn load_roster(&mut self, users: Vec<UserRecord>) {
        let mut seen = HashSet::new();
        self.roster = users
            .into_iter()
            .filter(|user| seen.insert(user.id))
            .collect();
        self.add_debug_event(
            "ROSTER",
            format!("Roster loaded with {} users", self.roster.len()),
        );
    }

    /// Roster entries offered for selection; never includes the session user.
    pub fn visible_roster(&self) -> impl Iterator<Item = &UserRecord> {
        let own_id = self.session_id();
        self.roster
            .iter()
            .filter(move |user| Some(user.id) != own_id)
    }

    pub fn is_selected(&self, user_id: UserId) -> bool {
        self.selected_peer == Some(user_id)
    }

    pub fn unread_count(&self, user_id: UserId) -> usize {
        self.unread.get(&user_id).copied().unwrap_or(0)
    }

    // ========== Conversation ==========

    /// Switches the active conversation. The log is emptied right away and
    /// refilled by the returned history fetch.
    pub fn select_peer(&mut self, peer_id: UserId) -> Result<HistoryRequest, StateError> {
        let session_id = self.session_id().ok_or(StateError::NotLoggedIn)?;
        if peer_id == session_id {
            return Err(StateError::SelfSelected);
        }
        if !self.roster.iter().any(|user| user.id == peer_id) {
            return Err(StateError::UnknownPeer(peer_id));
        }

        self.selected_peer = Some(peer_id);
        self.log.clear();
        self.history_pending = true;
        self.unread.remove(&peer_id);
        log::debug!("Selected peer {peer_id}");

        Ok(HistoryRequest {
            session_id,
            peer_id,
        })
    }

    pub fn selected_peer(&self) -> Option<UserId> {
        self.selected_peer
    }

    pub fn selected_record(&self) -> Option<&UserRecord> {
        let peer_id = self.selected_peer?;
        self.roster.iter().find(|user| user.id == peer_id)
    }

    /// Header text for the active conversation.
    pub fn talking_to(&self) -> Option<&str> {
        self.selected_record().map(|user| user.first_name.as_str())
    }

    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    pub fn history_pending(&self) -> bool {
        self.history_pending
    }

    /// Rebuilds the log from a history snapshot, oldest first. Ties keep
    /// their snapshot order. Sends made after the fetch was issued stay at
    /// the tail in send order.
    pub fn replace_history(&mut self, mut messages: Vec<Message>) {
        messages.sort_by_key(|message| message.timestamp);

        let peer_id = self.selected_peer;
        let mut rebuilt: Vec<LogEntry> = messages
            .iter()
            .map(|message| {
                let author = if Some(message.sender_id) == peer_id {
                    Author::Peer
                } else {
                    Author::Me
                };
                LogEntry::stored(author, message)
            })
            .collect();
        rebuilt.extend(self.log.drain(..).filter(LogEntry::is_local));

        self.log = rebuilt;
        self.history_pending = false;
    }

    /// Applies a history snapshot unless the user has since moved to
    /// another conversation. Messages outside the conversation are skipped.
    pub fn apply_history(&mut self, peer_id: UserId, mut messages: Vec<Message>) -> bool {
        let Some(session_id) = self.session_id() else {
            return false;
        };
        if self.selected_peer != Some(peer_id) {
            log::debug!("Discarding stale history for peer {peer_id}");
            return false;
        }
        messages.retain(|message| message.is_between(session_id, peer_id));
        self.replace_history(messages);
        true
    }

    /// Handles one pushed message. Only messages between the session and the
    /// selected peer reach the log; they are appended in arrival order.
    pub fn append_incoming(&mut self, message: Message) -> IncomingOutcome {
        let Some(session_id) = self.session_id() else {
            log::debug!("Dropping message received before login");
            return IncomingOutcome::Dropped;
        };

        if let Some(peer_id) = self.selected_peer {
            if message.sender_id == peer_id && message.receiver_id == session_id {
                self.log.push(LogEntry::stored(Author::Peer, &message));
                return IncomingOutcome::Appended;
            }
            if message.sender_id == session_id && message.receiver_id == peer_id {
                return self.confirm_outgoing(&message);
            }
        }

        let from_roster_peer = message.sender_id != session_id
            && self.roster.iter().any(|user| user.id == message.sender_id);
        if message.receiver_id == session_id && from_roster_peer {
            *self.unread.entry(message.sender_id).or_insert(0) += 1;
            log::debug!(
                "Message from {} is outside the active conversation",
                message.sender_id
            );
            return IncomingOutcome::Unread;
        }

        log::debug!(
            "Dropping message {} -> {} unrelated to this session",
            message.sender_id,
            message.receiver_id
        );
        IncomingOutcome::Dropped
    }

    fn confirm_outgoing(&mut self, message: &Message) -> IncomingOutcome {
        let local = self
            .log
            .iter_mut()
            .find(|entry| entry.is_local() && entry.content == message.content);
        match local {
            Some(entry) => {
                entry.timestamp = Some(message.timestamp);
                if entry.delivery == Delivery::Sending {
                    entry.delivery = Delivery::Sent;
                }
                IncomingOutcome::Confirmed
            }
            None => {
                self.log.push(LogEntry::stored(Author::Me, message));
                IncomingOutcome::Appended
            }
        }
    }

    /// Settles the oldest in-flight entry for `message` once the network
    /// task reports the socket write. Entries are never removed.
    pub fn settle_outgoing(&mut self, message: &OutgoingMessage, delivery: Delivery) -> bool {
        if self.session_id() != Some(message.sender_id)
            || self.selected_peer != Some(message.receiver_id)
        {
            return false;
        }
        let entry = self.log.iter_mut().find(|entry| {
            entry.delivery == Delivery::Sending && entry.content == message.content
        });
        match entry {
            Some(entry) => {
                entry.delivery = delivery;
                true
            }
            None => false,
        }
    }

    /// The send path. On success the message is already in the log as
    /// "from me", the input is cleared, and the caller transmits the result.
    pub fn append_outgoing(&mut self, content: &str) -> Result<OutgoingMessage, SendError> {
        let result = self.validate_outgoing(content);
        let (sender_id, receiver_id) = match result {
            Ok(ids) => ids,
            Err(err) => {
                self.push_notice(NoticeLevel::Error, err.to_string());
                return Err(err);
            }
        };

        self.log.push(LogEntry::optimistic(content.to_string()));
        self.input_text.clear();

        Ok(OutgoingMessage {
            sender_id,
            receiver_id,
            content: content.to_string(),
        })
    }

    fn validate_outgoing(&self, content: &str) -> Result<(UserId, UserId), SendError> {
        let session_id = self.session_id().ok_or(SendError::NotLoggedIn)?;
        let peer_id = self.selected_peer.ok_or(SendError::NoPeerSelected)?;
        if content.trim().is_empty() {
            return Err(SendError::EmptyContent);
        }
        Ok((session_id, peer_id))
    }

    /// Sends whatever is in the input box.
    pub fn submit_input(&mut self) -> Result<OutgoingMessage, SendError> {
        let content = self.input_text.clone();
        self.append_outgoing(&content)
    }

    // ========== Socket ==========

    pub fn socket_status(&self) -> SocketStatus {
        self.socket
    }

    // ========== Network events ==========

    /// Applies one network outcome and returns the follow-up commands.
    pub fn apply_event(&mut self, event: NetworkEvent) -> Vec<NetworkCommand> {
        match event {
            NetworkEvent::Registered(user) => {
                self.add_debug_event(
                    "REGISTER",
                    format!("Registered {} (id {})", user.display_name(), user.id),
                );
                self.push_notice(NoticeLevel::Info, "User registered successfully!".to_string());
                Vec::new()
            }
            NetworkEvent::LoggedIn(user) => {
                let user_id = user.id;
                let greeting = format!("Logged in as {}", user.display_name());
                if !self.set_session(Some(user)) {
                    return Vec::new();
                }
                self.push_notice(NoticeLevel::Info, greeting);
                self.socket = SocketStatus::Connecting;
                vec![NetworkCommand::Connect { user_id }, NetworkCommand::FetchRoster]
            }
            NetworkEvent::RosterLoaded(users) => {
                self.load_roster(users);
                Vec::new()
            }
            NetworkEvent::HistoryLoaded { peer_id, messages } => {
                let count = messages.len();
                if self.apply_history(peer_id, messages) {
                    self.add_debug_event(
                        "HISTORY",
                        format!("Loaded {count} messages with user {peer_id}"),
                    );
                }
                Vec::new()
            }
            NetworkEvent::MessageReceived(message) => {
                self.append_incoming(message);
                Vec::new()
            }
            NetworkEvent::MessageSent(message) => {
                self.settle_outgoing(&message, Delivery::Sent);
                Vec::new()
            }
            NetworkEvent::SendFailed { message, reason } => {
                // The entry stays in the log, marked as not sent.
                self.settle_outgoing(&message, Delivery::Failed);
                self.add_debug_event(
                    "SEND_FAILED",
                    format!("to {}: {reason}", message.receiver_id),
                );
                self.push_notice(NoticeLevel::Error, reason);
                Vec::new()
            }
            NetworkEvent::SocketOpened(user_id) => {
                if self.session_id() == Some(user_id) {
                    self.socket = SocketStatus::Open;
                }
                self.add_debug_event(
                    "SOCKET_OPEN",
                    format!("Socket connection established for user {user_id}"),
                );
                Vec::new()
            }
            NetworkEvent::SocketClosed => {
                self.socket = SocketStatus::Closed;
                self.add_debug_event(
                    "SOCKET_CLOSED",
                    "Socket connection closed; reconnection is not attempted".to_string(),
                );
                Vec::new()
            }
            NetworkEvent::RequestFailed { request, reason } => {
                self.apply_failure(request, reason);
                Vec::new()
            }
        }
    }

    fn apply_failure(&mut self, request: RequestKind, reason: String) {
        self.add_debug_event("REQUEST_FAILED", format!("{request}: {reason}"));
        match request {
            RequestKind::Register => {
                self.push_notice(NoticeLevel::Error, format!("Registration failed: {reason}"))
            }
            RequestKind::Login => {
                self.push_notice(NoticeLevel::Error, format!("Login failed: {reason}"))
            }
            RequestKind::Connect => {
                self.socket = SocketStatus::Closed;
                self.push_notice(NoticeLevel::Error, format!("Connection failed: {reason}"));
            }
            RequestKind::History => {
                self.history_pending = false;
                log::warn!("Error fetching messages: {reason}");
            }
            RequestKind::Roster => log::warn!("Error fetching users: {reason}"),
        }
    }

    // ========== Notices & diagnostics ==========

    pub fn push_notice(&mut self, level: NoticeLevel, text: String) {
        self.notices.push_back(Notice { level, text });
    }

    pub fn current_notice(&self) -> Option<&Notice> {
        self.notices.front()
    }

    pub fn dismiss_notice(&mut self) {
        self.notices.pop_front();
    }

    pub fn add_debug_event(&mut self, event_type: &str, message: String) {
        self.debug_events.push(DebugEvent {
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            message,
        });

        if self.debug_events.len() > MAX_DEBUG_EVENTS {
            self.debug_events.remove(0);
        }
    }
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new()
    }
}
