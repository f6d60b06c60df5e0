pub mod commands;
pub mod error;
pub mod events;
pub mod types;

pub use commands::NetworkCommand;
pub use error::{ChatError, Result};
pub use events::{NetworkEvent, RequestKind};
pub use types::{Credentials, Message, OutgoingMessage, UserId, UserRecord};
