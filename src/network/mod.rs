pub mod api;
pub mod client;
pub mod socket;

pub use api::ApiClient;
pub use client::ChatClient;
