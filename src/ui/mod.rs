mod app;
mod components;
pub mod state;

pub use app::ChatApp;
