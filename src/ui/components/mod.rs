pub mod auth_panel;
pub mod chat_area;
pub mod debug_panel;
pub mod input_bar;
pub mod notice;
pub mod sidebar;
