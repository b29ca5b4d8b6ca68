// Presentation layer - HTTP surface over the controller
pub mod app_state;
pub mod handlers;
