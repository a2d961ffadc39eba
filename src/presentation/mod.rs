// Presentation layer - HTTP routes over the session service
pub mod app_state;
pub mod handlers;
pub mod router;
