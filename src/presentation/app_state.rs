// Application state for HTTP handlers
use crate::application::session::SessionService;

#[derive(Clone)]
pub struct AppState {
    pub session_service: SessionService,
}
