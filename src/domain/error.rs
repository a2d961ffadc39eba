//! Renderer errors
//! Input and lookup failures surfaced to the operator

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    /// The backend answered with a non-200 status; the body is the operator-facing message.
    #[error("Request failed:\n{body}")]
    BackendRejected { status: u16, body: String },

    #[error("Malformed backend response: {0}")]
    MalformedResponse(#[from] serde_json::Error),

    #[error("Session {0} not found")]
    SessionNotFound(u64),

    #[error("Raw plot gallery '{0}' not found")]
    GalleryNotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

pub type Result<T> = std::result::Result<T, RenderError>;
