// HTTP request handlers
use crate::application::request_builder::TimeRangeRequest;
use crate::domain::error::RenderError;
use crate::domain::layout::Viewport;
use crate::domain::response::BackendResponse;
use crate::infrastructure::chunked_json::stream_from_receiver;
use crate::infrastructure::http_response::{download_response, json_response};
use crate::presentation::app_state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Deserialize)]
pub struct CreateSessionQuery {
    /// Status the backend answered with; defaults to 200
    pub status: Option<u16>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

#[derive(Deserialize)]
pub struct ViewportQuery {
    pub width: f64,
    pub height: f64,
}

impl IntoResponse for RenderError {
    fn into_response(self) -> Response {
        let status = match &self {
            RenderError::BackendRejected { .. } => StatusCode::BAD_GATEWAY,
            RenderError::MalformedResponse(_) => StatusCode::UNPROCESSABLE_ENTITY,
            RenderError::SessionNotFound(_) | RenderError::GalleryNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            RenderError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        };
        tracing::warn!("{}: {}", status, self);
        (status, self.to_string()).into_response()
    }
}

fn accepts_brotli(headers: &HeaderMap) -> bool {
    headers
        .get("accept-encoding")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.contains("br"))
        .unwrap_or(false)
}

fn flatten(result: Result<Response, StatusCode>) -> Response {
    match result {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Render a backend response, streaming render events as they happen
pub async fn create_session(
    Query(query): Query<CreateSessionQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Response {
    let compress = accepts_brotli(&headers);
    let response = BackendResponse::new(query.status.unwrap_or(200), body);
    let viewport = match (query.width, query.height) {
        (Some(width), Some(height)) => Some(Viewport { width, height }),
        _ => None,
    };

    match state.session_service.start(response, viewport).await {
        Ok(rx) => stream_from_receiver(rx, compress).await.into_response(),
        Err(e) => e.into_response(),
    }
}

/// Current chart containers of a session
pub async fn session_charts(
    Path(id): Path<u64>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    match state.session_service.snapshot(id).await {
        Ok(snapshot) => flatten(json_response(&snapshot, accepts_brotli(&headers)).await),
        Err(e) => e.into_response(),
    }
}

/// Raw backend response as a file download
pub async fn download_raw(Path(id): Path<u64>, State(state): State<Arc<AppState>>) -> Response {
    match state.session_service.download(id).await {
        Ok(download) => flatten(download_response(download)),
        Err(e) => e.into_response(),
    }
}

pub async fn resize_viewport(
    Path(id): Path<u64>,
    Query(query): Query<ViewportQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let viewport = Viewport {
        width: query.width,
        height: query.height,
    };
    match state.session_service.resize(id, viewport).await {
        Ok(change) => flatten(json_response(&change, false).await),
        Err(e) => e.into_response(),
    }
}

pub async fn toggle_gallery(
    Path((id, gallery)): Path<(u64, String)>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match state.session_service.toggle_gallery(id, &gallery).await {
        Ok(gallery) => flatten(json_response(&gallery, false).await),
        Err(e) => e.into_response(),
    }
}

/// Go back to the input form, discarding the session
pub async fn discard_session(Path(id): Path<u64>, State(state): State<Arc<AppState>>) -> Response {
    match state.session_service.go_back(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}

/// Validate time-range input and return the form body for the backend
pub async fn build_time_range_request(Json(request): Json<TimeRangeRequest>) -> Response {
    match request.form_body() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "application/x-www-form-urlencoded")],
            body,
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}
