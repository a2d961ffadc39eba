// Route table for the renderer service
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    build_time_range_request, create_session, discard_session, download_raw, health_check,
    resize_viewport, session_charts, toggle_gallery,
};

/// Build the router. `max_body_bytes` bounds the backend response accepted by `POST /sessions`.
pub fn build_router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    // Responses are compressed per body or per chunk in the handlers, so no CompressionLayer.
    Router::new()
        .route("/healthz", get(health_check))
        .route("/sessions", post(create_session))
        .route("/sessions/:id", delete(discard_session))
        .route("/sessions/:id/charts", get(session_charts))
        .route("/sessions/:id/raw", get(download_raw))
        .route("/sessions/:id/viewport", post(resize_viewport))
        .route("/sessions/:id/galleries/:gallery/toggle", post(toggle_gallery))
        .route("/requests/time-range", post(build_time_range_request))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::session::SessionService;
    use crate::infrastructure::config::{RendererSettings, DEFAULT_MAX_BODY_BYTES};
    use crate::infrastructure::memory_store::InMemorySessionStore;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn router(max_body_bytes: usize) -> Router {
        let state = Arc::new(AppState {
            session_service: SessionService::new(
                Arc::new(InMemorySessionStore::new()),
                RendererSettings::default(),
            ),
        });
        build_router(state, max_body_bytes)
    }

    /// A single-record response of roughly `bytes` bytes.
    fn large_body(bytes: usize) -> String {
        let samples = vec!["0.125"; bytes / 6].join(",");
        format!("[{{\"time_min\":[{}]}}]", samples)
    }

    fn post_session(body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/sessions")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_large_backend_response_is_accepted() {
        let body = large_body(3 * 1024 * 1024);
        assert!(body.len() > 2 * 1024 * 1024);

        let response = router(DEFAULT_MAX_BODY_BYTES)
            .oneshot(post_session(body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_body_limit_is_configurable() {
        let response = router(1024)
            .oneshot(post_session(large_body(4096)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_health_route() {
        let response = router(DEFAULT_MAX_BODY_BYTES)
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
