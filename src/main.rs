// Main entry point - Dependency injection and server setup
mod domain;
mod application;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};
use tracing_subscriber::EnvFilter;

use crate::application::session::SessionService;
use crate::infrastructure::config::load_app_config;
use crate::infrastructure::memory_store::InMemorySessionStore;
use crate::presentation::app_state::AppState;
use crate::presentation::router::build_router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = load_app_config()?;

    // Create store (infrastructure layer)
    let store = Arc::new(InMemorySessionStore::new());

    // Create services (application layer)
    let session_service = SessionService::new(store, config.renderer.clone());

    // Create application state
    let state = Arc::new(AppState { session_service });

    // Build router (presentation layer)
    let router = build_router(state, config.server.max_body_bytes);

    // Start server
    let addr: SocketAddr = config.server.bind_addr.parse()?;
    tracing::info!("Starting recontool renderer on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
