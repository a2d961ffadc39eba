// Application layer - Chart construction, rendering and session workflows
pub mod render_pipeline;
pub mod request_builder;
pub mod series_builder;
pub mod session;
pub mod session_store;
pub mod statistical_overlay;
pub mod viewport;
