// Domain layer - Records, chart specifications and layout geometry
pub mod chart;
pub mod error;
pub mod layout;
pub mod response;
pub mod telemetry;
