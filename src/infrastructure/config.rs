use serde::Deserialize;

use crate::domain::layout::Viewport;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub renderer: RendererSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind_addr: String,
    /// Largest accepted request body; backend responses with raw signals run to tens of MiB
    pub max_body_bytes: usize,
}

pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

#[derive(Debug, Deserialize, Clone)]
pub struct RendererSettings {
    pub viewport_width: f64,
    pub viewport_height: f64,
    /// Charts narrower than this are hidden behind the small-screen notice
    pub min_chart_width: f64,
    /// Sessions older than this are dropped
    pub session_ttl_secs: u64,
    pub max_sessions: usize,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            viewport_width: 1280.0,
            viewport_height: 800.0,
            min_chart_width: 420.0,
            session_ttl_secs: 3600,
            max_sessions: 64,
        }
    }
}

impl RendererSettings {
    /// Viewport assumed when the client does not report one
    pub fn default_viewport(&self) -> Viewport {
        Viewport {
            width: self.viewport_width,
            height: self.viewport_height,
        }
    }
}

fn builder() -> anyhow::Result<config::ConfigBuilder<config::builder::DefaultState>> {
    let defaults = RendererSettings::default();
    Ok(config::Config::builder()
        .set_default("server.bind_addr", "0.0.0.0:8080")?
        .set_default("server.max_body_bytes", DEFAULT_MAX_BODY_BYTES as u64)?
        .set_default("renderer.viewport_width", defaults.viewport_width)?
        .set_default("renderer.viewport_height", defaults.viewport_height)?
        .set_default("renderer.min_chart_width", defaults.min_chart_width)?
        .set_default("renderer.session_ttl_secs", defaults.session_ttl_secs)?
        .set_default("renderer.max_sessions", defaults.max_sessions as u64)?)
}

/// Load `config/renderer` (optional) with `RECONTOOL__SECTION__KEY` overrides
pub fn load_app_config() -> anyhow::Result<AppConfig> {
    let settings = builder()?
        .add_source(config::File::with_name("config/renderer").required(false))
        .add_source(config::Environment::with_prefix("RECONTOOL").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_apply_without_sources() {
        let config: AppConfig = builder().unwrap().build().unwrap().try_deserialize().unwrap();
        assert_eq!(config.server.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.renderer.min_chart_width, 420.0);
        assert_eq!(config.renderer.default_viewport().width, 1280.0);
        assert_eq!(config.server.max_body_bytes, 64 * 1024 * 1024);
        assert_eq!(config.renderer.session_ttl_secs, 3600);
        assert_eq!(config.renderer.max_sessions, 64);
    }

    #[test]
    fn test_file_values_override_defaults() {
        let toml = "[server]\nmax_body_bytes = 1024\n\n[renderer]\nviewport_width = 1920.0\nmin_chart_width = 500.0\nmax_sessions = 8\n";
        let config: AppConfig = builder()
            .unwrap()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(config.renderer.viewport_width, 1920.0);
        assert_eq!(config.renderer.viewport_height, 800.0);
        assert_eq!(config.renderer.min_chart_width, 500.0);
        assert_eq!(config.renderer.max_sessions, 8);
        assert_eq!(config.server.max_body_bytes, 1024);
    }
}
