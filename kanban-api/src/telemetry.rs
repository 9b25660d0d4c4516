//! Tracing initialization
//!
//! Installs a `tracing-subscriber` registry with an `EnvFilter` (from
//! `RUST_LOG`, defaulting to `kanban_api=debug,tower_http=debug,info`) and a
//! JSON or human-readable formatter.
//!
//! Environment variables:
//! - `RUST_LOG`: filter directives
//! - `KANBAN_LOG_FORMAT`: `json` (default) or `pretty`
//! - `KANBAN_ENVIRONMENT`: deployment environment reported at startup

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{ApiError, ApiResult};

const DEFAULT_FILTER: &str = "kanban_api=debug,kanban_storage=debug,tower_http=debug,info";

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    pub service_name: String,
    pub environment: String,
    /// Emit one JSON object per event instead of human-readable lines.
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "kanban-api".to_string(),
            environment: std::env::var("KANBAN_ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
            json: std::env::var("KANBAN_LOG_FORMAT")
                .map(|format| !format.eq_ignore_ascii_case("pretty"))
                .unwrap_or(true),
        }
    }
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_tracing(config: &TelemetryConfig) -> ApiResult<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(config.json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!config.json).then(tracing_subscriber::fmt::layer))
        .try_init()
        .map_err(|e| ApiError::internal_error(format!("Failed to init subscriber: {}", e)))?;

    tracing::info!(
        service_name = config.service_name,
        environment = config.environment,
        json = config.json,
        "Tracing initialized"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EnvVarGuard {
        key: &'static str,
        original: Option<String>,
    }

    impl EnvVarGuard {
        fn set(key: &'static str, value: Option<&str>) -> Self {
            let original = std::env::var(key).ok();
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
            Self { key, original }
        }
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            match self.original.as_deref() {
                Some(v) => std::env::set_var(self.key, v),
                None => std::env::remove_var(self.key),
            }
        }
    }

    #[test]
    fn test_telemetry_config_format_selection() {
        {
            let _guard = EnvVarGuard::set("KANBAN_LOG_FORMAT", None);
            let config = TelemetryConfig::default();
            assert_eq!(config.service_name, "kanban-api");
            assert!(config.json);
        }
        {
            let _guard = EnvVarGuard::set("KANBAN_LOG_FORMAT", Some("Pretty"));
            assert!(!TelemetryConfig::default().json);
        }
    }

    #[test]
    fn test_second_init_fails() {
        let config = TelemetryConfig {
            json: false,
            ..TelemetryConfig::default()
        };
        // Whichever call runs first installs the subscriber.
        let _ = init_tracing(&config);
        assert!(init_tracing(&config).is_err());
    }
}
