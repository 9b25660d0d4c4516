//! API Configuration Module
//!
//! Server binding, storage backend selection, positioning policies and CORS.
//! Configuration is loaded from environment variables with defaults suited
//! to local development.

use std::net::SocketAddr;
use std::str::FromStr;

use kanban_core::{PositioningConfig, RemovalPolicy, ReorderPolicy};

use crate::error::{ApiError, ApiResult};

// ============================================================================
// STORAGE BACKEND
// ============================================================================

/// Which store backs the position service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StorageBackend {
    /// Single-process in-memory store.
    #[default]
    Memory,
    /// PostgreSQL through deadpool.
    Postgres,
}

impl FromStr for StorageBackend {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "in-memory" => Ok(Self::Memory),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            other => Err(ApiError::invalid_input(format!(
                "Invalid KANBAN_STORAGE value '{}': expected memory or postgres",
                other
            ))),
        }
    }
}

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Interface to bind.
    pub bind_host: String,

    /// Port to listen on.
    pub port: u16,

    /// Store backend.
    pub storage: StorageBackend,

    /// Reorder and removal policies.
    pub positioning: PositioningConfig,

    // ========================================================================
    // CORS Configuration
    // ========================================================================
    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins (dev mode).
    pub cors_origins: Vec<String>,

    /// Whether to allow credentials in CORS requests.
    pub cors_allow_credentials: bool,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,

    /// Deployment environment name.
    pub environment: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: 3000,
            storage: StorageBackend::Memory,
            positioning: PositioningConfig::default(),
            cors_origins: Vec::new(), // Empty = allow all
            cors_allow_credentials: false,
            cors_max_age_secs: 86400,
            environment: "development".to_string(),
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `KANBAN_API_BIND`: Interface to bind (default: 0.0.0.0)
    /// - `PORT` / `KANBAN_API_PORT`: Listen port (default: 3000)
    /// - `KANBAN_STORAGE`: `memory` or `postgres` (default: memory)
    /// - `KANBAN_REORDER_POLICY`: `strict` or `permissive` (default: strict)
    /// - `KANBAN_REMOVAL_POLICY`: `renumber` or `leave-gap` (default: renumber)
    /// - `KANBAN_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    /// - `KANBAN_CORS_ALLOW_CREDENTIALS`: "true" or "false" (default: false)
    /// - `KANBAN_CORS_MAX_AGE_SECS`: Preflight cache duration (default: 86400)
    /// - `KANBAN_ENVIRONMENT`: Deployment environment (default: development)
    pub fn from_env() -> ApiResult<Self> {
        let defaults = Self::default();

        let bind_host = std::env::var("KANBAN_API_BIND").unwrap_or(defaults.bind_host);

        let port = match std::env::var("PORT")
            .ok()
            .or_else(|| std::env::var("KANBAN_API_PORT").ok())
        {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| ApiError::invalid_input(format!("Invalid port value: {}", raw)))?,
            None => defaults.port,
        };

        let storage = match std::env::var("KANBAN_STORAGE") {
            Ok(raw) => raw.parse()?,
            Err(_) => defaults.storage,
        };

        let reorder_policy = match std::env::var("KANBAN_REORDER_POLICY") {
            Ok(raw) => raw.parse::<ReorderPolicy>()?,
            Err(_) => ReorderPolicy::default(),
        };

        let removal_policy = match std::env::var("KANBAN_REMOVAL_POLICY") {
            Ok(raw) => raw.parse::<RemovalPolicy>()?,
            Err(_) => RemovalPolicy::default(),
        };

        let cors_origins = std::env::var("KANBAN_CORS_ORIGINS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let cors_allow_credentials = std::env::var("KANBAN_CORS_ALLOW_CREDENTIALS")
            .ok()
            .map(|s| s.to_lowercase() == "true")
            .unwrap_or(false);

        let cors_max_age_secs = std::env::var("KANBAN_CORS_MAX_AGE_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.cors_max_age_secs);

        let environment = std::env::var("KANBAN_ENVIRONMENT").unwrap_or(defaults.environment);

        Ok(Self {
            bind_host,
            port,
            storage,
            positioning: PositioningConfig {
                reorder_policy,
                removal_policy,
            },
            cors_origins,
            cors_allow_credentials,
            cors_max_age_secs,
            environment,
        })
    }

    /// Check if running in a production environment.
    pub fn is_production(&self) -> bool {
        matches!(self.environment.to_lowercase().as_str(), "production" | "prod")
    }

    /// Validate settings that must be explicit in production.
    pub fn validate_for_production(&self) -> ApiResult<()> {
        if !self.is_production() {
            return Ok(());
        }
        if self.cors_origins.is_empty() {
            return Err(ApiError::invalid_input(
                "CORS origins not configured for production. Set KANBAN_CORS_ORIGINS.",
            ));
        }
        if self.storage == StorageBackend::Memory {
            tracing::warn!("In-memory storage in production loses all data on restart");
        }
        if self.positioning.reorder_policy == ReorderPolicy::Permissive {
            tracing::warn!("Permissive reorders can leave containers with gaps or ties");
        }
        Ok(())
    }

    /// Socket address to bind.
    pub fn bind_addr(&self) -> ApiResult<SocketAddr> {
        let addr = format!("{}:{}", self.bind_host, self.port);
        addr.parse::<SocketAddr>().map_err(|e| {
            ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e))
        })
    }
}
