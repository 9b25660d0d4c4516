//! Health Check Endpoints
//!
//! - /health - Store connectivity check
//! - /health/live - Process alive check
//!
//! No principal required for health endpoints.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::services::PositionService;
use crate::state::AppState;

// ============================================================================
// TYPES
// ============================================================================

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HealthDetails>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthDetails {
    pub store: ComponentHealth,
    pub version: String,
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: HealthStatus,
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /health/live - Process liveness check
pub async fn liveness() -> impl IntoResponse {
    let response = HealthResponse {
        status: HealthStatus::Healthy,
        message: Some("Process is alive".to_string()),
        details: None,
    };
    (StatusCode::OK, Json(response))
}

/// GET /health - Readiness check (store connectivity)
pub async fn readiness(
    State(positions): State<PositionService>,
    State(start_time): State<Instant>,
) -> impl IntoResponse {
    let started = Instant::now();
    let store = match positions.health_check().await {
        Ok(()) => ComponentHealth {
            status: HealthStatus::Healthy,
            backend: positions.backend_name().to_string(),
            latency_ms: Some(started.elapsed().as_millis() as u64),
            error: None,
        },
        Err(e) => {
            tracing::warn!(backend = positions.backend_name(), error = %e, "Store health check failed");
            ComponentHealth {
                status: HealthStatus::Unhealthy,
                backend: positions.backend_name().to_string(),
                latency_ms: None,
                error: Some(format!("Store check failed: {}", e)),
            }
        }
    };

    let overall_status = store.status;
    let response = HealthResponse {
        status: overall_status,
        message: None,
        details: Some(HealthDetails {
            store,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: start_time.elapsed().as_secs(),
        }),
    };

    let status_code = if overall_status == HealthStatus::Healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(response))
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create health check router (no principal required)
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(readiness))
        .route("/health/live", get(liveness))
}
