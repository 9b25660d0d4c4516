//! Kanban API - REST surface and stores for the positioning engine
//!
//! This crate provides:
//! - The position service running every engine operation in one store
//!   transaction
//! - A PostgreSQL store (deadpool-postgres) with per-container advisory locks
//! - Project directories acting as the access gate, kept in the same
//!   backend as the containers they guard
//! - Axum routes for cards, board columns, list columns, tags and skills
//! - Environment-driven configuration and tracing setup

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod macros;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;
pub mod telemetry;
pub mod types;

// Re-export commonly used types
pub use auth::{MembershipRegistry, Project, ProjectDirectory};
pub use config::{ApiConfig, StorageBackend};
pub use db::{DbClient, DbConfig, PgTransaction};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use middleware::{principal_middleware, AuthPrincipal};
pub use routes::{create_api_router, SecureRouterBuilder};
pub use services::PositionService;
pub use state::AppState;
pub use types::*;

#[cfg(any(test, feature = "dev"))]
pub use routes::create_api_router_unauthenticated;
