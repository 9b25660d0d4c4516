//! Kanban API server binary.

use std::sync::Arc;

use axum::Router;
use kanban_api::{
    create_api_router, telemetry::{init_tracing, TelemetryConfig}, ApiConfig, ApiError,
    ApiResult, AppState, DbClient, DbConfig, StorageBackend,
};
use kanban_storage::TransactionCoordinator;

#[tokio::main]
async fn main() -> ApiResult<()> {
    init_tracing(&TelemetryConfig::default())?;

    let api_config = ApiConfig::from_env()?;
    let state = open_state(&api_config).await?;
    tracing::info!(
        backend = state.positions.backend_name(),
        reorder_policy = ?api_config.positioning.reorder_policy,
        removal_policy = ?api_config.positioning.removal_policy,
        "Store ready"
    );

    let app: Router = create_api_router(state, &api_config)?;

    let addr = api_config.bind_addr()?;
    tracing::info!(%addr, "Starting kanban API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}

/// Open the configured store. Projects and members live in the same backend.
async fn open_state(config: &ApiConfig) -> ApiResult<AppState> {
    match config.storage {
        StorageBackend::Memory => Ok(AppState::in_memory(config.positioning)),
        StorageBackend::Postgres => {
            let db = DbClient::from_config(&DbConfig::from_env())?;
            db.migrate().await?;
            db.health_check().await?;
            tracing::info!(pool_size = db.pool_size(), "Connected to PostgreSQL");
            let db = Arc::new(db);
            Ok(AppState::new(db.clone(), db, config.positioning))
        }
    }
}
