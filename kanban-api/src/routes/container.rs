//! Container REST API Routes
//!
//! Generic operations over any ordered collection addressed by its key
//! (`status:<uuid>`, `board:<uuid>`, `list:<uuid>`, `tags:<uuid>`, `skills`).

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};

use crate::{
    error::ApiResult,
    extractors::{ApiJson, PathContainerKey},
    middleware::AuthPrincipal,
    services::PositionService,
    state::AppState,
    types::{ContainerItemsResponse, ReorderRequest},
};

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// GET /api/v1/containers/:key - Get a container
pub async fn get_container(
    State(positions): State<PositionService>,
    AuthPrincipal(principal): AuthPrincipal,
    PathContainerKey(key): PathContainerKey,
) -> ApiResult<impl IntoResponse> {
    let container = positions.get_container(&principal, key).await?;
    Ok(Json(container))
}

/// DELETE /api/v1/containers/:key - Delete a container and its members
pub async fn delete_container(
    State(positions): State<PositionService>,
    AuthPrincipal(principal): AuthPrincipal,
    PathContainerKey(key): PathContainerKey,
) -> ApiResult<StatusCode> {
    positions.delete_container(&principal, key).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/containers/:key/normalize - Renumber a drifted container
pub async fn normalize_container(
    State(positions): State<PositionService>,
    AuthPrincipal(principal): AuthPrincipal,
    PathContainerKey(key): PathContainerKey,
) -> ApiResult<impl IntoResponse> {
    let items = positions.normalize_container(&principal, key).await?;
    Ok(Json(ContainerItemsResponse {
        container: key,
        items,
    }))
}

/// GET /api/v1/containers/:key/items - Members in canonical order
pub async fn list_items(
    State(positions): State<PositionService>,
    AuthPrincipal(principal): AuthPrincipal,
    PathContainerKey(key): PathContainerKey,
) -> ApiResult<impl IntoResponse> {
    let items = positions.list(&principal, key).await?;
    Ok(Json(ContainerItemsResponse {
        container: key,
        items,
    }))
}

/// PUT /api/v1/containers/:key/order - Bulk reorder
pub async fn reorder_container(
    State(positions): State<PositionService>,
    AuthPrincipal(principal): AuthPrincipal,
    PathContainerKey(key): PathContainerKey,
    ApiJson(req): ApiJson<ReorderRequest>,
) -> ApiResult<StatusCode> {
    positions
        .reorder_container(&principal, key, req.pairs())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create the container router
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route(
            "/containers/:key",
            get(get_container).delete(delete_container),
        )
        .route("/containers/:key/normalize", post(normalize_container))
        .route("/containers/:key/items", get(list_items))
        .route("/containers/:key/order", put(reorder_container))
}
