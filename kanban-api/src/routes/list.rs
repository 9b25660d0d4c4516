//! List View REST API Routes

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{patch, post},
    Json, Router,
};
use kanban_core::{ContainerKey, ContainerKind, ItemId, ItemUpdate, ListColumnUpdate, ListId};

use crate::{
    error::ApiResult,
    extractors::{ApiJson, PathId},
    middleware::AuthPrincipal,
    services::PositionService,
    state::AppState,
    types::CreateListColumnRequest,
};

use super::require_kind;

/// POST /api/v1/lists/:id/columns - Append a field column
pub async fn create_column(
    State(positions): State<PositionService>,
    AuthPrincipal(principal): AuthPrincipal,
    PathId(list_id): PathId<ListId>,
    ApiJson(req): ApiJson<CreateListColumnRequest>,
) -> ApiResult<impl IntoResponse> {
    let column = positions
        .append(&principal, ContainerKey::List(list_id), req.into())
        .await?;
    Ok((StatusCode::CREATED, Json(column)))
}

/// PATCH /api/v1/list-columns/:id
pub async fn update_column(
    State(positions): State<PositionService>,
    AuthPrincipal(principal): AuthPrincipal,
    PathId(item_id): PathId<ItemId>,
    ApiJson(update): ApiJson<ListColumnUpdate>,
) -> ApiResult<impl IntoResponse> {
    require_kind(&positions, &principal, item_id, ContainerKind::List).await?;
    let column = positions
        .update_item(&principal, item_id, ItemUpdate::ListColumn(update))
        .await?;
    Ok(Json(column))
}

/// DELETE /api/v1/list-columns/:id
pub async fn delete_column(
    State(positions): State<PositionService>,
    AuthPrincipal(principal): AuthPrincipal,
    PathId(item_id): PathId<ItemId>,
) -> ApiResult<StatusCode> {
    require_kind(&positions, &principal, item_id, ContainerKind::List).await?;
    positions.remove_item(&principal, item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Create the list view router
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/lists/:id/columns", post(create_column))
        .route(
            "/list-columns/:id",
            patch(update_column).delete(delete_column),
        )
}
