//! Card REST API Routes

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{patch, post, put},
    Json, Router,
};
use kanban_core::{CardUpdate, ContainerKey, ContainerKind, ItemId, ItemUpdate, StatusId};

use crate::{
    error::ApiResult,
    extractors::{ApiJson, PathId},
    middleware::AuthPrincipal,
    services::PositionService,
    state::AppState,
    types::{CreateCardRequest, MoveCardRequest},
};

use super::require_kind;

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// POST /api/v1/statuses/:id/cards - Append a card to a status
pub async fn create_card(
    State(positions): State<PositionService>,
    AuthPrincipal(principal): AuthPrincipal,
    PathId(status_id): PathId<StatusId>,
    ApiJson(req): ApiJson<CreateCardRequest>,
) -> ApiResult<impl IntoResponse> {
    let card = positions
        .append(&principal, ContainerKey::Status(status_id), req.into())
        .await?;
    Ok((StatusCode::CREATED, Json(card)))
}

/// PATCH /api/v1/cards/:id - Update title or description
pub async fn update_card(
    State(positions): State<PositionService>,
    AuthPrincipal(principal): AuthPrincipal,
    PathId(item_id): PathId<ItemId>,
    ApiJson(update): ApiJson<CardUpdate>,
) -> ApiResult<impl IntoResponse> {
    require_kind(&positions, &principal, item_id, ContainerKind::Status).await?;
    let card = positions
        .update_item(&principal, item_id, ItemUpdate::Card(update))
        .await?;
    Ok(Json(card))
}

/// PUT /api/v1/cards/:id/position - Move a card to an index of a status
pub async fn move_card(
    State(positions): State<PositionService>,
    AuthPrincipal(principal): AuthPrincipal,
    PathId(item_id): PathId<ItemId>,
    ApiJson(req): ApiJson<MoveCardRequest>,
) -> ApiResult<impl IntoResponse> {
    require_kind(&positions, &principal, item_id, ContainerKind::Status).await?;
    let card = positions
        .move_item(
            &principal,
            item_id,
            ContainerKey::Status(req.status_id),
            req.index,
        )
        .await?;
    Ok(Json(card))
}

/// DELETE /api/v1/cards/:id - Delete a card
pub async fn delete_card(
    State(positions): State<PositionService>,
    AuthPrincipal(principal): AuthPrincipal,
    PathId(item_id): PathId<ItemId>,
) -> ApiResult<StatusCode> {
    require_kind(&positions, &principal, item_id, ContainerKind::Status).await?;
    positions.remove_item(&principal, item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create the card router
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/statuses/:id/cards", post(create_card))
        .route("/cards/:id", patch(update_card).delete(delete_card))
        .route("/cards/:id/position", put(move_card))
}
