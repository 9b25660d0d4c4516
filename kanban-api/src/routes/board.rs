//! Board REST API Routes
//!
//! A board's columns are link rows pointing at existing statuses.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, post},
    Json, Router,
};
use kanban_core::{BoardId, StatusId};

use crate::{
    error::ApiResult,
    extractors::{ApiJson, PathId, PathIds},
    middleware::AuthPrincipal,
    services::PositionService,
    state::AppState,
    types::LinkStatusRequest,
};

/// POST /api/v1/boards/:id/columns - Link a status as the last column
pub async fn link_status(
    State(positions): State<PositionService>,
    AuthPrincipal(principal): AuthPrincipal,
    PathId(board_id): PathId<BoardId>,
    ApiJson(req): ApiJson<LinkStatusRequest>,
) -> ApiResult<impl IntoResponse> {
    let link = positions
        .link_existing(&principal, board_id, req.status_id)
        .await?;
    Ok((StatusCode::CREATED, Json(link)))
}

/// DELETE /api/v1/boards/:id/columns/:status_id - Take a status off a board
pub async fn unlink_status(
    State(positions): State<PositionService>,
    AuthPrincipal(principal): AuthPrincipal,
    PathIds((board_id, status_id)): PathIds<(BoardId, StatusId)>,
) -> ApiResult<StatusCode> {
    positions.unlink(&principal, board_id, status_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Create the board router
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/boards/:id/columns", post(link_status))
        .route("/boards/:id/columns/:status_id", delete(unlink_status))
}
