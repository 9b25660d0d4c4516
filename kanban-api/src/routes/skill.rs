//! Skill REST API Routes
//!
//! The skill list is global. Writes need an administrator; the service
//! enforces that through the access gate.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{patch, post},
    Json, Router,
};
use kanban_core::{ContainerKey, ContainerKind, ItemId, ItemUpdate, SkillUpdate};

use crate::{
    error::ApiResult,
    extractors::{ApiJson, PathId},
    middleware::AuthPrincipal,
    services::PositionService,
    state::AppState,
    types::CreateSkillRequest,
};

use super::require_kind;

/// POST /api/v1/skills - Append a skill
pub async fn create_skill(
    State(positions): State<PositionService>,
    AuthPrincipal(principal): AuthPrincipal,
    ApiJson(req): ApiJson<CreateSkillRequest>,
) -> ApiResult<impl IntoResponse> {
    let skill = positions
        .append(&principal, ContainerKey::Skills, req.into())
        .await?;
    Ok((StatusCode::CREATED, Json(skill)))
}

/// PATCH /api/v1/skills/:id
pub async fn update_skill(
    State(positions): State<PositionService>,
    AuthPrincipal(principal): AuthPrincipal,
    PathId(item_id): PathId<ItemId>,
    ApiJson(update): ApiJson<SkillUpdate>,
) -> ApiResult<impl IntoResponse> {
    require_kind(&positions, &principal, item_id, ContainerKind::Skills).await?;
    let skill = positions
        .update_item(&principal, item_id, ItemUpdate::Skill(update))
        .await?;
    Ok(Json(skill))
}

/// DELETE /api/v1/skills/:id
pub async fn delete_skill(
    State(positions): State<PositionService>,
    AuthPrincipal(principal): AuthPrincipal,
    PathId(item_id): PathId<ItemId>,
) -> ApiResult<StatusCode> {
    require_kind(&positions, &principal, item_id, ContainerKind::Skills).await?;
    positions.remove_item(&principal, item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Create the skill router
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/skills", post(create_skill))
        .route("/skills/:id", patch(update_skill).delete(delete_skill))
}
