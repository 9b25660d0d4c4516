//! Tag REST API Routes

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{patch, post},
    Json, Router,
};
use kanban_core::{ContainerKey, ContainerKind, ItemId, ItemUpdate, ProjectId, TagUpdate};

use crate::{
    error::ApiResult,
    extractors::{ApiJson, PathId},
    middleware::AuthPrincipal,
    services::PositionService,
    state::AppState,
    types::CreateTagRequest,
};

use super::require_kind;

/// POST /api/v1/projects/:id/tags - Append a tag to the project's tag list
pub async fn create_tag(
    State(positions): State<PositionService>,
    AuthPrincipal(principal): AuthPrincipal,
    PathId(project_id): PathId<ProjectId>,
    ApiJson(req): ApiJson<CreateTagRequest>,
) -> ApiResult<impl IntoResponse> {
    let tag = positions
        .append(&principal, ContainerKey::Tags(project_id), req.into())
        .await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

/// PATCH /api/v1/tags/:id
pub async fn update_tag(
    State(positions): State<PositionService>,
    AuthPrincipal(principal): AuthPrincipal,
    PathId(item_id): PathId<ItemId>,
    ApiJson(update): ApiJson<TagUpdate>,
) -> ApiResult<impl IntoResponse> {
    require_kind(&positions, &principal, item_id, ContainerKind::Tags).await?;
    let tag = positions
        .update_item(&principal, item_id, ItemUpdate::Tag(update))
        .await?;
    Ok(Json(tag))
}

/// DELETE /api/v1/tags/:id
pub async fn delete_tag(
    State(positions): State<PositionService>,
    AuthPrincipal(principal): AuthPrincipal,
    PathId(item_id): PathId<ItemId>,
) -> ApiResult<StatusCode> {
    require_kind(&positions, &principal, item_id, ContainerKind::Tags).await?;
    positions.remove_item(&principal, item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Create the tag router
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/projects/:id/tags", post(create_tag))
        .route("/tags/:id", patch(update_tag).delete(delete_tag))
}
