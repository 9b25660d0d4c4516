//! Project REST API Routes
//!
//! Project bootstrap for the access gate: creating a project registers the
//! caller as its owner and creates the project's tag list.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router};
use kanban_core::{AccessGate, ProjectId};
use std::sync::Arc;

use crate::{
    auth::ProjectDirectory,
    error::{ApiError, ApiResult},
    extractors::{ApiJson, PathId},
    middleware::AuthPrincipal,
    services::PositionService,
    state::AppState,
    types::{AddMemberRequest, CreateContainerRequest, CreateProjectRequest, ProjectResponse},
};

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// POST /api/v1/projects - Create a project owned by the caller
pub async fn create_project(
    State(projects): State<Arc<dyn ProjectDirectory>>,
    State(positions): State<PositionService>,
    AuthPrincipal(principal): AuthPrincipal,
    ApiJson(req): ApiJson<CreateProjectRequest>,
) -> ApiResult<impl IntoResponse> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::missing_field("name"));
    }

    let project = projects.register_project(&principal, name).await?;
    if let Err(e) = positions
        .create_project_containers(&principal, project.project_id)
        .await
    {
        if let Err(cleanup) = projects.remove_project(project.project_id).await {
            tracing::warn!(
                project_id = %project.project_id,
                error = %cleanup,
                "Failed to remove project after container setup failed"
            );
        }
        return Err(e.into());
    }

    Ok((StatusCode::CREATED, Json(ProjectResponse::from(project))))
}

/// POST /api/v1/projects/:id/members - Add a member (owner only)
pub async fn add_member(
    State(projects): State<Arc<dyn ProjectDirectory>>,
    AuthPrincipal(principal): AuthPrincipal,
    PathId(project_id): PathId<ProjectId>,
    ApiJson(req): ApiJson<AddMemberRequest>,
) -> ApiResult<StatusCode> {
    let user_id = req.user_id.trim();
    if user_id.is_empty() {
        return Err(ApiError::missing_field("user_id"));
    }

    projects.assert_owner(&principal, project_id).await?;
    projects.add_member(project_id, user_id).await?;
    tracing::info!(project_id = %project_id, user_id, "Added project member");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/projects/:id/containers - Create a status, board or list
pub async fn create_container(
    State(positions): State<PositionService>,
    AuthPrincipal(principal): AuthPrincipal,
    PathId(project_id): PathId<ProjectId>,
    ApiJson(req): ApiJson<CreateContainerRequest>,
) -> ApiResult<impl IntoResponse> {
    let container = positions
        .create_container(&principal, req.kind, project_id, &req.name)
        .await?;
    Ok((StatusCode::CREATED, Json(container)))
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create the project router
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/projects", post(create_project))
        .route("/projects/:id/members", post(add_member))
        .route("/projects/:id/containers", post(create_container))
}
