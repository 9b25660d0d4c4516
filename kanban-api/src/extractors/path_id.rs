//! Custom path extractors for type-safe entity IDs and container keys.
//!
//! `PathId<T>` works with the `EntityIdType` newtypes and answers malformed
//! ids with a structured 400 naming the entity.

use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use kanban_core::{ContainerKey, EntityIdType};
use uuid::Uuid;

/// Extractor for type-safe entity IDs from path parameters.
///
/// # Example
///
/// ```rust,ignore
/// async fn delete_card(
///     PathId(item_id): PathId<ItemId>,
/// ) -> ApiResult<impl IntoResponse> {
///     // item_id is ItemId, not Uuid
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct PathId<T: EntityIdType>(pub T);

/// Error returned when path extraction fails.
#[derive(Debug)]
pub struct PathIdError {
    pub entity_name: &'static str,
    pub path_param: String,
    pub message: String,
}

impl std::fmt::Display for PathIdError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Invalid {} ID '{}': {}",
            self.entity_name, self.path_param, self.message
        )
    }
}

impl std::error::Error for PathIdError {}

impl IntoResponse for PathIdError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "code": "INVALID_FORMAT",
            "message": self.to_string(),
            "details": {
                "entity_type": self.entity_name,
                "path_param": self.path_param,
            },
        });
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

#[async_trait]
impl<S, T> FromRequestParts<S> for PathId<T>
where
    S: Send + Sync,
    T: EntityIdType,
{
    type Rejection = PathIdError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(uuid): Path<Uuid> = Path::from_request_parts(parts, state)
            .await
            .map_err(|e| PathIdError {
                entity_name: T::ENTITY_NAME,
                path_param: parts.uri.path().to_string(),
                message: format!("Failed to extract UUID from path: {}", e),
            })?;

        Ok(PathId(T::new(uuid)))
    }
}

/// Extractor for two type-safe entity IDs, e.g.
/// `/boards/:board_id/columns/:status_id`.
#[derive(Debug, Clone)]
pub struct PathIds<T>(pub T);

#[async_trait]
impl<S, T1, T2> FromRequestParts<S> for PathIds<(T1, T2)>
where
    S: Send + Sync,
    T1: EntityIdType,
    T2: EntityIdType,
{
    type Rejection = PathIdError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path((uuid1, uuid2)): Path<(Uuid, Uuid)> = Path::from_request_parts(parts, state)
            .await
            .map_err(|e| PathIdError {
                entity_name: "path",
                path_param: parts.uri.path().to_string(),
                message: format!("Failed to extract UUIDs from path: {}", e),
            })?;

        Ok(PathIds((T1::new(uuid1), T2::new(uuid2))))
    }
}

/// Extractor for a container key in its text form (`status:<uuid>`, `skills`).
#[derive(Debug, Clone, Copy)]
pub struct PathContainerKey(pub ContainerKey);

#[async_trait]
impl<S> FromRequestParts<S> for PathContainerKey
where
    S: Send + Sync,
{
    type Rejection = PathIdError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw): Path<String> = Path::from_request_parts(parts, state)
            .await
            .map_err(|e| PathIdError {
                entity_name: "container",
                path_param: parts.uri.path().to_string(),
                message: e.to_string(),
            })?;

        raw.parse::<ContainerKey>()
            .map(PathContainerKey)
            .map_err(|e| PathIdError {
                entity_name: "container",
                path_param: raw.clone(),
                message: e.to_string(),
            })
    }
}
