//! Error Types for the Kanban API
//!
//! This module defines error handling for the API layer, including:
//! - ApiError struct for structured error responses
//! - ErrorCode enum for categorizing errors
//! - IntoResponse implementation for Axum HTTP responses
//! - Mapping of engine errors onto HTTP status codes
//!
//! All errors are serialized as JSON with appropriate HTTP status codes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use kanban_core::{ConflictError, KanbanError, NotFoundError, StorageError, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
///
/// Each error code maps to a specific HTTP status code and represents
/// a category of error that can occur during API operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Authentication Errors (401, 403)
    // ========================================================================
    /// Request carries no principal
    Unauthorized,

    /// Principal lacks the role required for the resource
    Forbidden,

    // ========================================================================
    // Validation Errors (400)
    // ========================================================================
    /// Request validation failed
    ValidationFailed,

    /// Request contains invalid input data
    InvalidInput,

    /// Required field is missing from request
    MissingField,

    /// Index is outside the container
    InvalidRange,

    /// Field format is incorrect
    InvalidFormat,

    // ========================================================================
    // Not Found Errors (404)
    // ========================================================================
    /// Requested entity does not exist
    EntityNotFound,

    /// Requested project does not exist
    ProjectNotFound,

    /// Requested container does not exist
    ContainerNotFound,

    /// Requested item does not exist
    ItemNotFound,

    // ========================================================================
    // Conflict Errors (409)
    // ========================================================================
    /// Entity with the same identifier already exists
    EntityAlreadyExists,

    /// Container was changed underneath the request
    ConcurrentModification,

    /// Operation conflicts with current state
    StateConflict,

    // ========================================================================
    // Server Errors (500, 503)
    // ========================================================================
    /// Internal server error
    InternalError,

    /// Database operation failed
    DatabaseError,

    /// Service is temporarily unavailable
    ServiceUnavailable,

    /// Database connection pool exhausted
    ConnectionPoolExhausted,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,

            ErrorCode::Forbidden => StatusCode::FORBIDDEN,

            ErrorCode::ValidationFailed
            | ErrorCode::InvalidInput
            | ErrorCode::MissingField
            | ErrorCode::InvalidRange
            | ErrorCode::InvalidFormat => StatusCode::BAD_REQUEST,

            ErrorCode::EntityNotFound
            | ErrorCode::ProjectNotFound
            | ErrorCode::ContainerNotFound
            | ErrorCode::ItemNotFound => StatusCode::NOT_FOUND,

            ErrorCode::EntityAlreadyExists
            | ErrorCode::ConcurrentModification
            | ErrorCode::StateConflict => StatusCode::CONFLICT,

            ErrorCode::ServiceUnavailable | ErrorCode::ConnectionPoolExhausted => {
                StatusCode::SERVICE_UNAVAILABLE
            }

            ErrorCode::InternalError | ErrorCode::DatabaseError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get a default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::Unauthorized => "Authentication required",
            ErrorCode::Forbidden => "Access forbidden",

            ErrorCode::ValidationFailed => "Request validation failed",
            ErrorCode::InvalidInput => "Invalid input data",
            ErrorCode::MissingField => "Required field is missing",
            ErrorCode::InvalidRange => "Value is out of valid range",
            ErrorCode::InvalidFormat => "Invalid format",

            ErrorCode::EntityNotFound => "Entity not found",
            ErrorCode::ProjectNotFound => "Project not found",
            ErrorCode::ContainerNotFound => "Container not found",
            ErrorCode::ItemNotFound => "Item not found",

            ErrorCode::EntityAlreadyExists => "Entity already exists",
            ErrorCode::ConcurrentModification => "Concurrent modification detected",
            ErrorCode::StateConflict => "Operation conflicts with current state",

            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database operation failed",
            ErrorCode::ServiceUnavailable => "Service temporarily unavailable",
            ErrorCode::ConnectionPoolExhausted => "Connection pool exhausted",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error response for API operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Create a new API error with the given code, using the default message.
    pub fn from_code(code: ErrorCode) -> Self {
        Self {
            code,
            message: code.default_message().to_string(),
            details: None,
        }
    }

    /// Add additional details to the error.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    // ========================================================================
    // Convenience constructors for common errors
    // ========================================================================

    /// Create an Unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    /// Create a Forbidden error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    /// Create an InvalidInput error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Create a MissingField error.
    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingField,
            format!("Required field '{}' is missing", field),
        )
    }

    /// Create an InvalidFormat error.
    pub fn invalid_format(field: &str, expected: &str) -> Self {
        Self::new(
            ErrorCode::InvalidFormat,
            format!("Field '{}' has invalid format, expected {}", field, expected),
        )
    }

    /// Create an EntityNotFound error.
    pub fn entity_not_found(entity_type: &str, id: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::EntityNotFound,
            format!("{} with id {} not found", entity_type, id),
        )
    }

    /// Create an InternalError.
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Create a DatabaseError.
    pub fn database_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    /// Create a ServiceUnavailable error.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    /// Create a ConnectionPoolExhausted error.
    pub fn connection_pool_exhausted() -> Self {
        Self::from_code(ErrorCode::ConnectionPoolExhausted)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

/// Implement IntoResponse for ApiError to enable automatic error handling in Axum.
///
/// ```ignore
/// async fn handler() -> Result<Json<Response>, ApiError> {
///     Err(ApiError::unauthorized("Missing principal"))
/// }
/// ```
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self);
        (status, body).into_response()
    }
}

// ============================================================================
// CONVERSIONS FROM ENGINE ERRORS
// ============================================================================

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        let message = err.to_string();
        match err {
            ValidationError::InvalidIndex { index, len } => {
                ApiError::new(ErrorCode::InvalidRange, message)
                    .with_details(serde_json::json!({ "index": index, "min": 0, "max": len }))
            }
            ValidationError::PositionOutOfRange { position, max } => {
                ApiError::new(ErrorCode::InvalidRange, message)
                    .with_details(serde_json::json!({ "position": position, "max": max }))
            }
            ValidationError::RequiredFieldMissing { .. } => {
                ApiError::new(ErrorCode::MissingField, message)
            }
            ValidationError::InvalidContainerKey { .. } => {
                ApiError::new(ErrorCode::InvalidFormat, message)
            }
            ValidationError::EmptyInput { .. } | ValidationError::InvalidValue { .. } => {
                ApiError::new(ErrorCode::InvalidInput, message)
            }
            _ => ApiError::new(ErrorCode::ValidationFailed, message),
        }
    }
}

impl From<NotFoundError> for ApiError {
    fn from(err: NotFoundError) -> Self {
        let code = match err {
            NotFoundError::Container { .. } => ErrorCode::ContainerNotFound,
            NotFoundError::Item { .. } => ErrorCode::ItemNotFound,
            NotFoundError::Project { .. } => ErrorCode::ProjectNotFound,
            NotFoundError::NotLinked { .. } => ErrorCode::EntityNotFound,
        };
        ApiError::new(code, err.to_string())
    }
}

impl From<ConflictError> for ApiError {
    fn from(err: ConflictError) -> Self {
        let code = match err {
            ConflictError::ContainerExists { .. } => ErrorCode::EntityAlreadyExists,
            ConflictError::ConcurrentModification { .. } => ErrorCode::ConcurrentModification,
            ConflictError::AlreadyLinked { .. } | ConflictError::ContainerMismatch { .. } => {
                ErrorCode::StateConflict
            }
        };
        ApiError::new(code, err.to_string())
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        // Log the full error for debugging
        tracing::error!(error = %err, "Storage error");

        // Return a generic error to avoid leaking internal details
        match err {
            StorageError::LockPoisoned | StorageError::Corrupt { .. } => {
                ApiError::from_code(ErrorCode::InternalError)
            }
            StorageError::InsertFailed { .. }
            | StorageError::TransactionFailed { .. }
            | StorageError::Backend { .. } => ApiError::database_error("Database operation failed"),
        }
    }
}

impl From<KanbanError> for ApiError {
    fn from(err: KanbanError) -> Self {
        match err {
            KanbanError::Validation(e) => e.into(),
            KanbanError::NotFound(e) => e.into(),
            KanbanError::Conflict(e) => e.into(),
            KanbanError::Authorization(e) => ApiError::forbidden(e.to_string()),
            KanbanError::Storage(e) => e.into(),
        }
    }
}

// ============================================================================
// CONVERSIONS FROM STANDARD ERRORS
// ============================================================================

/// Convert from tokio_postgres::Error to ApiError.
impl From<tokio_postgres::Error> for ApiError {
    fn from(err: tokio_postgres::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        ApiError::database_error("Database operation failed")
    }
}

/// Convert from deadpool_postgres::PoolError to ApiError.
impl From<deadpool_postgres::PoolError> for ApiError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        tracing::error!("Connection pool error: {:?}", err);

        match err {
            deadpool_postgres::PoolError::Timeout(_) => ApiError::connection_pool_exhausted(),
            deadpool_postgres::PoolError::Closed => {
                ApiError::service_unavailable("Database connection pool is closed")
            }
            _ => ApiError::database_error("Failed to acquire database connection"),
        }
    }
}

/// Convert from serde_json::Error to ApiError.
impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON serialization error: {:?}", err);
        ApiError::invalid_input(format!("Invalid JSON: {}", err))
    }
}

// ============================================================================
// RESULT TYPE ALIAS
// ============================================================================

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use kanban_core::{AuthorizationError, ContainerKey, EntityIdType, ItemId, StatusId};

    #[test]
    fn test_error_code_status_mapping() {
        assert_eq!(ErrorCode::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorCode::InvalidRange.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::ItemNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::StateConflict.status_code(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::InternalError.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            ErrorCode::ConnectionPoolExhausted.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_engine_errors_map_to_status() {
        let invalid_index: ApiError =
            KanbanError::from(ValidationError::InvalidIndex { index: 9, len: 2 }).into();
        assert_eq!(invalid_index.code, ErrorCode::InvalidRange);
        assert_eq!(invalid_index.status_code(), StatusCode::BAD_REQUEST);

        let missing: ApiError = KanbanError::from(NotFoundError::Item {
            item_id: ItemId::nil(),
        })
        .into();
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);

        let linked: ApiError = KanbanError::from(ConflictError::AlreadyLinked {
            container: ContainerKey::Skills,
            status_id: StatusId::nil(),
        })
        .into();
        assert_eq!(linked.status_code(), StatusCode::CONFLICT);

        let denied: ApiError = KanbanError::from(AuthorizationError::AdminRequired {
            user_id: "u1".to_string(),
        })
        .into();
        assert_eq!(denied.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_storage_errors_are_generic() {
        let err: ApiError = KanbanError::from(StorageError::Backend {
            reason: "relation kanban_items does not exist".to_string(),
        })
        .into();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(!err.message.contains("kanban_items"));
    }

    #[test]
    fn test_range_errors_carry_bounds() {
        let err: ApiError = ValidationError::InvalidIndex { index: 9, len: 2 }.into();
        assert_eq!(
            err.details,
            Some(serde_json::json!({ "index": 9, "min": 0, "max": 2 }))
        );

        let err: ApiError = ValidationError::PositionOutOfRange {
            position: i64::MAX,
            max: kanban_core::MAX_POSITION,
        }
        .into();
        assert_eq!(err.code, ErrorCode::InvalidRange);
        assert_eq!(
            err.details,
            Some(serde_json::json!({ "position": i64::MAX, "max": kanban_core::MAX_POSITION }))
        );

        let err: ApiError = ValidationError::DuplicateItem {
            item_id: ItemId::nil(),
        }
        .into();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert_eq!(err.details, None);
    }

    #[test]
    fn test_error_serialization() -> Result<(), serde_json::Error> {
        let err = ApiError::unauthorized("Missing principal");
        let json = serde_json::to_string(&err)?;

        assert!(json.contains("UNAUTHORIZED"));
        assert!(json.contains("Missing principal"));

        let deserialized: ApiError = serde_json::from_str(&json)?;
        assert_eq!(deserialized, err);
        Ok(())
    }
}
