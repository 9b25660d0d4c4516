//! Error types for kanban operations

use crate::container::{ContainerKey, ContainerKind};
use crate::identity::{ItemId, ProjectId, StatusId};
use thiserror::Error;

/// Rejected input. Raised before any store write.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Index {index} is out of range for a container of {len} items")]
    InvalidIndex { index: i64, len: usize },

    #[error("Input for {field} must not be empty")]
    EmptyInput { field: String },

    #[error("Position {position} for item {item_id} is negative")]
    NegativePosition { item_id: ItemId, position: i64 },

    #[error("Position {position} exceeds the maximum of {max}")]
    PositionOutOfRange { position: i64, max: i64 },

    #[error("Item {item_id} appears more than once")]
    DuplicateItem { item_id: ItemId },

    #[error("Position {position} is assigned more than once")]
    DuplicatePosition { position: i64 },

    #[error("Positions must form 0..{expected_len}, found {position}")]
    NotDense { expected_len: usize, position: i64 },

    #[error("Reorder of {container} must list all {expected} members, got {got}")]
    IncompletePermutation {
        container: ContainerKey,
        expected: usize,
        got: usize,
    },

    #[error("Item {item_id} is not a member of {container}")]
    ItemNotInContainer {
        item_id: ItemId,
        container: ContainerKey,
    },

    #[error("Item {item_id} cannot be placed in {container}: {reason}")]
    InvalidContainer {
        item_id: ItemId,
        container: ContainerKey,
        reason: String,
    },

    #[error("Expected a {expected} payload, got {got}")]
    KindMismatch {
        expected: ContainerKind,
        got: ContainerKind,
    },

    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Invalid container key '{raw}': {reason}")]
    InvalidContainerKey { raw: String, reason: String },
}

/// Unknown ids.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotFoundError {
    #[error("Container not found: {key}")]
    Container { key: ContainerKey },

    #[error("Item not found: {item_id}")]
    Item { item_id: ItemId },

    #[error("Status {status_id} is not linked to {container}")]
    NotLinked {
        container: ContainerKey,
        status_id: StatusId,
    },

    #[error("Project not found: {project_id}")]
    Project { project_id: ProjectId },
}

/// The request contradicts the current state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConflictError {
    #[error("Status {status_id} is already linked to {container}")]
    AlreadyLinked {
        container: ContainerKey,
        status_id: StatusId,
    },

    #[error("{subject} belongs to a different project than {container}")]
    ContainerMismatch {
        container: ContainerKey,
        subject: String,
    },

    #[error("Container already exists: {key}")]
    ContainerExists { key: ContainerKey },

    #[error("{container} was modified by another request")]
    ConcurrentModification { container: ContainerKey },
}

/// Denied by the access gate.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthorizationError {
    #[error("User {user_id} is not a member of project {project_id}")]
    NotMember { project_id: ProjectId, user_id: String },

    #[error("User {user_id} does not own project {project_id}")]
    NotOwner { project_id: ProjectId, user_id: String },

    #[error("User {user_id} is not an administrator")]
    AdminRequired { user_id: String },
}

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Insert failed for {entity}: {reason}")]
    InsertFailed { entity: String, reason: String },

    #[error("Transaction failed: {reason}")]
    TransactionFailed { reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("Backend error: {reason}")]
    Backend { reason: String },

    #[error("Corrupt row {id}: {reason}")]
    Corrupt { id: String, reason: String },
}

/// Master error type for all kanban errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KanbanError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Not found: {0}")]
    NotFound(#[from] NotFoundError),

    #[error("Conflict: {0}")]
    Conflict(#[from] ConflictError),

    #[error("Authorization error: {0}")]
    Authorization(#[from] AuthorizationError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type alias for kanban operations.
pub type KanbanResult<T> = Result<T, KanbanError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{EntityIdType, StatusId};

    #[test]
    fn test_invalid_index_display() {
        let err = ValidationError::InvalidIndex { index: 7, len: 3 };
        let msg = err.to_string();
        assert!(msg.contains('7'));
        assert!(msg.contains('3'));
    }

    #[test]
    fn test_not_linked_display() {
        let err = NotFoundError::NotLinked {
            container: ContainerKey::Skills,
            status_id: StatusId::nil(),
        };
        let msg = err.to_string();
        assert!(msg.contains("not linked"));
        assert!(msg.contains("skills"));
    }

    #[test]
    fn test_kanban_error_from_variants() {
        let validation = KanbanError::from(ValidationError::EmptyInput {
            field: "items".to_string(),
        });
        assert!(matches!(validation, KanbanError::Validation(_)));

        let not_found = KanbanError::from(NotFoundError::Item {
            item_id: ItemId::nil(),
        });
        assert!(matches!(not_found, KanbanError::NotFound(_)));

        let conflict = KanbanError::from(ConflictError::ContainerExists {
            key: ContainerKey::Skills,
        });
        assert!(matches!(conflict, KanbanError::Conflict(_)));

        let auth = KanbanError::from(AuthorizationError::AdminRequired {
            user_id: "u".to_string(),
        });
        assert!(matches!(auth, KanbanError::Authorization(_)));

        let storage = KanbanError::from(StorageError::LockPoisoned);
        assert!(matches!(storage, KanbanError::Storage(_)));
    }
}
