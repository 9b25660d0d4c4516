//! Kanban Core - Ordered Collection Types
//!
//! Entity ids, container keys, positioned items, the error taxonomy and the
//! pure position algorithms. Nothing here touches storage; every other crate
//! depends on this one.

pub mod access;
pub mod config;
pub mod container;
pub mod error;
pub mod identity;
pub mod item;
pub mod positioning;

pub use access::{AccessGate, Principal};
pub use config::{PositioningConfig, RemovalPolicy, ReorderPolicy};
pub use container::{Container, ContainerKey, ContainerKind};
pub use error::{
    AuthorizationError, ConflictError, KanbanError, KanbanResult, NotFoundError, StorageError,
    ValidationError,
};
pub use identity::{BoardId, EntityIdType, ItemId, ListId, ProjectId, StatusId, Timestamp};
pub use item::{
    CardUpdate, ItemPayload, ItemUpdate, ListColumnUpdate, PositionedItem, SkillUpdate, TagUpdate,
};
pub use positioning::{
    append_position, bulk_reorder, density_violations, insert_at_index, is_dense, move_across,
    ordered, ordered_ids, renumber, PositionPatch, EMPTY_MAX_POSITION, MAX_POSITION,
};
