//! Kanban Storage - Repository Traits and In-Memory Store
//!
//! Defines the transactional repository every position operation runs
//! against. The Postgres implementation lives in kanban-api.

pub mod memory;
pub mod repository;

pub use memory::{InMemoryStore, InMemoryTransaction};
pub use repository::{
    with_transaction, OrderedRepository, StoreTransaction, TransactionCoordinator,
};
