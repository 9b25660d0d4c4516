//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::Instant;

use kanban_core::PositioningConfig;
use kanban_storage::{InMemoryStore, TransactionCoordinator};

use crate::auth::{MembershipRegistry, ProjectDirectory};
use crate::services::PositionService;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    /// Position engine over the configured store.
    pub positions: PositionService,
    /// Project ownership and membership. Also the service's access gate.
    pub projects: Arc<dyn ProjectDirectory>,
    pub start_time: Instant,
}

impl AppState {
    /// Wire the service to a store and to the project directory that gates it.
    ///
    /// The directory must be as durable as the store: a process-local
    /// directory over a persistent store loses every project on restart.
    pub fn new<D>(
        store: Arc<dyn TransactionCoordinator>,
        projects: Arc<D>,
        config: PositioningConfig,
    ) -> Self
    where
        D: ProjectDirectory + 'static,
    {
        let positions = PositionService::new(store, projects.clone(), config);
        Self {
            positions,
            projects,
            start_time: Instant::now(),
        }
    }

    /// In-memory store with an in-process membership registry.
    pub fn in_memory(config: PositioningConfig) -> Self {
        Self::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(MembershipRegistry::new()),
            config,
        )
    }
}

crate::impl_from_ref!(PositionService, positions);
crate::impl_from_ref!(Arc<dyn ProjectDirectory>, projects);
crate::impl_from_ref!(Instant, start_time);
