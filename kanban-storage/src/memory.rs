//! In-memory store.
//!
//! One writer at a time: `begin` takes the owned table lock and clones the
//! tables into a private snapshot. Commit swaps the snapshot in; rollback or
//! drop throws it away. No reader can see a half-patched container.

use crate::repository::{OrderedRepository, StoreTransaction, TransactionCoordinator};
use async_trait::async_trait;
use kanban_core::{
    Container, ContainerKey, ItemId, ItemPayload, KanbanResult, NotFoundError, PositionPatch,
    PositionedItem, StatusId, StorageError, EMPTY_MAX_POSITION,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, Default)]
struct Tables {
    containers: HashMap<ContainerKey, Container>,
    items: HashMap<ItemId, PositionedItem>,
}

impl Tables {
    fn require_container(&self, key: ContainerKey) -> KanbanResult<()> {
        if self.containers.contains_key(&key) {
            Ok(())
        } else {
            Err(NotFoundError::Container { key }.into())
        }
    }

    fn members(&self, key: ContainerKey) -> Vec<PositionedItem> {
        let mut members: Vec<PositionedItem> = self
            .items
            .values()
            .filter(|item| item.container == key)
            .cloned()
            .collect();
        members.sort_by_key(|item| (item.position, item.item_id));
        members
    }
}

/// In-memory store for tests and single-process deployments.
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Create an empty store holding only the global skill list.
    pub fn new() -> Self {
        let mut tables = Tables::default();
        tables
            .containers
            .insert(ContainerKey::Skills, Container::skills());
        Self {
            tables: Arc::new(Mutex::new(tables)),
        }
    }

    /// Get count of stored containers.
    pub async fn container_count(&self) -> usize {
        self.tables.lock().await.containers.len()
    }

    /// Get count of stored items.
    pub async fn item_count(&self) -> usize {
        self.tables.lock().await.items.len()
    }
}

#[async_trait]
impl TransactionCoordinator for InMemoryStore {
    async fn begin(&self) -> KanbanResult<Box<dyn StoreTransaction>> {
        let guard = self.tables.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemoryTransaction { guard, working }))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// A transaction over [`InMemoryStore`]. Holds the writer lock until it ends.
pub struct InMemoryTransaction {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
}

#[async_trait]
impl OrderedRepository for InMemoryTransaction {
    async fn container_get(&mut self, key: ContainerKey) -> KanbanResult<Option<Container>> {
        Ok(self.working.containers.get(&key).cloned())
    }

    async fn container_insert(&mut self, container: &Container) -> KanbanResult<()> {
        if self.working.containers.contains_key(&container.key) {
            return Err(StorageError::InsertFailed {
                entity: "container".to_string(),
                reason: format!("{} already exists", container.key),
            }
            .into());
        }
        self.working
            .containers
            .insert(container.key, container.clone());
        Ok(())
    }

    async fn container_delete(&mut self, key: ContainerKey) -> KanbanResult<Vec<PositionedItem>> {
        self.working.require_container(key)?;
        let removed = self.working.members(key);
        self.working.items.retain(|_, item| item.container != key);
        self.working.containers.remove(&key);
        Ok(removed)
    }

    async fn lock_containers(&mut self, _keys: &[ContainerKey]) -> KanbanResult<()> {
        // The whole store is already held by this transaction.
        Ok(())
    }

    async fn list_by_container(&mut self, key: ContainerKey) -> KanbanResult<Vec<PositionedItem>> {
        self.working.require_container(key)?;
        Ok(self.working.members(key))
    }

    async fn max_position(&mut self, key: ContainerKey) -> KanbanResult<i64> {
        self.working.require_container(key)?;
        Ok(self
            .working
            .items
            .values()
            .filter(|item| item.container == key)
            .map(|item| item.position)
            .max()
            .unwrap_or(EMPTY_MAX_POSITION))
    }

    async fn item_get(&mut self, item_id: ItemId) -> KanbanResult<Option<PositionedItem>> {
        Ok(self.working.items.get(&item_id).cloned())
    }

    async fn item_insert(&mut self, item: &PositionedItem) -> KanbanResult<()> {
        self.working.require_container(item.container)?;
        if item.position < 0 {
            return Err(StorageError::InsertFailed {
                entity: "item".to_string(),
                reason: format!("negative position {}", item.position),
            }
            .into());
        }
        if self.working.items.contains_key(&item.item_id) {
            return Err(StorageError::InsertFailed {
                entity: "item".to_string(),
                reason: format!("{} already exists", item.item_id),
            }
            .into());
        }
        self.working.items.insert(item.item_id, item.clone());
        Ok(())
    }

    async fn item_delete(&mut self, item_id: ItemId) -> KanbanResult<()> {
        self.working
            .items
            .remove(&item_id)
            .map(|_| ())
            .ok_or_else(|| NotFoundError::Item { item_id }.into())
    }

    async fn item_update_payload(
        &mut self,
        item_id: ItemId,
        payload: &ItemPayload,
    ) -> KanbanResult<PositionedItem> {
        let item = self
            .working
            .items
            .get_mut(&item_id)
            .ok_or(NotFoundError::Item { item_id })?;
        item.payload = payload.clone();
        item.updated_at = chrono::Utc::now();
        Ok(item.clone())
    }

    async fn set_positions(&mut self, patches: &[PositionPatch]) -> KanbanResult<()> {
        let now = chrono::Utc::now();
        for patch in patches {
            if let Some(target) = patch.container {
                self.working.require_container(target)?;
            }
            if patch.position < 0 {
                return Err(StorageError::Backend {
                    reason: format!("negative position {} for {}", patch.position, patch.item_id),
                }
                .into());
            }
            let item = self
                .working
                .items
                .get_mut(&patch.item_id)
                .ok_or(NotFoundError::Item {
                    item_id: patch.item_id,
                })?;
            item.position = patch.position;
            if let Some(target) = patch.container {
                item.container = target;
            }
            if patch.touch {
                item.updated_at = now;
            }
        }
        Ok(())
    }

    async fn links_to(&mut self, status_id: StatusId) -> KanbanResult<Vec<PositionedItem>> {
        let mut links: Vec<PositionedItem> = self
            .working
            .items
            .values()
            .filter(|item| item.linked_status() == Some(status_id))
            .cloned()
            .collect();
        links.sort_by_key(|item| (item.container, item.position, item.item_id));
        Ok(links)
    }
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    async fn commit(self: Box<Self>) -> KanbanResult<()> {
        let InMemoryTransaction { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> KanbanResult<()> {
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================


#[cfg(test)]
mod prop_tests {
    use super::*;
    use crate::repository::with_transaction;
    use kanban_core::{ordered_ids, EntityIdType, ProjectId};
    use proptest::prelude::*;

    fn store_with(positions: &[i64]) -> (InMemoryStore, ContainerKey, Vec<PositionedItem>) {
        let store = InMemoryStore::new();
        let container = Container::new(
            ContainerKey::Status(StatusId::now_v7()),
            Some(ProjectId::now_v7()),
            "todo",
        );
        let key = container.key;
        let items: Vec<PositionedItem> = positions
            .iter()
            .map(|position| {
                PositionedItem::new(
                    key,
                    *position,
                    ItemPayload::Card {
                        title: format!("card {}", position),
                        description: None,
                    },
                )
            })
            .collect();
        let seeded = items.clone();
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(with_transaction(&store, move |tx| {
            Box::pin(async move {
                tx.container_insert(&container).await?;
                for item in &seeded {
                    tx.item_insert(item).await?;
                }
                Ok(())
            })
        }))
        .unwrap();
        (store, key, items)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Listing returns the canonical order however the rows were written.
        #[test]
        fn prop_list_is_canonical(positions in proptest::collection::vec(0i64..6, 0..10)) {
            let (store, key, items) = store_with(&positions);
            let rt = tokio::runtime::Runtime::new().unwrap();
            let listed = rt
                .block_on(with_transaction(&store, move |tx| {
                    Box::pin(async move { tx.list_by_container(key).await })
                }))
                .unwrap();

            prop_assert_eq!(ordered_ids(&listed), ordered_ids(&items));
            let max = rt
                .block_on(with_transaction(&store, move |tx| {
                    Box::pin(async move { tx.max_position(key).await })
                }))
                .unwrap();
            prop_assert_eq!(max, positions.iter().copied().max().unwrap_or(-1));
        }

        /// Renumbering through `set_positions` always yields a dense container
        /// in the same relative order.
        #[test]
        fn prop_renumber_patches_restore_density(positions in proptest::collection::vec(0i64..20, 1..10)) {
            let (store, key, items) = store_with(&positions);
            let before = ordered_ids(&items);
            let rt = tokio::runtime::Runtime::new().unwrap();
            let listed = rt
                .block_on(with_transaction(&store, move |tx| {
                    Box::pin(async move {
                        let members = tx.list_by_container(key).await?;
                        tx.set_positions(&kanban_core::renumber(&members)).await?;
                        tx.list_by_container(key).await
                    })
                }))
                .unwrap();

            prop_assert!(kanban_core::is_dense(&listed));
            prop_assert_eq!(ordered_ids(&listed), before);
        }
    }
}
