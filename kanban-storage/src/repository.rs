//! Repository and transaction traits.
//!
//! Every read and write of positioned rows goes through an open
//! [`StoreTransaction`]. Callers obtain one from a [`TransactionCoordinator`]
//! and normally never touch it directly: [`with_transaction`] runs a closure
//! against it, committing on `Ok` and rolling back on `Err`.

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use kanban_core::{
    Container, ContainerKey, ItemId, ItemPayload, KanbanResult, PositionPatch, PositionedItem,
    StatusId,
};

/// Ordered collection reads and writes, scoped to one open transaction.
#[async_trait]
pub trait OrderedRepository: Send {
    // ========================================================================
    // CONTAINER OPERATIONS
    // ========================================================================

    /// Get a container by key.
    async fn container_get(&mut self, key: ContainerKey) -> KanbanResult<Option<Container>>;

    /// Register a new container. Duplicate keys are rejected.
    async fn container_insert(&mut self, container: &Container) -> KanbanResult<()>;

    /// Remove a container and all of its members, returning the members.
    async fn container_delete(&mut self, key: ContainerKey) -> KanbanResult<Vec<PositionedItem>>;

    /// Serialize writers on the given containers until the transaction ends.
    async fn lock_containers(&mut self, keys: &[ContainerKey]) -> KanbanResult<()>;

    // ========================================================================
    // ITEM OPERATIONS
    // ========================================================================

    /// Members of a container, ascending by position then item id.
    async fn list_by_container(&mut self, key: ContainerKey) -> KanbanResult<Vec<PositionedItem>>;

    /// Highest position in a container, `-1` when empty.
    async fn max_position(&mut self, key: ContainerKey) -> KanbanResult<i64>;

    /// Get an item by id.
    async fn item_get(&mut self, item_id: ItemId) -> KanbanResult<Option<PositionedItem>>;

    /// Insert an item into an existing container.
    async fn item_insert(&mut self, item: &PositionedItem) -> KanbanResult<()>;

    /// Delete an item. Siblings are left as they are.
    async fn item_delete(&mut self, item_id: ItemId) -> KanbanResult<()>;

    /// Replace an item's payload and touch `updated_at`.
    async fn item_update_payload(
        &mut self,
        item_id: ItemId,
        payload: &ItemPayload,
    ) -> KanbanResult<PositionedItem>;

    /// Apply position patches. `updated_at` changes only on touched patches.
    async fn set_positions(&mut self, patches: &[PositionPatch]) -> KanbanResult<()>;

    /// Board-column rows linking the given status.
    async fn links_to(&mut self, status_id: StatusId) -> KanbanResult<Vec<PositionedItem>>;
}

/// An open transaction. Dropping it without committing discards its writes.
#[async_trait]
pub trait StoreTransaction: OrderedRepository {
    /// Make every write of this transaction visible.
    async fn commit(self: Box<Self>) -> KanbanResult<()>;

    /// Discard every write of this transaction.
    async fn rollback(self: Box<Self>) -> KanbanResult<()>;
}

/// Source of transactions.
#[async_trait]
pub trait TransactionCoordinator: Send + Sync {
    /// Open a new transaction.
    async fn begin(&self) -> KanbanResult<Box<dyn StoreTransaction>>;

    /// Backend name for logs and health output.
    fn backend_name(&self) -> &'static str;

    /// Verify the backend is reachable.
    async fn health_check(&self) -> KanbanResult<()> {
        Ok(())
    }
}

/// Run `work` inside one transaction.
///
/// Commits when `work` returns `Ok`, rolls back when it returns `Err`. The
/// closure may only capture owned data:
///
/// ```ignore
/// let item = with_transaction(store, move |tx| Box::pin(async move {
///     let max = tx.max_position(key).await?;
///     let item = PositionedItem::new(key, append_position(max)?, payload);
///     tx.item_insert(&item).await?;
///     Ok(item)
/// })).await?;
/// ```
pub async fn with_transaction<C, T, F>(coordinator: &C, work: F) -> KanbanResult<T>
where
    C: TransactionCoordinator + ?Sized,
    T: Send,
    F: for<'t> FnOnce(&'t mut dyn StoreTransaction) -> BoxFuture<'t, KanbanResult<T>> + Send,
{
    let mut tx = coordinator.begin().await?;
    match work(tx.as_mut()).await {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!(
                    backend = coordinator.backend_name(),
                    error = %rollback_err,
                    "Rollback failed after transaction error"
                );
            }
            Err(err)
        }
    }
}
