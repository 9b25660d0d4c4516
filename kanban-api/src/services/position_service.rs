//! Position Service
//!
//! Engine operations over ordered collections. Each public method opens one
//! transaction, locks the containers it touches, checks the caller against
//! the access gate, computes patches with `kanban_core::positioning` and
//! writes them back. Nothing is persisted when any step fails.

use std::sync::Arc;

use kanban_core::{
    append_position, bulk_reorder, density_violations, insert_at_index, move_across, renumber,
    AccessGate, BoardId, ConflictError, Container, ContainerKey, ContainerKind, ItemId,
    ItemPayload, ItemUpdate, KanbanResult, NotFoundError, PositionedItem, PositioningConfig,
    Principal, ProjectId, RemovalPolicy, ReorderPolicy, StatusId, ValidationError,
};
use kanban_storage::{with_transaction, StoreTransaction, TransactionCoordinator};
use uuid::Uuid;

// ============================================================================
// ACCESS CHECKS
// ============================================================================

/// What the caller wants to do with a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Read,
    Write,
    Own,
}

/// The principal of one operation together with the gate that judges it.
struct Caller {
    gate: Arc<dyn AccessGate>,
    principal: Principal,
}

impl Caller {
    /// Project containers need membership (ownership for `Own`). Global
    /// containers are readable by anyone and writable by administrators.
    async fn authorize(&self, container: &Container, access: Access) -> KanbanResult<()> {
        match (container.project_id, access) {
            (None, Access::Read) => Ok(()),
            (None, _) => self.gate.assert_admin(&self.principal).await,
            (Some(project_id), Access::Own) => {
                self.gate.assert_owner(&self.principal, project_id).await
            }
            (Some(project_id), _) => self.gate.assert_member(&self.principal, project_id).await,
        }
    }
}

// ============================================================================
// SERVICE
// ============================================================================

/// Position engine bound to a store, an access gate and positioning policies.
#[derive(Clone)]
pub struct PositionService {
    store: Arc<dyn TransactionCoordinator>,
    gate: Arc<dyn AccessGate>,
    config: PositioningConfig,
}

impl PositionService {
    pub fn new(
        store: Arc<dyn TransactionCoordinator>,
        gate: Arc<dyn AccessGate>,
        config: PositioningConfig,
    ) -> Self {
        Self {
            store,
            gate,
            config,
        }
    }

    pub fn config(&self) -> PositioningConfig {
        self.config
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    pub async fn health_check(&self) -> KanbanResult<()> {
        self.store.health_check().await
    }

    fn caller(&self, principal: &Principal) -> Caller {
        Caller {
            gate: self.gate.clone(),
            principal: principal.clone(),
        }
    }

    // ========================================================================
    // ENGINE OPERATIONS
    // ========================================================================

    /// Move an item to `index` of `target`.
    ///
    /// Within one container the item is spliced in and the container
    /// renumbered. Across containers the target is renumbered around the
    /// item and the source closes its gap, all in one transaction.
    pub async fn move_item(
        &self,
        principal: &Principal,
        item_id: ItemId,
        target: ContainerKey,
        index: i64,
    ) -> KanbanResult<PositionedItem> {
        let caller = self.caller(principal);
        with_transaction(self.store.as_ref(), move |tx| {
            Box::pin(move_in_tx(tx, caller, item_id, target, index))
        })
        .await
    }

    /// Apply a caller-supplied position assignment under the configured
    /// [`ReorderPolicy`].
    pub async fn reorder_container(
        &self,
        principal: &Principal,
        key: ContainerKey,
        requested: Vec<(ItemId, i64)>,
    ) -> KanbanResult<()> {
        let caller = self.caller(principal);
        let policy = self.config.reorder_policy;
        with_transaction(self.store.as_ref(), move |tx| {
            Box::pin(reorder_in_tx(tx, caller, policy, key, requested))
        })
        .await
    }

    /// Insert a new item at the end of `key`.
    pub async fn append(
        &self,
        principal: &Principal,
        key: ContainerKey,
        payload: ItemPayload,
    ) -> KanbanResult<PositionedItem> {
        let caller = self.caller(principal);
        with_transaction(self.store.as_ref(), move |tx| {
            Box::pin(append_in_tx(tx, caller, key, payload))
        })
        .await
    }

    /// Place an existing status on a board as its last column.
    pub async fn link_existing(
        &self,
        principal: &Principal,
        board: BoardId,
        status_id: StatusId,
    ) -> KanbanResult<PositionedItem> {
        let caller = self.caller(principal);
        with_transaction(self.store.as_ref(), move |tx| {
            Box::pin(link_in_tx(tx, caller, board, status_id))
        })
        .await
    }

    /// Take a status off a board.
    pub async fn unlink(
        &self,
        principal: &Principal,
        board: BoardId,
        status_id: StatusId,
    ) -> KanbanResult<()> {
        let caller = self.caller(principal);
        let policy = self.config.removal_policy;
        with_transaction(self.store.as_ref(), move |tx| {
            Box::pin(unlink_in_tx(tx, caller, policy, board, status_id))
        })
        .await
    }

    /// Delete an item, returning it as it was.
    pub async fn remove_item(
        &self,
        principal: &Principal,
        item_id: ItemId,
    ) -> KanbanResult<PositionedItem> {
        let caller = self.caller(principal);
        let policy = self.config.removal_policy;
        with_transaction(self.store.as_ref(), move |tx| {
            Box::pin(remove_in_tx(tx, caller, policy, item_id))
        })
        .await
    }

    /// Apply a partial payload update. Positions are untouched.
    pub async fn update_item(
        &self,
        principal: &Principal,
        item_id: ItemId,
        update: ItemUpdate,
    ) -> KanbanResult<PositionedItem> {
        let caller = self.caller(principal);
        with_transaction(self.store.as_ref(), move |tx| {
            Box::pin(update_in_tx(tx, caller, item_id, update))
        })
        .await
    }

    // ========================================================================
    // READS
    // ========================================================================

    /// Members of a container in canonical order.
    pub async fn list(
        &self,
        principal: &Principal,
        key: ContainerKey,
    ) -> KanbanResult<Vec<PositionedItem>> {
        let caller = self.caller(principal);
        with_transaction(self.store.as_ref(), move |tx| {
            Box::pin(list_in_tx(tx, caller, key))
        })
        .await
    }

    pub async fn get_item(
        &self,
        principal: &Principal,
        item_id: ItemId,
    ) -> KanbanResult<PositionedItem> {
        let caller = self.caller(principal);
        with_transaction(self.store.as_ref(), move |tx| {
            Box::pin(get_item_in_tx(tx, caller, item_id))
        })
        .await
    }

    pub async fn get_container(
        &self,
        principal: &Principal,
        key: ContainerKey,
    ) -> KanbanResult<Container> {
        let caller = self.caller(principal);
        with_transaction(self.store.as_ref(), move |tx| {
            Box::pin(get_container_in_tx(tx, caller, key))
        })
        .await
    }

    // ========================================================================
    // CONTAINER LIFECYCLE
    // ========================================================================

    /// Create a status, board or list container in a project the caller owns.
    pub async fn create_container(
        &self,
        principal: &Principal,
        kind: ContainerKind,
        project_id: ProjectId,
        name: &str,
    ) -> KanbanResult<Container> {
        if matches!(kind, ContainerKind::Skills | ContainerKind::Tags) {
            return Err(ValidationError::InvalidValue {
                field: "kind".to_string(),
                reason: format!("{} containers cannot be created directly", kind),
            }
            .into());
        }
        let name = required_name(name)?;
        let container = Container::new(
            ContainerKey::from_parts(kind, Uuid::now_v7()),
            Some(project_id),
            name,
        );
        let caller = self.caller(principal);
        with_transaction(self.store.as_ref(), move |tx| {
            Box::pin(create_in_tx(tx, caller, container))
        })
        .await
    }

    /// Create the tag list every project carries.
    pub async fn create_project_containers(
        &self,
        principal: &Principal,
        project_id: ProjectId,
    ) -> KanbanResult<Container> {
        let container = Container::new(ContainerKey::Tags(project_id), Some(project_id), "tags");
        let caller = self.caller(principal);
        with_transaction(self.store.as_ref(), move |tx| {
            Box::pin(create_in_tx(tx, caller, container))
        })
        .await
    }

    /// Delete a container and its members.
    ///
    /// Deleting a status also takes it off every board linking it, and
    /// those boards close their gaps per the removal policy. Returns every
    /// removed row.
    pub async fn delete_container(
        &self,
        principal: &Principal,
        key: ContainerKey,
    ) -> KanbanResult<Vec<PositionedItem>> {
        if matches!(key, ContainerKey::Skills | ContainerKey::Tags(_)) {
            return Err(ValidationError::InvalidValue {
                field: "container".to_string(),
                reason: format!("{} containers cannot be deleted", key.kind()),
            }
            .into());
        }
        let caller = self.caller(principal);
        let policy = self.config.removal_policy;
        with_transaction(self.store.as_ref(), move |tx| {
            Box::pin(delete_in_tx(tx, caller, policy, key))
        })
        .await
    }

    /// Renumber a drifted container back to `0..n-1`, keeping its current
    /// canonical order.
    pub async fn normalize_container(
        &self,
        principal: &Principal,
        key: ContainerKey,
    ) -> KanbanResult<Vec<PositionedItem>> {
        let caller = self.caller(principal);
        with_transaction(self.store.as_ref(), move |tx| {
            Box::pin(normalize_in_tx(tx, caller, key))
        })
        .await
    }
}

// ============================================================================
// TRANSACTION BODIES
// ============================================================================

async fn require_container(
    tx: &mut dyn StoreTransaction,
    key: ContainerKey,
) -> KanbanResult<Container> {
    tx.container_get(key)
        .await?
        .ok_or_else(|| NotFoundError::Container { key }.into())
}

async fn require_item(
    tx: &mut dyn StoreTransaction,
    item_id: ItemId,
) -> KanbanResult<PositionedItem> {
    tx.item_get(item_id)
        .await?
        .ok_or_else(|| NotFoundError::Item { item_id }.into())
}

/// Lock the item's container plus `extra`, then re-read the item under the
/// lock. Fails if the item changed container in between.
async fn lock_item(
    tx: &mut dyn StoreTransaction,
    item_id: ItemId,
    extra: &[ContainerKey],
) -> KanbanResult<PositionedItem> {
    let seen = require_item(tx, item_id).await?;
    let mut keys = vec![seen.container];
    keys.extend_from_slice(extra);
    tx.lock_containers(&keys).await?;

    let item = require_item(tx, item_id).await?;
    if item.container != seen.container {
        return Err(ConflictError::ConcurrentModification {
            container: seen.container,
        }
        .into());
    }
    Ok(item)
}

/// Renumber `key` unless the policy keeps gaps. Returns the shifted count.
async fn close_gap(
    tx: &mut dyn StoreTransaction,
    key: ContainerKey,
    policy: RemovalPolicy,
) -> KanbanResult<usize> {
    if policy == RemovalPolicy::LeaveGap {
        return Ok(0);
    }
    let members = tx.list_by_container(key).await?;
    let patches = renumber(&members);
    tx.set_positions(&patches).await?;
    Ok(patches.len())
}

/// Insert `payload` at `max + 1`. The caller holds the container lock.
async fn insert_last(
    tx: &mut dyn StoreTransaction,
    key: ContainerKey,
    payload: ItemPayload,
) -> KanbanResult<PositionedItem> {
    let max = tx.max_position(key).await?;
    let item = PositionedItem::new(key, append_position(max)?, payload);
    tx.item_insert(&item).await?;
    tracing::info!(
        container = %key,
        item_id = %item.item_id,
        position = item.position,
        "Appended item"
    );
    Ok(item)
}

fn required_name(name: &str) -> Result<&str, ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::RequiredFieldMissing {
            field: "name".to_string(),
        });
    }
    Ok(name)
}

/// A cross-container move must carry a movable item into a container of
/// its kind in the same project.
fn check_destination(
    item: &PositionedItem,
    source: &Container,
    target: &Container,
) -> Result<(), ValidationError> {
    let invalid = |reason: String| ValidationError::InvalidContainer {
        item_id: item.item_id,
        container: target.key,
        reason,
    };
    if !item.payload.is_movable() {
        return Err(invalid(format!(
            "{} items cannot leave their container",
            item.payload.container_kind()
        )));
    }
    item.payload
        .check_container(target.key)
        .map_err(|e| invalid(e.to_string()))?;
    if source.project_id != target.project_id {
        return Err(invalid("target belongs to another project".to_string()));
    }
    Ok(())
}

async fn move_in_tx(
    tx: &mut dyn StoreTransaction,
    caller: Caller,
    item_id: ItemId,
    target: ContainerKey,
    index: i64,
) -> KanbanResult<PositionedItem> {
    let item = lock_item(tx, item_id, &[target]).await?;
    let source = item.container;
    let source_container = require_container(tx, source).await?;
    caller.authorize(&source_container, Access::Write).await?;

    let patches = if source == target {
        let siblings = tx.list_by_container(target).await?;
        insert_at_index(&siblings, item_id, index)?
    } else {
        let target_container = require_container(tx, target).await?;
        caller.authorize(&target_container, Access::Write).await?;
        check_destination(&item, &source_container, &target_container)?;
        let source_items = tx.list_by_container(source).await?;
        let target_items = tx.list_by_container(target).await?;
        move_across(&source_items, &target_items, item_id, target, index)?
    };

    tracing::debug!(item_id = %item_id, patches = patches.len(), "Computed move");
    tx.set_positions(&patches).await?;
    tracing::info!(
        item_id = %item_id,
        from = %source,
        to = %target,
        index,
        "Moved item"
    );
    require_item(tx, item_id).await
}

async fn reorder_in_tx(
    tx: &mut dyn StoreTransaction,
    caller: Caller,
    policy: ReorderPolicy,
    key: ContainerKey,
    requested: Vec<(ItemId, i64)>,
) -> KanbanResult<()> {
    tx.lock_containers(&[key]).await?;
    let container = require_container(tx, key).await?;
    caller.authorize(&container, Access::Write).await?;

    let current = tx.list_by_container(key).await?;
    let patches = bulk_reorder(key, &current, &requested, policy).map_err(|e| {
        tracing::warn!(container = %key, ?policy, error = %e, "Rejected reorder");
        e
    })?;
    tx.set_positions(&patches).await?;
    tracing::info!(
        container = %key,
        ?policy,
        requested = requested.len(),
        changed = patches.len(),
        "Reordered container"
    );
    Ok(())
}

async fn append_in_tx(
    tx: &mut dyn StoreTransaction,
    caller: Caller,
    key: ContainerKey,
    payload: ItemPayload,
) -> KanbanResult<PositionedItem> {
    if matches!(payload, ItemPayload::BoardColumn { .. }) {
        return Err(ValidationError::InvalidValue {
            field: "kind".to_string(),
            reason: "board columns are added by linking a status".to_string(),
        }
        .into());
    }
    payload.check_container(key)?;
    payload.validate()?;

    tx.lock_containers(&[key]).await?;
    let container = require_container(tx, key).await?;
    caller.authorize(&container, Access::Write).await?;
    insert_last(tx, key, payload).await
}

async fn link_in_tx(
    tx: &mut dyn StoreTransaction,
    caller: Caller,
    board: BoardId,
    status_id: StatusId,
) -> KanbanResult<PositionedItem> {
    let board_key = ContainerKey::Board(board);
    let status_key = ContainerKey::Status(status_id);
    tx.lock_containers(&[board_key, status_key]).await?;

    let board_container = require_container(tx, board_key).await?;
    caller.authorize(&board_container, Access::Write).await?;
    let status_container = require_container(tx, status_key).await?;
    if status_container.project_id != board_container.project_id {
        return Err(ConflictError::ContainerMismatch {
            container: board_key,
            subject: status_key.to_string(),
        }
        .into());
    }

    let links = tx.links_to(status_id).await?;
    if links.iter().any(|link| link.container == board_key) {
        return Err(ConflictError::AlreadyLinked {
            container: board_key,
            status_id,
        }
        .into());
    }
    insert_last(tx, board_key, ItemPayload::BoardColumn { status_id }).await
}

async fn unlink_in_tx(
    tx: &mut dyn StoreTransaction,
    caller: Caller,
    policy: RemovalPolicy,
    board: BoardId,
    status_id: StatusId,
) -> KanbanResult<()> {
    let board_key = ContainerKey::Board(board);
    tx.lock_containers(&[board_key]).await?;
    let board_container = require_container(tx, board_key).await?;
    caller.authorize(&board_container, Access::Write).await?;

    let link = tx
        .links_to(status_id)
        .await?
        .into_iter()
        .find(|link| link.container == board_key)
        .ok_or(NotFoundError::NotLinked {
            container: board_key,
            status_id,
        })?;
    tx.item_delete(link.item_id).await?;
    let shifted = close_gap(tx, board_key, policy).await?;
    tracing::info!(
        board = %board_key,
        status_id = %status_id,
        shifted,
        "Unlinked status"
    );
    Ok(())
}

async fn remove_in_tx(
    tx: &mut dyn StoreTransaction,
    caller: Caller,
    policy: RemovalPolicy,
    item_id: ItemId,
) -> KanbanResult<PositionedItem> {
    let item = lock_item(tx, item_id, &[]).await?;
    let container = require_container(tx, item.container).await?;
    caller.authorize(&container, Access::Write).await?;

    tx.item_delete(item_id).await?;
    let shifted = close_gap(tx, item.container, policy).await?;
    tracing::info!(
        item_id = %item_id,
        container = %item.container,
        shifted,
        "Removed item"
    );
    Ok(item)
}

async fn update_in_tx(
    tx: &mut dyn StoreTransaction,
    caller: Caller,
    item_id: ItemId,
    update: ItemUpdate,
) -> KanbanResult<PositionedItem> {
    let item = require_item(tx, item_id).await?;
    let container = require_container(tx, item.container).await?;
    caller.authorize(&container, Access::Write).await?;

    let payload = update.apply(&item.payload)?;
    let updated = tx.item_update_payload(item_id, &payload).await?;
    tracing::info!(item_id = %item_id, container = %item.container, "Updated item");
    Ok(updated)
}

async fn list_in_tx(
    tx: &mut dyn StoreTransaction,
    caller: Caller,
    key: ContainerKey,
) -> KanbanResult<Vec<PositionedItem>> {
    let container = require_container(tx, key).await?;
    caller.authorize(&container, Access::Read).await?;
    tx.list_by_container(key).await
}

async fn get_item_in_tx(
    tx: &mut dyn StoreTransaction,
    caller: Caller,
    item_id: ItemId,
) -> KanbanResult<PositionedItem> {
    let item = require_item(tx, item_id).await?;
    let container = require_container(tx, item.container).await?;
    caller.authorize(&container, Access::Read).await?;
    Ok(item)
}

async fn get_container_in_tx(
    tx: &mut dyn StoreTransaction,
    caller: Caller,
    key: ContainerKey,
) -> KanbanResult<Container> {
    let container = require_container(tx, key).await?;
    caller.authorize(&container, Access::Read).await?;
    Ok(container)
}

async fn create_in_tx(
    tx: &mut dyn StoreTransaction,
    caller: Caller,
    container: Container,
) -> KanbanResult<Container> {
    caller.authorize(&container, Access::Own).await?;
    tx.lock_containers(&[container.key]).await?;
    if tx.container_get(container.key).await?.is_some() {
        return Err(ConflictError::ContainerExists { key: container.key }.into());
    }
    tx.container_insert(&container).await?;
    tracing::info!(
        container = %container.key,
        project_id = ?container.project_id,
        "Created container"
    );
    Ok(container)
}

async fn delete_in_tx(
    tx: &mut dyn StoreTransaction,
    caller: Caller,
    policy: RemovalPolicy,
    key: ContainerKey,
) -> KanbanResult<Vec<PositionedItem>> {
    let status_id = match key {
        ContainerKey::Status(status_id) => Some(status_id),
        _ => None,
    };

    // Boards linking the status get locked together with it.
    let mut boards = Vec::new();
    if let Some(status_id) = status_id {
        boards = tx
            .links_to(status_id)
            .await?
            .into_iter()
            .map(|link| link.container)
            .collect();
    }
    let mut keys = boards.clone();
    keys.push(key);
    tx.lock_containers(&keys).await?;

    let container = require_container(tx, key).await?;
    caller.authorize(&container, Access::Own).await?;
    let mut removed = tx.container_delete(key).await?;

    if let Some(status_id) = status_id {
        let links = tx.links_to(status_id).await?;
        if let Some(late) = links.iter().find(|link| !boards.contains(&link.container)) {
            return Err(ConflictError::ConcurrentModification {
                container: late.container,
            }
            .into());
        }
        for link in &links {
            tx.item_delete(link.item_id).await?;
        }
        let mut affected: Vec<ContainerKey> = links.iter().map(|link| link.container).collect();
        affected.sort();
        affected.dedup();
        for board in affected {
            close_gap(tx, board, policy).await?;
        }
        removed.extend(links);
    }

    tracing::info!(container = %key, removed = removed.len(), "Deleted container");
    Ok(removed)
}

async fn normalize_in_tx(
    tx: &mut dyn StoreTransaction,
    caller: Caller,
    key: ContainerKey,
) -> KanbanResult<Vec<PositionedItem>> {
    tx.lock_containers(&[key]).await?;
    let container = require_container(tx, key).await?;
    caller.authorize(&container, Access::Own).await?;

    let items = tx.list_by_container(key).await?;
    let drifted = density_violations(&items);
    if drifted.is_empty() {
        tracing::debug!(container = %key, "Container already dense");
        return Ok(items);
    }

    tx.set_positions(&renumber(&items)).await?;
    tracing::info!(container = %key, drifted = drifted.len(), "Normalized container");
    tx.list_by_container(key).await
}
