//! Kanban Test Utilities
//!
//! Shared test infrastructure for the kanban workspace:
//! - Proptest generators for containers, indexes and reorder requests
//! - Mock access gates
//! - Fixtures that seed containers through a real transaction
//! - Assertions for the density and ordering invariants

pub use kanban_core::{
    is_dense, ordered_ids, AccessGate, AuthorizationError, BoardId, ConflictError, Container,
    ContainerKey, ContainerKind, EntityIdType, ItemId, ItemPayload, KanbanError, KanbanResult,
    ListId, NotFoundError, PositionedItem, PositioningConfig, Principal, ProjectId, RemovalPolicy,
    ReorderPolicy, StatusId, ValidationError,
};
pub use kanban_storage::{
    with_transaction, InMemoryStore, OrderedRepository, StoreTransaction, TransactionCoordinator,
};

use async_trait::async_trait;
use std::collections::HashSet;
use tokio::sync::RwLock;

// ============================================================================
// MOCK ACCESS GATES
// ============================================================================

pub mod mocks {
    //! Access gates for tests that do not care about project bootstrap.

    use super::*;

    /// Lets every caller through.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct AllowAll;

    #[async_trait]
    impl AccessGate for AllowAll {
        async fn assert_member(&self, _principal: &Principal, _project_id: ProjectId) -> KanbanResult<()> {
            Ok(())
        }

        async fn assert_owner(&self, _principal: &Principal, _project_id: ProjectId) -> KanbanResult<()> {
            Ok(())
        }

        async fn assert_admin(&self, _principal: &Principal) -> KanbanResult<()> {
            Ok(())
        }
    }

    /// Gate over an explicit set of `(project, user)` grants.
    ///
    /// Owners are members. Administrators pass every check.
    #[derive(Debug, Default)]
    pub struct StaticGate {
        owners: RwLock<HashSet<(ProjectId, String)>>,
        members: RwLock<HashSet<(ProjectId, String)>>,
    }

    impl StaticGate {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn grant_owner(&self, project_id: ProjectId, user_id: &str) {
            self.owners
                .write()
                .await
                .insert((project_id, user_id.to_string()));
        }

        pub async fn grant_member(&self, project_id: ProjectId, user_id: &str) {
            self.members
                .write()
                .await
                .insert((project_id, user_id.to_string()));
        }
    }

    #[async_trait]
    impl AccessGate for StaticGate {
        async fn assert_member(&self, principal: &Principal, project_id: ProjectId) -> KanbanResult<()> {
            let grant = (project_id, principal.user_id.clone());
            if principal.is_admin
                || self.owners.read().await.contains(&grant)
                || self.members.read().await.contains(&grant)
            {
                return Ok(());
            }
            Err(AuthorizationError::NotMember {
                project_id,
                user_id: principal.user_id.clone(),
            }
            .into())
        }

        async fn assert_owner(&self, principal: &Principal, project_id: ProjectId) -> KanbanResult<()> {
            let grant = (project_id, principal.user_id.clone());
            if principal.is_admin || self.owners.read().await.contains(&grant) {
                return Ok(());
            }
            Err(AuthorizationError::NotOwner {
                project_id,
                user_id: principal.user_id.clone(),
            }
            .into())
        }
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for position scenarios.

    use proptest::prelude::*;

    use super::*;

    /// Number of members in a generated container.
    pub fn container_size_strategy() -> impl Strategy<Value = usize> {
        0usize..12
    }

    /// A container size together with a valid insertion index `0..=len`.
    pub fn index_strategy() -> impl Strategy<Value = (usize, i64)> {
        container_size_strategy().prop_flat_map(|len| (Just(len), 0..=len as i64))
    }

    /// A shuffled assignment of `0..len` for a container of `len` members.
    pub fn permutation_strategy(len: usize) -> impl Strategy<Value = Vec<i64>> {
        Just((0..len as i64).collect::<Vec<_>>()).prop_shuffle()
    }

    /// Arbitrary (possibly gapped, possibly duplicated) non-negative positions.
    pub fn drifted_positions_strategy(len: usize) -> impl Strategy<Value = Vec<i64>> {
        proptest::collection::vec(0i64..(len as i64 * 3 + 1), len)
    }

    pub fn arb_item_id() -> impl Strategy<Value = ItemId> {
        any::<u128>().prop_map(|raw| ItemId::new(uuid::Uuid::from_u128(raw)))
    }

    pub fn arb_card_payload() -> impl Strategy<Value = ItemPayload> {
        ("[a-z]{1,12}", proptest::option::of("[a-z ]{0,24}")).prop_map(|(title, description)| {
            ItemPayload::Card { title, description }
        })
    }

    pub fn arb_reorder_policy() -> impl Strategy<Value = ReorderPolicy> {
        prop_oneof![Just(ReorderPolicy::Strict), Just(ReorderPolicy::Permissive)]
    }

    pub fn arb_removal_policy() -> impl Strategy<Value = RemovalPolicy> {
        prop_oneof![Just(RemovalPolicy::Renumber), Just(RemovalPolicy::LeaveGap)]
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built rows and seeded stores.

    use super::*;

    pub fn card(container: ContainerKey, position: i64, title: &str) -> PositionedItem {
        PositionedItem::new(
            container,
            position,
            ItemPayload::Card {
                title: title.to_string(),
                description: None,
            },
        )
    }

    pub fn status_container(project_id: ProjectId, name: &str) -> Container {
        Container::new(ContainerKey::Status(StatusId::now_v7()), Some(project_id), name)
    }

    pub fn board_container(project_id: ProjectId, name: &str) -> Container {
        Container::new(ContainerKey::Board(BoardId::now_v7()), Some(project_id), name)
    }

    pub fn list_container(project_id: ProjectId, name: &str) -> Container {
        Container::new(ContainerKey::List(ListId::now_v7()), Some(project_id), name)
    }

    /// Register `container` in `store`.
    pub async fn seed_container<C>(store: &C, container: Container) -> KanbanResult<Container>
    where
        C: TransactionCoordinator + ?Sized,
    {
        with_transaction(store, move |tx| {
            Box::pin(async move {
                tx.container_insert(&container).await?;
                Ok(container)
            })
        })
        .await
    }

    /// Insert one card per position, titled `card-<position>`, bypassing
    /// the service. Positions are written as given, so callers can seed
    /// gapped or duplicated containers.
    pub async fn seed_cards_at<C>(
        store: &C,
        key: ContainerKey,
        positions: &[i64],
    ) -> KanbanResult<Vec<PositionedItem>>
    where
        C: TransactionCoordinator + ?Sized,
    {
        let items: Vec<PositionedItem> = positions
            .iter()
            .map(|position| card(key, *position, &format!("card-{}", position)))
            .collect();
        with_transaction(store, move |tx| {
            Box::pin(async move {
                for item in &items {
                    tx.item_insert(item).await?;
                }
                Ok(items)
            })
        })
        .await
    }

    /// Insert `n` cards at positions `0..n-1`.
    pub async fn seed_cards<C>(store: &C, key: ContainerKey, n: usize) -> KanbanResult<Vec<PositionedItem>>
    where
        C: TransactionCoordinator + ?Sized,
    {
        let positions: Vec<i64> = (0..n as i64).collect();
        seed_cards_at(store, key, &positions).await
    }

    /// Current members of `key` in canonical order.
    pub async fn members<C>(store: &C, key: ContainerKey) -> KanbanResult<Vec<PositionedItem>>
    where
        C: TransactionCoordinator + ?Sized,
    {
        with_transaction(store, move |tx| {
            Box::pin(async move { tx.list_by_container(key).await })
        })
        .await
    }

    /// A project with one status container holding `n` dense cards.
    pub struct SeededProject {
        pub project_id: ProjectId,
        pub status: Container,
        pub cards: Vec<PositionedItem>,
    }

    pub async fn seed_project<C>(store: &C, n: usize) -> KanbanResult<SeededProject>
    where
        C: TransactionCoordinator + ?Sized,
    {
        let project_id = ProjectId::now_v7();
        let status = seed_container(store, status_container(project_id, "todo")).await?;
        let cards = seed_cards(store, status.key, n).await?;
        Ok(SeededProject {
            project_id,
            status,
            cards,
        })
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for ordered-collection invariants.

    use super::*;

    /// Assert that positions are exactly `0..n-1`.
    #[track_caller]
    pub fn assert_dense(items: &[PositionedItem]) {
        let mut positions: Vec<i64> = items.iter().map(|item| item.position).collect();
        positions.sort_unstable();
        assert!(
            is_dense(items),
            "Expected dense positions 0..{}, got {:?}",
            items.len(),
            positions
        );
    }

    /// Assert the canonical order of `items` equals `expected`.
    #[track_caller]
    pub fn assert_order(items: &[PositionedItem], expected: &[ItemId]) {
        assert_eq!(ordered_ids(items), expected, "Unexpected item order");
    }

    #[track_caller]
    pub fn assert_validation_error<T: std::fmt::Debug>(result: &KanbanResult<T>) {
        match result {
            Err(KanbanError::Validation(_)) => {}
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &KanbanResult<T>) {
        match result {
            Err(KanbanError::NotFound(_)) => {}
            other => panic!("Expected NotFound error, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_conflict<T: std::fmt::Debug>(result: &KanbanResult<T>) {
        match result {
            Err(KanbanError::Conflict(_)) => {}
            other => panic!("Expected Conflict error, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_unauthorized<T: std::fmt::Debug>(result: &KanbanResult<T>) {
        match result {
            Err(KanbanError::Authorization(_)) => {}
            other => panic!("Expected Authorization error, got: {:?}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::assertions::*;
    use super::fixtures::*;
    use super::*;

    #[tokio::test]
    async fn test_seed_project_is_dense() {
        let store = InMemoryStore::new();
        let seeded = seed_project(&store, 4).await.unwrap();
        let listed = members(&store, seeded.status.key).await.unwrap();
        assert_dense(&listed);
        let ids: Vec<ItemId> = seeded.cards.iter().map(|c| c.item_id).collect();
        assert_order(&listed, &ids);
    }

    #[tokio::test]
    async fn test_static_gate() {
        let gate = mocks::StaticGate::new();
        let project = ProjectId::now_v7();
        gate.grant_owner(project, "olive").await;
        gate.grant_member(project, "mel").await;

        assert!(gate.assert_owner(&Principal::user("olive"), project).await.is_ok());
        assert!(gate.assert_member(&Principal::user("olive"), project).await.is_ok());
        assert!(gate.assert_member(&Principal::user("mel"), project).await.is_ok());
        assert_unauthorized(&gate.assert_owner(&Principal::user("mel"), project).await);
        assert_unauthorized(&gate.assert_member(&Principal::user("eve"), project).await);
        assert!(gate.assert_owner(&Principal::admin("root"), project).await.is_ok());
    }
}
