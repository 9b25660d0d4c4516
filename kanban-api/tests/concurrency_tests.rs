//! Concurrency and Property Tests for the Position Service
//!
//! Concurrent writers against the same containers must leave every
//! container dense, and no item may be lost or duplicated. The property
//! tests drive random operation sequences and check the same after every
//! step.

use std::sync::Arc;

use kanban_api::PositionService;
use kanban_core::{
    ordered_ids, ContainerKey, ContainerKind, ItemId, PositionedItem, PositioningConfig,
    Principal,
};
use kanban_test_utils::{
    assertions::{assert_dense, assert_order},
    fixtures::{members, seed_project},
    generators::{arb_card_payload, index_strategy, permutation_strategy},
    mocks::AllowAll,
    InMemoryStore,
};
use proptest::prelude::*;
use proptest::sample::Index;

#[path = "support/engine.rs"]
mod test_engine_support;
use test_engine_support::{card_payload, test_engine};

fn allow_all_service(store: &InMemoryStore) -> PositionService {
    PositionService::new(
        Arc::new(store.clone()),
        Arc::new(AllowAll),
        PositioningConfig::default(),
    )
}

// ============================================================================
// CONCURRENT WRITERS
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_appends_stay_dense() {
    let engine = test_engine().await;
    let status = engine.container(ContainerKind::Status, "Todo").await;

    let mut handles = Vec::new();
    for i in 0..32 {
        let positions = engine.positions.clone();
        let owner = engine.owner.clone();
        let key = status.key;
        handles.push(tokio::spawn(async move {
            positions
                .append(&owner, key, card_payload(&format!("card {}", i)))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let listed = engine.list(&status).await.unwrap();
    assert_eq!(listed.len(), 32);
    assert_dense(&listed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_moves_conserve_items() {
    let engine = test_engine().await;
    let mut statuses = Vec::new();
    let mut all_cards = Vec::new();
    for name in ["Todo", "Doing", "Done"] {
        let status = engine.container(ContainerKind::Status, name).await;
        all_cards.extend(engine.cards(&status, &["a", "b", "c", "d", "e"]).await);
        statuses.push(status);
    }

    let mut handles = Vec::new();
    for (i, card) in all_cards.iter().enumerate() {
        for round in 0..3 {
            let positions = engine.positions.clone();
            let owner = engine.owner.clone();
            let item_id = card.item_id;
            let target = statuses[(i + round) % statuses.len()].key;
            handles.push(tokio::spawn(async move {
                positions.move_item(&owner, item_id, target, 0).await
            }));
        }
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let mut seen: Vec<ItemId> = Vec::new();
    for status in &statuses {
        let listed = engine.list(status).await.unwrap();
        assert_dense(&listed);
        seen.extend(listed.iter().map(|item| item.item_id));
    }
    let mut expected: Vec<ItemId> = all_cards.iter().map(|card| card.item_id).collect();
    seen.sort();
    expected.sort();
    assert_eq!(seen, expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reorders_leave_one_winner() {
    let store = InMemoryStore::new();
    let seeded = seed_project(&store, 4).await.unwrap();
    let service = allow_all_service(&store);
    let key = seeded.status.key;
    let ids: Vec<ItemId> = seeded.cards.iter().map(|card| card.item_id).collect();

    let forward: Vec<(ItemId, i64)> = ids.iter().copied().zip(0..).collect();
    let backward: Vec<(ItemId, i64)> = ids.iter().rev().copied().zip(0..).collect();

    let mut handles = Vec::new();
    for round in 0..20 {
        let service = service.clone();
        let requested = if round % 2 == 0 {
            forward.clone()
        } else {
            backward.clone()
        };
        handles.push(tokio::spawn(async move {
            service
                .reorder_container(&Principal::user("any"), key, requested)
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let listed = members(&store, key).await.unwrap();
    assert_dense(&listed);
    let order = ordered_ids(&listed);
    let reversed: Vec<ItemId> = ids.iter().rev().copied().collect();
    assert!(order == ids || order == reversed, "mixed order {:?}", order);
}

// ============================================================================
// PROPERTIES
// ============================================================================

/// One step of a random workload over two statuses.
#[derive(Debug, Clone)]
enum Op {
    Append { target: usize },
    Move { item: Index, target: usize, index: Index },
    Remove { item: Index },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..2).prop_map(|target| Op::Append { target }),
        (any::<Index>(), 0usize..2, any::<Index>())
            .prop_map(|(item, target, index)| Op::Move { item, target, index }),
        any::<Index>().prop_map(|item| Op::Remove { item }),
    ]
}

async fn all_members(store: &InMemoryStore, keys: &[ContainerKey]) -> Vec<PositionedItem> {
    let mut out = Vec::new();
    for key in keys {
        out.extend(members(store, *key).await.unwrap());
    }
    out
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Any mix of appends, moves and removes keeps both statuses dense and
    /// accounts for every item.
    #[test]
    fn prop_random_workload_stays_dense(ops in proptest::collection::vec(op_strategy(), 1..24)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let store = InMemoryStore::new();
            let seeded = seed_project(&store, 3).await?;
            let service = allow_all_service(&store);
            let principal = Principal::user("any");

            let other = kanban_test_utils::fixtures::status_container(seeded.project_id, "Done");
            let other = kanban_test_utils::fixtures::seed_container(&store, other).await?;
            let keys = [seeded.status.key, other.key];
            let mut expected_count = seeded.cards.len();

            for op in ops {
                match op {
                    Op::Append { target } => {
                        service
                            .append(&principal, keys[target], card_payload("new"))
                            .await?;
                        expected_count += 1;
                    }
                    Op::Move { item, target, index } => {
                        let everything = all_members(&store, &keys).await;
                        if everything.is_empty() {
                            continue;
                        }
                        let moving = item.get(&everything);
                        let siblings = members(&store, keys[target])
                            .await?
                            .into_iter()
                            .filter(|sibling| sibling.item_id != moving.item_id)
                            .count();
                        let index = index.index(siblings + 1) as i64;
                        let moved = service
                            .move_item(&principal, moving.item_id, keys[target], index)
                            .await?;
                        prop_assert_eq!(moved.container, keys[target]);
                        prop_assert_eq!(moved.position, index);
                    }
                    Op::Remove { item } => {
                        let everything = all_members(&store, &keys).await;
                        if everything.is_empty() {
                            continue;
                        }
                        service
                            .remove_item(&principal, item.get(&everything).item_id)
                            .await?;
                        expected_count -= 1;
                    }
                }

                let mut total = 0;
                for key in keys {
                    let listed = members(&store, key).await?;
                    prop_assert!(kanban_core::is_dense(&listed), "{} drifted", key);
                    total += listed.len();
                }
                prop_assert_eq!(total, expected_count);
            }
            Ok::<(), TestCaseError>(())
        })?;
    }

    /// Moving within a container lands the item at the requested index and
    /// keeps the relative order of everything else.
    #[test]
    fn prop_move_within_lands_at_index((len, index) in index_strategy(), pick in any::<Index>()) {
        prop_assume!(len > 0);
        let index = index.min(len as i64 - 1);
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let store = InMemoryStore::new();
            let seeded = seed_project(&store, len).await?;
            let service = allow_all_service(&store);
            let moving = pick.get(&seeded.cards).item_id;

            service
                .move_item(&Principal::user("any"), moving, seeded.status.key, index)
                .await?;

            let mut expected: Vec<ItemId> = seeded
                .cards
                .iter()
                .map(|card| card.item_id)
                .filter(|id| *id != moving)
                .collect();
            expected.insert(index as usize, moving);

            let listed = members(&store, seeded.status.key).await?;
            prop_assert!(kanban_core::is_dense(&listed));
            prop_assert_eq!(ordered_ids(&listed), expected);
            Ok::<(), TestCaseError>(())
        })?;
    }

    /// A strict reorder with any full permutation is applied exactly.
    #[test]
    fn prop_reorder_applies_permutation(
        perm in (1usize..10).prop_flat_map(permutation_strategy),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let store = InMemoryStore::new();
            let seeded = seed_project(&store, perm.len()).await?;
            let service = allow_all_service(&store);

            let requested: Vec<(ItemId, i64)> = seeded
                .cards
                .iter()
                .map(|card| card.item_id)
                .zip(perm.iter().copied())
                .collect();
            service
                .reorder_container(&Principal::user("any"), seeded.status.key, requested.clone())
                .await?;

            let mut by_position = requested.clone();
            by_position.sort_by_key(|(_, position)| *position);
            let expected: Vec<ItemId> = by_position.into_iter().map(|(id, _)| id).collect();

            let listed = members(&store, seeded.status.key).await?;
            prop_assert!(kanban_core::is_dense(&listed));
            prop_assert_eq!(ordered_ids(&listed), expected);
            Ok::<(), TestCaseError>(())
        })?;
    }

    /// Appending any card payload lands at the end.
    #[test]
    fn prop_append_lands_last(len in 0usize..8, payload in arb_card_payload()) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let store = InMemoryStore::new();
            let seeded = seed_project(&store, len).await?;
            let service = allow_all_service(&store);

            let appended = service
                .append(&Principal::user("any"), seeded.status.key, payload)
                .await?;
            prop_assert_eq!(appended.position, len as i64);

            let listed = members(&store, seeded.status.key).await?;
            let mut expected: Vec<ItemId> = seeded.cards.iter().map(|card| card.item_id).collect();
            expected.push(appended.item_id);
            prop_assert!(kanban_core::is_dense(&listed));
            prop_assert_eq!(ordered_ids(&listed), expected);
            Ok::<(), TestCaseError>(())
        })?;
    }
}

#[tokio::test]
async fn test_seeded_order_is_creation_order() {
    let store = InMemoryStore::new();
    let seeded = seed_project(&store, 5).await.unwrap();
    let listed = members(&store, seeded.status.key).await.unwrap();
    let ids: Vec<ItemId> = seeded.cards.iter().map(|card| card.item_id).collect();
    assert_order(&listed, &ids);
}
