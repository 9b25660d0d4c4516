//! Position algorithms.
//!
//! Pure functions over a snapshot of one or two containers. They never touch
//! the store: callers read the snapshot inside a transaction, compute the
//! patches here, and write them back in the same transaction.
//!
//! Ordering rule everywhere: ascending `position`, ties broken by `item_id`.
//! Item ids are UUIDv7, so ties resolve to creation order.

use crate::config::ReorderPolicy;
use crate::container::ContainerKey;
use crate::error::ValidationError;
use crate::identity::ItemId;
use crate::item::PositionedItem;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// `max_position` of an empty container.
pub const EMPTY_MAX_POSITION: i64 = -1;

/// Highest position any item may hold.
pub const MAX_POSITION: i64 = i32::MAX as i64;

/// One row write produced by an algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionPatch {
    pub item_id: ItemId,
    pub position: i64,
    /// New container for cross-container moves.
    pub container: Option<ContainerKey>,
    /// Touch `updated_at`. Only set on the item the caller acted on.
    pub touch: bool,
}

impl PositionPatch {
    fn shift(item_id: ItemId, position: i64) -> Self {
        Self {
            item_id,
            position,
            container: None,
            touch: false,
        }
    }
}

/// Members in canonical order.
pub fn ordered<'a>(items: impl IntoIterator<Item = &'a PositionedItem>) -> Vec<&'a PositionedItem> {
    let mut out: Vec<&PositionedItem> = items.into_iter().collect();
    out.sort_by_key(|item| (item.position, item.item_id));
    out
}

/// Item ids in canonical order.
pub fn ordered_ids(items: &[PositionedItem]) -> Vec<ItemId> {
    ordered(items).into_iter().map(|item| item.item_id).collect()
}

/// Position for a new item appended to a container whose max is `max_position`.
///
/// Fails when the container already holds an item at [`MAX_POSITION`].
pub fn append_position(max_position: i64) -> Result<i64, ValidationError> {
    match max_position.max(EMPTY_MAX_POSITION).checked_add(1) {
        Some(position) if position <= MAX_POSITION => Ok(position),
        _ => Err(ValidationError::PositionOutOfRange {
            position: max_position,
            max: MAX_POSITION,
        }),
    }
}

/// True when positions are exactly `0..n-1`, each once.
pub fn is_dense(items: &[PositionedItem]) -> bool {
    let mut positions: Vec<i64> = items.iter().map(|item| item.position).collect();
    positions.sort_unstable();
    positions
        .iter()
        .enumerate()
        .all(|(idx, position)| *position == idx as i64)
}

/// Items whose position differs from their slot in canonical order.
///
/// Empty exactly when the container is dense.
pub fn density_violations(items: &[PositionedItem]) -> Vec<(ItemId, i64)> {
    ordered(items)
        .into_iter()
        .enumerate()
        .filter(|(idx, item)| item.position != *idx as i64)
        .map(|(_, item)| (item.item_id, item.position))
        .collect()
}

/// Reassign `0..m-1` in canonical order. Only changed rows are patched and
/// none of them are touched.
pub fn renumber(members: &[PositionedItem]) -> Vec<PositionPatch> {
    ordered(members)
        .into_iter()
        .enumerate()
        .filter(|(idx, item)| item.position != *idx as i64)
        .map(|(idx, item)| PositionPatch::shift(item.item_id, idx as i64))
        .collect()
}

/// Splice `moving` into `siblings` at `index` and renumber the result.
///
/// `siblings` must not contain the moving item; any copy of it is ignored.
/// `index` must lie in `[0, siblings.len()]`; out-of-range is rejected
/// rather than clamped.
pub fn insert_at_index(
    siblings: &[PositionedItem],
    moving: ItemId,
    index: i64,
) -> Result<Vec<PositionPatch>, ValidationError> {
    place(siblings, moving, index, None)
}

/// Move `moving` into `target` at `index` and close the gap it leaves in
/// the source container.
///
/// `source_remaining` is the source container without the moving item.
pub fn move_across(
    source_remaining: &[PositionedItem],
    target_siblings: &[PositionedItem],
    moving: ItemId,
    target: ContainerKey,
    index: i64,
) -> Result<Vec<PositionPatch>, ValidationError> {
    let mut patches = place(target_siblings, moving, index, Some(target))?;
    let remaining: Vec<PositionedItem> = source_remaining
        .iter()
        .filter(|item| item.item_id != moving)
        .cloned()
        .collect();
    patches.extend(renumber(&remaining));
    Ok(patches)
}

fn place(
    siblings: &[PositionedItem],
    moving: ItemId,
    index: i64,
    target: Option<ContainerKey>,
) -> Result<Vec<PositionPatch>, ValidationError> {
    let others = ordered(siblings.iter().filter(|item| item.item_id != moving));
    let len = others.len();
    if index < 0 || index as usize > len {
        return Err(ValidationError::InvalidIndex { index, len });
    }
    let index = index as usize;

    let mut patches = Vec::with_capacity(len + 1);
    for (slot, item) in others.iter().enumerate() {
        let position = if slot < index { slot } else { slot + 1 } as i64;
        if item.position != position {
            patches.push(PositionPatch::shift(item.item_id, position));
        }
    }
    patches.push(PositionPatch {
        item_id: moving,
        position: index as i64,
        container: target,
        touch: true,
    });
    Ok(patches)
}

/// Validate a caller-supplied reorder of `container` and turn it into patches.
///
/// Under both policies the request must be non-empty, reference members of
/// the container only, name each item once and carry non-negative
/// positions no greater than [`MAX_POSITION`]. `Strict` additionally
/// requires a full, dense permutation; `Permissive` writes whatever
/// positions were sent.
pub fn bulk_reorder(
    container: ContainerKey,
    current: &[PositionedItem],
    requested: &[(ItemId, i64)],
    policy: ReorderPolicy,
) -> Result<Vec<PositionPatch>, ValidationError> {
    if requested.is_empty() {
        return Err(ValidationError::EmptyInput {
            field: "items".to_string(),
        });
    }

    let members: HashSet<ItemId> = current.iter().map(|item| item.item_id).collect();
    let mut seen_items = HashSet::with_capacity(requested.len());
    for (item_id, position) in requested {
        if !members.contains(item_id) {
            return Err(ValidationError::ItemNotInContainer {
                item_id: *item_id,
                container,
            });
        }
        if !seen_items.insert(*item_id) {
            return Err(ValidationError::DuplicateItem { item_id: *item_id });
        }
        if *position < 0 {
            return Err(ValidationError::NegativePosition {
                item_id: *item_id,
                position: *position,
            });
        }
        if *position > MAX_POSITION {
            return Err(ValidationError::PositionOutOfRange {
                position: *position,
                max: MAX_POSITION,
            });
        }
    }

    if policy == ReorderPolicy::Strict {
        if requested.len() != current.len() {
            return Err(ValidationError::IncompletePermutation {
                container,
                expected: current.len(),
                got: requested.len(),
            });
        }
        let mut seen_positions = HashSet::with_capacity(requested.len());
        for (_, position) in requested {
            if *position as usize >= requested.len() {
                return Err(ValidationError::NotDense {
                    expected_len: requested.len(),
                    position: *position,
                });
            }
            if !seen_positions.insert(*position) {
                return Err(ValidationError::DuplicatePosition {
                    position: *position,
                });
            }
        }
    }

    Ok(requested
        .iter()
        .filter(|(item_id, position)| {
            current
                .iter()
                .find(|item| item.item_id == *item_id)
                .is_some_and(|item| item.position != *position)
        })
        .map(|(item_id, position)| PositionPatch::shift(*item_id, *position))
        .collect())
}

// =============================================================================
// TESTS
// =============================================================================


#[cfg(test)]
mod prop_tests {
    use super::*;
    use crate::identity::StatusId;
    use crate::item::ItemPayload;
    use proptest::prelude::*;

    fn container_of(key: ContainerKey, n: usize) -> Vec<PositionedItem> {
        (0..n)
            .map(|i| {
                PositionedItem::new(
                    key,
                    i as i64,
                    ItemPayload::Card {
                        title: format!("card {}", i),
                        description: None,
                    },
                )
            })
            .collect()
    }

    fn apply(items: &mut [PositionedItem], patches: &[PositionPatch]) {
        for patch in patches {
            if let Some(item) = items.iter_mut().find(|i| i.item_id == patch.item_id) {
                item.position = patch.position;
                if let Some(container) = patch.container {
                    item.container = container;
                }
            }
        }
    }

    fn members(items: &[PositionedItem], key: ContainerKey) -> Vec<PositionedItem> {
        items.iter().filter(|i| i.container == key).cloned().collect()
    }

    /// (size, moving slot, target index) with both slots in range.
    fn move_case() -> impl Strategy<Value = (usize, usize, usize)> {
        (1usize..24).prop_flat_map(|n| (Just(n), 0..n, 0..n))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Any in-container move leaves the container dense with the mover at its index.
        #[test]
        fn prop_move_within_keeps_density((n, from, to) in move_case()) {
            let key = ContainerKey::Status(StatusId::now_v7());
            let mut items = container_of(key, n);
            let moving = items[from].item_id;
            let siblings: Vec<PositionedItem> =
                items.iter().filter(|i| i.item_id != moving).cloned().collect();

            let patches = insert_at_index(&siblings, moving, to as i64)
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            apply(&mut items, &patches);

            prop_assert!(is_dense(&items));
            let mover = items.iter().find(|i| i.item_id == moving).map(|i| i.position);
            prop_assert_eq!(mover, Some(to as i64));
        }

        /// Repeating the same move changes nothing.
        #[test]
        fn prop_move_is_idempotent((n, from, to) in move_case()) {
            let key = ContainerKey::Status(StatusId::now_v7());
            let mut items = container_of(key, n);
            let moving = items[from].item_id;

            for _ in 0..2 {
                let siblings: Vec<PositionedItem> =
                    items.iter().filter(|i| i.item_id != moving).cloned().collect();
                let patches = insert_at_index(&siblings, moving, to as i64)
                    .map_err(|e| TestCaseError::fail(e.to_string()))?;
                apply(&mut items, &patches);
            }
            let after_two = items.clone();

            let siblings: Vec<PositionedItem> =
                items.iter().filter(|i| i.item_id != moving).cloned().collect();
            let patches = insert_at_index(&siblings, moving, to as i64)
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            // Only the mover is rewritten (to touch it); nobody shifts.
            prop_assert_eq!(patches.len(), 1);
            apply(&mut items, &patches);
            prop_assert_eq!(items, after_two);
        }

        /// Cross-container moves conserve members and density on both sides.
        #[test]
        fn prop_move_across_conserves(
            (m, from) in (1usize..16).prop_flat_map(|m| (Just(m), 0..m)),
            (n, to) in (0usize..16).prop_flat_map(|n| (Just(n), 0..=n)),
        ) {
            let source_key = ContainerKey::Status(StatusId::now_v7());
            let target_key = ContainerKey::Status(StatusId::now_v7());
            let mut items = container_of(source_key, m);
            items.extend(container_of(target_key, n));
            let moving = items[from].item_id;

            let source: Vec<PositionedItem> = members(&items, source_key)
                .into_iter()
                .filter(|i| i.item_id != moving)
                .collect();
            let target = members(&items, target_key);
            let patches = move_across(&source, &target, moving, target_key, to as i64)
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            apply(&mut items, &patches);

            let source_after = members(&items, source_key);
            let target_after = members(&items, target_key);
            prop_assert_eq!(source_after.len(), m - 1);
            prop_assert_eq!(target_after.len(), n + 1);
            prop_assert!(is_dense(&source_after));
            prop_assert!(is_dense(&target_after));
            let mover = target_after.iter().find(|i| i.item_id == moving).map(|i| i.position);
            prop_assert_eq!(mover, Some(to as i64));
        }

        /// A full dense permutation is accepted and yields exactly that order.
        #[test]
        fn prop_strict_reorder_preserves_requested_order(
            order in (1usize..16).prop_flat_map(|n| Just((0..n).collect::<Vec<usize>>()).prop_shuffle())
        ) {
            let key = ContainerKey::Status(StatusId::now_v7());
            let mut items = container_of(key, order.len());
            let requested: Vec<(ItemId, i64)> = order
                .iter()
                .enumerate()
                .map(|(position, slot)| (items[*slot].item_id, position as i64))
                .collect();

            let patches = bulk_reorder(key, &items, &requested, ReorderPolicy::Strict)
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            apply(&mut items, &patches);

            let expected: Vec<ItemId> = requested.iter().map(|(id, _)| *id).collect();
            prop_assert_eq!(ordered_ids(&items), expected);
            prop_assert!(is_dense(&items));
        }

        /// Renumbering any position multiset gives a dense container in the same relative order.
        #[test]
        fn prop_renumber_is_dense_and_stable(positions in prop::collection::vec(0i64..50, 0..20)) {
            let key = ContainerKey::Status(StatusId::now_v7());
            let mut items = container_of(key, positions.len());
            for (item, position) in items.iter_mut().zip(&positions) {
                item.position = *position;
            }
            let before = ordered_ids(&items);

            let patches = renumber(&items);
            apply(&mut items, &patches);

            prop_assert!(is_dense(&items));
            prop_assert_eq!(ordered_ids(&items), before);
        }
    }
}
