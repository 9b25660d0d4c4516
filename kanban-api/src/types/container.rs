//! Container-related API types

use kanban_core::{ContainerKey, ContainerKind, ItemId, PositionedItem};
use serde::{Deserialize, Serialize};

/// Request to create a status, board or list in a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateContainerRequest {
    pub kind: ContainerKind,
    pub name: String,
}

/// One entry of a bulk reorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderEntry {
    pub item_id: ItemId,
    pub position: i64,
}

/// Request to assign positions to the members of a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderRequest {
    pub items: Vec<ReorderEntry>,
}

impl ReorderRequest {
    pub fn pairs(&self) -> Vec<(ItemId, i64)> {
        self.items
            .iter()
            .map(|entry| (entry.item_id, entry.position))
            .collect()
    }
}

/// Members of a container in canonical order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerItemsResponse {
    pub container: ContainerKey,
    pub items: Vec<PositionedItem>,
}
