//! Positioned items and their per-kind payloads.

use crate::container::{ContainerKey, ContainerKind};
use crate::error::{KanbanResult, ValidationError};
use crate::identity::{ItemId, StatusId, Timestamp};
use serde::{Deserialize, Serialize};

/// Kind-specific row content. Irrelevant to ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemPayload {
    Card {
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    /// Link row placing an existing status on a board.
    BoardColumn { status_id: StatusId },
    ListColumn { field: String, label: String },
    Tag { name: String, color: String },
    Skill { name: String, instructions: String },
}

impl ItemPayload {
    /// The container kind this payload lives in.
    pub fn container_kind(&self) -> ContainerKind {
        match self {
            ItemPayload::Card { .. } => ContainerKind::Status,
            ItemPayload::BoardColumn { .. } => ContainerKind::Board,
            ItemPayload::ListColumn { .. } => ContainerKind::List,
            ItemPayload::Tag { .. } => ContainerKind::Tags,
            ItemPayload::Skill { .. } => ContainerKind::Skills,
        }
    }

    /// Movable items can change container; structural ones are bound to theirs.
    pub fn is_movable(&self) -> bool {
        matches!(self, ItemPayload::Card { .. })
    }

    /// Reject payloads whose text fields are blank.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let required: Vec<(&str, &str)> = match self {
            ItemPayload::Card { title, .. } => vec![("title", title.as_str())],
            ItemPayload::BoardColumn { .. } => Vec::new(),
            ItemPayload::ListColumn { field, label } => {
                vec![("field", field.as_str()), ("label", label.as_str())]
            }
            ItemPayload::Tag { name, color } => {
                vec![("name", name.as_str()), ("color", color.as_str())]
            }
            ItemPayload::Skill { name, .. } => vec![("name", name.as_str())],
        };
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ValidationError::RequiredFieldMissing {
                    field: field.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Check the payload may be stored in `container`.
    pub fn check_container(&self, container: ContainerKey) -> Result<(), ValidationError> {
        if self.container_kind() != container.kind() {
            return Err(ValidationError::KindMismatch {
                expected: container.kind(),
                got: self.container_kind(),
            });
        }
        Ok(())
    }
}

/// A row participating in an ordered collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionedItem {
    pub item_id: ItemId,
    pub container: ContainerKey,
    pub position: i64,
    pub payload: ItemPayload,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl PositionedItem {
    pub fn new(container: ContainerKey, position: i64, payload: ItemPayload) -> Self {
        let now = chrono::Utc::now();
        Self {
            item_id: ItemId::now_v7(),
            container,
            position,
            payload,
            created_at: now,
            updated_at: now,
        }
    }

    /// Status linked by a board-column row.
    pub fn linked_status(&self) -> Option<StatusId> {
        match self.payload {
            ItemPayload::BoardColumn { status_id } => Some(status_id),
            _ => None,
        }
    }
}

// ============================================================================
// UPDATE TYPES
// ============================================================================

/// Update payload for cards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardUpdate {
    pub title: Option<String>,
    /// `Some(None)` clears the description.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub description: Option<Option<String>>,
}

/// Update payload for list columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListColumnUpdate {
    pub field: Option<String>,
    pub label: Option<String>,
}

/// Update payload for tags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagUpdate {
    pub name: Option<String>,
    pub color: Option<String>,
}

/// Update payload for skills.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillUpdate {
    pub name: Option<String>,
    pub instructions: Option<String>,
}

/// A partial update for one item kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemUpdate {
    Card(CardUpdate),
    ListColumn(ListColumnUpdate),
    Tag(TagUpdate),
    Skill(SkillUpdate),
}

impl ItemUpdate {
    fn target_kind(&self) -> ContainerKind {
        match self {
            ItemUpdate::Card(_) => ContainerKind::Status,
            ItemUpdate::ListColumn(_) => ContainerKind::List,
            ItemUpdate::Tag(_) => ContainerKind::Tags,
            ItemUpdate::Skill(_) => ContainerKind::Skills,
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            ItemUpdate::Card(u) => u.title.is_none() && u.description.is_none(),
            ItemUpdate::ListColumn(u) => u.field.is_none() && u.label.is_none(),
            ItemUpdate::Tag(u) => u.name.is_none() && u.color.is_none(),
            ItemUpdate::Skill(u) => u.name.is_none() && u.instructions.is_none(),
        }
    }

    /// Produce the updated payload. Only present fields change.
    pub fn apply(&self, payload: &ItemPayload) -> KanbanResult<ItemPayload> {
        if self.is_empty() {
            return Err(ValidationError::EmptyInput {
                field: "update".to_string(),
            }
            .into());
        }

        let mut next = payload.clone();
        match (self, &mut next) {
            (ItemUpdate::Card(u), ItemPayload::Card { title, description }) => {
                if let Some(t) = &u.title {
                    *title = t.clone();
                }
                if let Some(d) = &u.description {
                    *description = d.clone();
                }
            }
            (ItemUpdate::ListColumn(u), ItemPayload::ListColumn { field, label }) => {
                if let Some(f) = &u.field {
                    *field = f.clone();
                }
                if let Some(l) = &u.label {
                    *label = l.clone();
                }
            }
            (ItemUpdate::Tag(u), ItemPayload::Tag { name, color }) => {
                if let Some(n) = &u.name {
                    *name = n.clone();
                }
                if let Some(c) = &u.color {
                    *color = c.clone();
                }
            }
            (ItemUpdate::Skill(u), ItemPayload::Skill { name, instructions }) => {
                if let Some(n) = &u.name {
                    *name = n.clone();
                }
                if let Some(i) = &u.instructions {
                    *instructions = i.clone();
                }
            }
            _ => {
                return Err(ValidationError::KindMismatch {
                    expected: payload.container_kind(),
                    got: self.target_kind(),
                }
                .into())
            }
        }

        next.validate()?;
        Ok(next)
    }
}
