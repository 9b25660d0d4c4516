//! Item-related API types

use kanban_core::{ItemPayload, StatusId};
use serde::{Deserialize, Serialize};

/// Request to create a card at the end of a status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCardRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl From<CreateCardRequest> for ItemPayload {
    fn from(req: CreateCardRequest) -> Self {
        ItemPayload::Card {
            title: req.title,
            description: req.description,
        }
    }
}

/// Request to move a card to `index` of a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveCardRequest {
    pub status_id: StatusId,
    pub index: i64,
}

/// Request to place an existing status on a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkStatusRequest {
    pub status_id: StatusId,
}

/// Request to add a field column to a list view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateListColumnRequest {
    pub field: String,
    pub label: String,
}

impl From<CreateListColumnRequest> for ItemPayload {
    fn from(req: CreateListColumnRequest) -> Self {
        ItemPayload::ListColumn {
            field: req.field,
            label: req.label,
        }
    }
}

/// Request to add a tag to a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTagRequest {
    pub name: String,
    pub color: String,
}

impl From<CreateTagRequest> for ItemPayload {
    fn from(req: CreateTagRequest) -> Self {
        ItemPayload::Tag {
            name: req.name,
            color: req.color,
        }
    }
}

/// Request to add a skill to the global skill list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSkillRequest {
    pub name: String,
    #[serde(default)]
    pub instructions: String,
}

impl From<CreateSkillRequest> for ItemPayload {
    fn from(req: CreateSkillRequest) -> Self {
        ItemPayload::Skill {
            name: req.name,
            instructions: req.instructions,
        }
    }
}
