//! Container keys: the scopes inside which positions must stay dense.

use crate::error::ValidationError;
use crate::identity::{BoardId, EntityIdType, ListId, ProjectId, StatusId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// The kind of ordered collection a container holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    /// Cards inside a status column
    Status,
    /// Status columns linked onto a board
    Board,
    /// Field columns of a list view
    List,
    /// Tags of a project
    Tags,
    /// The global admin skill list
    Skills,
}

impl ContainerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerKind::Status => "status",
            ContainerKind::Board => "board",
            ContainerKind::List => "list",
            ContainerKind::Tags => "tags",
            ContainerKind::Skills => "skills",
        }
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContainerKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "status" => Ok(ContainerKind::Status),
            "board" => Ok(ContainerKind::Board),
            "list" => Ok(ContainerKind::List),
            "tags" => Ok(ContainerKind::Tags),
            "skills" => Ok(ContainerKind::Skills),
            other => Err(ValidationError::InvalidContainerKey {
                raw: other.to_string(),
                reason: "unknown container kind".to_string(),
            }),
        }
    }
}

/// Identifies one ordered collection.
///
/// The text form (`status:<uuid>`, `skills`, ...) is what gets persisted and
/// what the Postgres store hashes for its advisory locks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ContainerKey {
    Status(StatusId),
    Board(BoardId),
    List(ListId),
    Tags(ProjectId),
    Skills,
}

impl ContainerKey {
    pub fn kind(&self) -> ContainerKind {
        match self {
            ContainerKey::Status(_) => ContainerKind::Status,
            ContainerKey::Board(_) => ContainerKind::Board,
            ContainerKey::List(_) => ContainerKind::List,
            ContainerKey::Tags(_) => ContainerKind::Tags,
            ContainerKey::Skills => ContainerKind::Skills,
        }
    }

    /// Build a key of the given kind around a raw id.
    ///
    /// `Skills` ignores the id since there is exactly one skill list.
    pub fn from_parts(kind: ContainerKind, id: Uuid) -> Self {
        match kind {
            ContainerKind::Status => ContainerKey::Status(StatusId::new(id)),
            ContainerKind::Board => ContainerKey::Board(BoardId::new(id)),
            ContainerKind::List => ContainerKey::List(ListId::new(id)),
            ContainerKind::Tags => ContainerKey::Tags(ProjectId::new(id)),
            ContainerKind::Skills => ContainerKey::Skills,
        }
    }

    /// The raw id carried by the key, if any.
    pub fn raw_id(&self) -> Option<Uuid> {
        match self {
            ContainerKey::Status(id) => Some(id.as_uuid()),
            ContainerKey::Board(id) => Some(id.as_uuid()),
            ContainerKey::List(id) => Some(id.as_uuid()),
            ContainerKey::Tags(id) => Some(id.as_uuid()),
            ContainerKey::Skills => None,
        }
    }

    /// True for containers that are not owned by any project.
    pub fn is_global(&self) -> bool {
        matches!(self, ContainerKey::Skills)
    }
}

impl fmt::Display for ContainerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.raw_id() {
            Some(id) => write!(f, "{}:{}", self.kind(), id),
            None => f.write_str(self.kind().as_str()),
        }
    }
}

impl FromStr for ContainerKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = match s.split_once(':') {
            Some((kind, id)) => (kind.parse::<ContainerKind>()?, Some(id)),
            None => (s.parse::<ContainerKind>()?, None),
        };

        match (kind, id) {
            (ContainerKind::Skills, None) => Ok(ContainerKey::Skills),
            (ContainerKind::Skills, Some(_)) => Err(ValidationError::InvalidContainerKey {
                raw: s.to_string(),
                reason: "the skills container takes no id".to_string(),
            }),
            (_, None) => Err(ValidationError::InvalidContainerKey {
                raw: s.to_string(),
                reason: "missing container id".to_string(),
            }),
            (kind, Some(id)) => {
                let uuid = Uuid::parse_str(id).map_err(|e| ValidationError::InvalidContainerKey {
                    raw: s.to_string(),
                    reason: e.to_string(),
                })?;
                Ok(ContainerKey::from_parts(kind, uuid))
            }
        }
    }
}

impl TryFrom<String> for ContainerKey {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ContainerKey> for String {
    fn from(key: ContainerKey) -> Self {
        key.to_string()
    }
}

/// A registered container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub key: ContainerKey,
    /// Owning project; `None` only for global containers.
    pub project_id: Option<ProjectId>,
    pub name: String,
    pub created_at: Timestamp,
}

impl Container {
    pub fn new(key: ContainerKey, project_id: Option<ProjectId>, name: impl Into<String>) -> Self {
        Self {
            key,
            project_id,
            name: name.into(),
            created_at: chrono::Utc::now(),
        }
    }

    /// The always-present global skill list.
    pub fn skills() -> Self {
        Self::new(ContainerKey::Skills, None, "skills")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_key_text_roundtrip() {
        let keys = [
            ContainerKey::Status(StatusId::now_v7()),
            ContainerKey::Board(BoardId::now_v7()),
            ContainerKey::List(ListId::now_v7()),
            ContainerKey::Tags(ProjectId::now_v7()),
            ContainerKey::Skills,
        ];
        for key in keys {
            let parsed: ContainerKey = key.to_string().parse().unwrap();
            assert_eq!(parsed, key);
        }
    }

    #[test]
    fn test_container_key_rejects_garbage() {
        assert!("column:1".parse::<ContainerKey>().is_err());
        assert!("status".parse::<ContainerKey>().is_err());
        assert!("status:not-a-uuid".parse::<ContainerKey>().is_err());
        assert!(format!("skills:{}", Uuid::nil()).parse::<ContainerKey>().is_err());
    }

    #[test]
    fn test_container_key_serde_uses_text_form() {
        let key = ContainerKey::Status(StatusId::nil());
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"status:00000000-0000-0000-0000-000000000000\"");
        let back: ContainerKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }

    #[test]
    fn test_skills_is_global() {
        assert!(ContainerKey::Skills.is_global());
        assert!(!ContainerKey::Tags(ProjectId::nil()).is_global());
        assert_eq!(Container::skills().project_id, None);
    }
}
