//! Identity types for kanban entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Common behaviour of the strongly-typed entity identifiers.
///
/// Every id wraps a UUIDv7 so ids sort by creation time, which is also the
/// secondary ordering key used when two items share a position.
pub trait EntityIdType:
    Copy + Eq + Ord + std::hash::Hash + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    /// Human-readable entity name used in error messages.
    const ENTITY_NAME: &'static str;

    /// Wrap an existing UUID.
    fn new(uuid: Uuid) -> Self;

    /// Borrow the underlying UUID.
    fn as_uuid(&self) -> Uuid;

    /// Generate a fresh, timestamp-sortable id.
    fn now_v7() -> Self {
        Self::new(Uuid::now_v7())
    }

    /// The all-zero id, handy in tests.
    fn nil() -> Self {
        Self::new(Uuid::nil())
    }
}

macro_rules! define_entity_id {
    ($(#[$meta:meta])* $name:ident, $entity:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl EntityIdType for $name {
            const ENTITY_NAME: &'static str = $entity;

            fn new(uuid: Uuid) -> Self {
                Self(uuid)
            }

            fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl $name {
            /// Generate a fresh UUIDv7 id.
            pub fn now_v7() -> Self {
                <Self as EntityIdType>::now_v7()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_entity_id!(
    /// Project: the logical scope that owns statuses, boards, lists and tags.
    ProjectId,
    "project"
);
define_entity_id!(
    /// Status column; the container for cards.
    StatusId,
    "status"
);
define_entity_id!(
    /// Board; the container for status-column links.
    BoardId,
    "board"
);
define_entity_id!(
    /// List (table view); the container for field columns.
    ListId,
    "list"
);
define_entity_id!(
    /// Any positioned row. Unique across all containers and never reused.
    ItemId,
    "item"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_roundtrip_through_text() {
        let id = StatusId::now_v7();
        let parsed: StatusId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_id_serializes_as_plain_uuid() {
        let id = BoardId::nil();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"00000000-0000-0000-0000-000000000000\"");
    }

    #[test]
    fn test_entity_names() {
        assert_eq!(ProjectId::ENTITY_NAME, "project");
        assert_eq!(ItemId::ENTITY_NAME, "item");
    }
}
