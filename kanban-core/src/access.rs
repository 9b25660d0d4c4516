//! Caller identity and the access gate consulted before every operation.

use crate::error::{AuthorizationError, KanbanResult};
use crate::identity::ProjectId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The authenticated caller of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: String,
    #[serde(default)]
    pub is_admin: bool,
}

impl Principal {
    pub fn user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            is_admin: false,
        }
    }

    pub fn admin(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            is_admin: true,
        }
    }
}

/// Authorization checks. Administrators pass every gate.
#[async_trait]
pub trait AccessGate: Send + Sync {
    /// Caller must belong to the project (owners are members).
    async fn assert_member(&self, principal: &Principal, project_id: ProjectId) -> KanbanResult<()>;

    /// Caller must own the project.
    async fn assert_owner(&self, principal: &Principal, project_id: ProjectId) -> KanbanResult<()>;

    /// Caller must be an administrator.
    async fn assert_admin(&self, principal: &Principal) -> KanbanResult<()> {
        if principal.is_admin {
            Ok(())
        } else {
            Err(AuthorizationError::AdminRequired {
                user_id: principal.user_id.clone(),
            }
            .into())
        }
    }
}
