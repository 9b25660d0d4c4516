//! Project membership.
//!
//! Records which principals own and belong to which projects. A
//! [`ProjectDirectory`] is also the [`AccessGate`] the position service
//! consults before every operation, so membership must live next to the
//! containers it guards: [`MembershipRegistry`] for the in-memory store and
//! [`crate::db::DbClient`] for PostgreSQL. Administrators pass every check.

use async_trait::async_trait;
use chrono::Utc;
use kanban_core::{
    AccessGate, AuthorizationError, KanbanResult, NotFoundError, Principal, ProjectId, Timestamp,
};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use tokio::sync::RwLock;

/// A registered project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Project {
    pub project_id: ProjectId,
    pub name: String,
    pub owner: String,
    /// Members other than the owner.
    pub members: BTreeSet<String>,
    pub created_at: Timestamp,
}

impl Project {
    /// A fresh project owned by `owner`.
    pub fn new(owner: &Principal, name: impl Into<String>) -> Self {
        Self {
            project_id: ProjectId::now_v7(),
            name: name.into(),
            owner: owner.user_id.clone(),
            members: BTreeSet::new(),
            created_at: Utc::now(),
        }
    }

    pub fn is_member(&self, user_id: &str) -> bool {
        self.owner == user_id || self.members.contains(user_id)
    }
}

/// Project bookkeeping behind the access gate.
#[async_trait]
pub trait ProjectDirectory: AccessGate {
    /// Register a new project owned by `owner`.
    async fn register_project(&self, owner: &Principal, name: &str) -> KanbanResult<Project>;

    /// Add `user_id` to a project. Adding an existing member is a no-op.
    async fn add_member(&self, project_id: ProjectId, user_id: &str) -> KanbanResult<Project>;

    async fn get_project(&self, project_id: ProjectId) -> KanbanResult<Option<Project>>;

    /// Forget a project. Used to undo a registration whose containers
    /// could not be created.
    async fn remove_project(&self, project_id: ProjectId) -> KanbanResult<()>;
}

/// Membership check shared by every [`ProjectDirectory`].
pub(crate) fn check_member(
    project: Option<&Project>,
    principal: &Principal,
    project_id: ProjectId,
) -> KanbanResult<()> {
    let project = project.ok_or(NotFoundError::Project { project_id })?;
    if principal.is_admin || project.is_member(&principal.user_id) {
        return Ok(());
    }
    Err(AuthorizationError::NotMember {
        project_id,
        user_id: principal.user_id.clone(),
    }
    .into())
}

/// Ownership check shared by every [`ProjectDirectory`].
pub(crate) fn check_owner(
    project: Option<&Project>,
    principal: &Principal,
    project_id: ProjectId,
) -> KanbanResult<()> {
    let project = project.ok_or(NotFoundError::Project { project_id })?;
    if principal.is_admin || project.owner == principal.user_id {
        return Ok(());
    }
    Err(AuthorizationError::NotOwner {
        project_id,
        user_id: principal.user_id.clone(),
    }
    .into())
}

/// In-process membership store. Only durable as long as the process.
#[derive(Debug, Default)]
pub struct MembershipRegistry {
    projects: RwLock<HashMap<ProjectId, Project>>,
}

impl MembershipRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProjectDirectory for MembershipRegistry {
    async fn register_project(&self, owner: &Principal, name: &str) -> KanbanResult<Project> {
        let project = Project::new(owner, name);
        self.projects
            .write()
            .await
            .insert(project.project_id, project.clone());
        tracing::info!(
            project_id = %project.project_id,
            owner = %project.owner,
            "Registered project"
        );
        Ok(project)
    }

    async fn add_member(&self, project_id: ProjectId, user_id: &str) -> KanbanResult<Project> {
        let mut projects = self.projects.write().await;
        let project = projects
            .get_mut(&project_id)
            .ok_or(NotFoundError::Project { project_id })?;
        if project.owner != user_id {
            project.members.insert(user_id.to_string());
        }
        Ok(project.clone())
    }

    async fn get_project(&self, project_id: ProjectId) -> KanbanResult<Option<Project>> {
        Ok(self.projects.read().await.get(&project_id).cloned())
    }

    async fn remove_project(&self, project_id: ProjectId) -> KanbanResult<()> {
        self.projects.write().await.remove(&project_id);
        Ok(())
    }
}

#[async_trait]
impl AccessGate for MembershipRegistry {
    async fn assert_member(&self, principal: &Principal, project_id: ProjectId) -> KanbanResult<()> {
        check_member(self.projects.read().await.get(&project_id), principal, project_id)
    }

    async fn assert_owner(&self, principal: &Principal, project_id: ProjectId) -> KanbanResult<()> {
        check_owner(self.projects.read().await.get(&project_id), principal, project_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kanban_core::KanbanError;

    #[tokio::test]
    async fn test_owner_is_member() {
        let registry = MembershipRegistry::new();
        let alice = Principal::user("alice");
        let project = registry.register_project(&alice, "Roadmap").await.unwrap();

        assert!(registry.assert_member(&alice, project.project_id).await.is_ok());
        assert!(registry.assert_owner(&alice, project.project_id).await.is_ok());
    }

    #[tokio::test]
    async fn test_member_is_not_owner() {
        let registry = MembershipRegistry::new();
        let alice = Principal::user("alice");
        let bob = Principal::user("bob");
        let project = registry.register_project(&alice, "Roadmap").await.unwrap();

        assert!(matches!(
            registry.assert_member(&bob, project.project_id).await,
            Err(KanbanError::Authorization(AuthorizationError::NotMember { .. }))
        ));

        registry.add_member(project.project_id, "bob").await.unwrap();
        assert!(registry.assert_member(&bob, project.project_id).await.is_ok());
        assert!(matches!(
            registry.assert_owner(&bob, project.project_id).await,
            Err(KanbanError::Authorization(AuthorizationError::NotOwner { .. }))
        ));
    }

    #[tokio::test]
    async fn test_admin_passes_every_gate() {
        let registry = MembershipRegistry::new();
        let project = registry
            .register_project(&Principal::user("alice"), "Roadmap")
            .await
            .unwrap();
        let root = Principal::admin("root");

        assert!(registry.assert_member(&root, project.project_id).await.is_ok());
        assert!(registry.assert_owner(&root, project.project_id).await.is_ok());
        assert!(registry.assert_admin(&root).await.is_ok());
        assert!(registry.assert_admin(&Principal::user("alice")).await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_project() {
        let registry = MembershipRegistry::new();
        let missing = ProjectId::now_v7();

        assert!(matches!(
            registry.assert_member(&Principal::user("alice"), missing).await,
            Err(KanbanError::NotFound(NotFoundError::Project { .. }))
        ));
        assert!(registry.add_member(missing, "bob").await.is_err());
    }

    #[tokio::test]
    async fn test_adding_owner_as_member_is_noop() {
        let registry = MembershipRegistry::new();
        let project = registry
            .register_project(&Principal::user("alice"), "Roadmap")
            .await
            .unwrap();

        let updated = registry.add_member(project.project_id, "alice").await.unwrap();
        assert!(updated.members.is_empty());
    }

    #[tokio::test]
    async fn test_removed_project_is_unknown() {
        let registry = MembershipRegistry::new();
        let alice = Principal::user("alice");
        let project = registry.register_project(&alice, "Roadmap").await.unwrap();
        assert_eq!(
            registry.get_project(project.project_id).await.unwrap(),
            Some(project.clone())
        );

        registry.remove_project(project.project_id).await.unwrap();
        assert_eq!(registry.get_project(project.project_id).await.unwrap(), None);
        assert!(matches!(
            registry.assert_owner(&alice, project.project_id).await,
            Err(KanbanError::NotFound(NotFoundError::Project { .. }))
        ));
    }
}
