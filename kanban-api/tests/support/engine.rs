#![allow(dead_code)]

use std::sync::Arc;

use kanban_api::{MembershipRegistry, PositionService, ProjectDirectory};
use kanban_core::{
    Container, ContainerKind, ItemPayload, KanbanResult, PositionedItem, PositioningConfig,
    Principal, ProjectId,
};
use kanban_storage::InMemoryStore;

/// A position service over a fresh in-memory store, with one project owned
/// by `owner` and joined by `member`.
pub struct TestEngine {
    pub store: InMemoryStore,
    pub registry: Arc<MembershipRegistry>,
    pub positions: PositionService,
    pub project_id: ProjectId,
    pub owner: Principal,
    pub member: Principal,
    pub outsider: Principal,
    pub admin: Principal,
}

pub async fn test_engine() -> TestEngine {
    test_engine_with(PositioningConfig::default()).await
}

pub async fn test_engine_with(config: PositioningConfig) -> TestEngine {
    let store = InMemoryStore::new();
    let registry = Arc::new(MembershipRegistry::new());
    let positions = PositionService::new(Arc::new(store.clone()), registry.clone(), config);

    let owner = Principal::user("olive");
    let member = Principal::user("mel");
    let project = registry
        .register_project(&owner, "Roadmap")
        .await
        .expect("Failed to register project");
    registry
        .add_member(project.project_id, &member.user_id)
        .await
        .expect("Failed to add member");
    positions
        .create_project_containers(&owner, project.project_id)
        .await
        .expect("Failed to create project containers");

    TestEngine {
        store,
        registry,
        positions,
        project_id: project.project_id,
        owner,
        member,
        outsider: Principal::user("eve"),
        admin: Principal::admin("root"),
    }
}

impl TestEngine {
    pub async fn container(&self, kind: ContainerKind, name: &str) -> Container {
        self.positions
            .create_container(&self.owner, kind, self.project_id, name)
            .await
            .expect("Failed to create container")
    }

    /// Append one card per title to a status and return them in order.
    pub async fn cards(&self, status: &Container, titles: &[&str]) -> Vec<PositionedItem> {
        let mut out = Vec::with_capacity(titles.len());
        for title in titles {
            out.push(
                self.positions
                    .append(&self.owner, status.key, card_payload(title))
                    .await
                    .expect("Failed to append card"),
            );
        }
        out
    }

    pub async fn list(&self, container: &Container) -> KanbanResult<Vec<PositionedItem>> {
        self.positions.list(&self.owner, container.key).await
    }
}

pub fn card_payload(title: &str) -> ItemPayload {
    ItemPayload::Card {
        title: title.to_string(),
        description: None,
    }
}

pub fn titles(items: &[PositionedItem]) -> Vec<String> {
    items
        .iter()
        .map(|item| match &item.payload {
            ItemPayload::Card { title, .. } => title.clone(),
            ItemPayload::Tag { name, .. } | ItemPayload::Skill { name, .. } => name.clone(),
            ItemPayload::ListColumn { field, .. } => field.clone(),
            ItemPayload::BoardColumn { status_id } => status_id.to_string(),
        })
        .collect()
}
