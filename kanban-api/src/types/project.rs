//! Project-related API types

use kanban_core::{ContainerKey, ProjectId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::auth::Project;

/// Request to create a new project. The caller becomes its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
}

/// Request to add a member to a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddMemberRequest {
    pub user_id: String,
}

/// Project response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectResponse {
    pub project_id: ProjectId,
    pub name: String,
    pub owner: String,
    pub members: Vec<String>,
    /// The project's tag list.
    pub tags_container: ContainerKey,
    pub created_at: Timestamp,
}

impl From<Project> for ProjectResponse {
    fn from(project: Project) -> Self {
        Self {
            project_id: project.project_id,
            name: project.name,
            owner: project.owner,
            members: project.members.into_iter().collect(),
            tags_container: ContainerKey::Tags(project.project_id),
            created_at: project.created_at,
        }
    }
}
