//! Request and response bodies of the HTTP API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::model::{Id, Project, ProjectMember, Task, TaskComplexity, TaskStatus, User};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: HealthStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RootResponse {
    #[schema(example = "TaskFlow API")]
    pub message: String,
    #[schema(example = "/docs")]
    pub docs: String,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct UserCreate {
    #[schema(min_length = 3, max_length = 50)]
    #[validate(length(min = 3, max = 50, message = "should have 3 to 50 characters"))]
    pub username: String,
    #[schema(min_length = 6)]
    #[validate(length(min = 6, message = "should have at least 6 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Token {
    pub access_token: String,
    #[schema(example = "bearer")]
    pub token_type: String,
}

impl Token {
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: Id,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserBrief {
    pub id: Id,
    pub username: String,
}

impl From<&User> for UserBrief {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ProjectCreate {
    #[schema(min_length = 1, max_length = 100)]
    #[validate(length(min = 1, max = 100, message = "should have 1 to 100 characters"))]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct ProjectUpdate {
    #[schema(min_length = 1, max_length = 100)]
    #[validate(length(min = 1, max = 100, message = "should have 1 to 100 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProjectMemberResponse {
    pub id: Id,
    pub user: UserBrief,
    pub joined_at: DateTime<Utc>,
}

impl ProjectMemberResponse {
    pub fn new(member: &ProjectMember, user: UserBrief) -> Self {
        Self {
            id: member.id,
            user,
            joined_at: member.joined_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProjectResponse {
    pub id: Id,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: Id,
    pub owner: UserBrief,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub members: Vec<ProjectMemberResponse>,
}

impl ProjectResponse {
    pub fn new(project: Project, owner: UserBrief, members: Vec<ProjectMemberResponse>) -> Self {
        Self {
            id: project.id,
            name: project.name,
            description: project.description,
            owner_id: project.owner_id,
            owner,
            created_at: project.created_at,
            updated_at: project.updated_at,
            members,
        }
    }
}

/// Project as shown in listings, without the member list.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProjectListResponse {
    pub id: Id,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: Id,
    pub owner: UserBrief,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProjectListResponse {
    pub fn new(project: Project, owner: UserBrief) -> Self {
        Self {
            id: project.id,
            name: project.name,
            description: project.description,
            owner_id: project.owner_id,
            owner,
            created_at: project.created_at,
            updated_at: project.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct AddMemberRequest {
    pub user_id: Id,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct TaskCreate {
    #[schema(min_length = 1, max_length = 200)]
    #[validate(length(min = 1, max = 200, message = "should have 1 to 200 characters"))]
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub complexity: TaskComplexity,
    pub assignee_id: Option<Id>,
}

#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct TaskUpdate {
    #[schema(min_length = 1, max_length = 200)]
    #[validate(length(min = 1, max = 200, message = "should have 1 to 200 characters"))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub complexity: Option<TaskComplexity>,
    /// Absent leaves the assignee untouched, `null` clears it.
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<i64>)]
    pub assignee_id: Option<Option<Id>>,
}

/// Wraps any value that is present in the input, `null` included, so it can
/// be told apart from a missing field.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TaskResponse {
    pub id: Id,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub complexity: TaskComplexity,
    pub assignee_id: Option<Id>,
    pub project_id: Id,
    pub creator_id: Id,
    pub creator: UserBrief,
    pub assignee: Option<UserBrief>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskResponse {
    pub fn new(task: Task, creator: UserBrief, assignee: Option<UserBrief>) -> Self {
        Self {
            id: task.id,
            title: task.title,
            description: task.description,
            status: task.status,
            complexity: task.complexity,
            assignee_id: task.assignee_id,
            project_id: task.project_id,
            creator_id: task.creator_id,
            creator,
            assignee,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}
