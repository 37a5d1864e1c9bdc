//! Persistence for users, projects, members and tasks.
//!
//! Handlers talk to a [`Repository`] trait object so the same routes run on
//! top of PostgreSQL in production and an in-memory store in tests or
//! throwaway deployments.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;

use crate::model::{Id, NewTask, Project, ProjectChanges, ProjectMember, Task, TaskChanges, User};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0} already exists")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Repository: Send + Sync {
    /// Fails with [`StoreError::Conflict`] when the username is taken.
    async fn create_user(&self, username: &str, hashed_password: &str) -> StoreResult<User>;

    async fn user_by_id(&self, id: Id) -> StoreResult<Option<User>>;

    async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    /// Case-insensitive substring match on the username, ordered by id.
    async fn search_users(&self, fragment: &str, limit: usize) -> StoreResult<Vec<User>>;

    async fn create_project(
        &self,
        owner_id: Id,
        name: &str,
        description: Option<&str>,
    ) -> StoreResult<Project>;

    async fn project(&self, id: Id) -> StoreResult<Option<Project>>;

    /// Projects owned by or shared with the user, most recently updated first.
    async fn projects_for_user(&self, user_id: Id) -> StoreResult<Vec<Project>>;

    async fn update_project(&self, id: Id, changes: ProjectChanges)
        -> StoreResult<Option<Project>>;

    /// Removes the project together with its members and tasks.
    async fn delete_project(&self, id: Id) -> StoreResult<bool>;

    /// Members in joining order.
    async fn members(&self, project_id: Id) -> StoreResult<Vec<ProjectMember>>;

    /// Fails with [`StoreError::Conflict`] when the user already is a member.
    async fn add_member(&self, project_id: Id, user_id: Id) -> StoreResult<ProjectMember>;

    /// Removes the membership and clears the user's task assignments in the
    /// project. Returns `false` when there was no such membership.
    async fn remove_member(&self, project_id: Id, user_id: Id) -> StoreResult<bool>;

    async fn create_task(&self, task: NewTask) -> StoreResult<Task>;

    /// Tasks of a project, newest first.
    async fn tasks(&self, project_id: Id) -> StoreResult<Vec<Task>>;

    async fn task(&self, project_id: Id, task_id: Id) -> StoreResult<Option<Task>>;

    async fn update_task(
        &self,
        project_id: Id,
        task_id: Id,
        changes: TaskChanges,
    ) -> StoreResult<Option<Task>>;

    async fn delete_task(&self, project_id: Id, task_id: Id) -> StoreResult<bool>;
}
