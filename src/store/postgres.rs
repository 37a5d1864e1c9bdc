use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};

use super::{Repository, StoreError, StoreResult};
use crate::model::{Id, NewTask, Project, ProjectChanges, ProjectMember, Task, TaskChanges, User};

const USER_COLUMNS: &str = "id, username, hashed_password, created_at";
const PROJECT_COLUMNS: &str = "id, name, description, owner_id, created_at, updated_at";
const MEMBER_COLUMNS: &str = "id, project_id, user_id, joined_at";
const TASK_COLUMNS: &str = "id, title, description, status, complexity, project_id, \
                            creator_id, assignee_id, created_at, updated_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects and brings the schema up to date.
    pub async fn connect(database_uri: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_uri)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("database migrations applied");

        Ok(Self::new(pool))
    }
}

#[derive(sqlx::FromRow)]
struct TaskRow {
    id: Id,
    title: String,
    description: Option<String>,
    status: String,
    complexity: String,
    project_id: Id,
    creator_id: Id,
    assignee_id: Option<Id>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TaskRow> for Task {
    type Error = StoreError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        Ok(Task {
            id: row.id,
            title: row.title,
            description: row.description,
            status: row
                .status
                .parse()
                .map_err(|e| StoreError::Corrupt(format!("task {}: {e}", row.id)))?,
            complexity: row
                .complexity
                .parse()
                .map_err(|e| StoreError::Corrupt(format!("task {}: {e}", row.id)))?,
            project_id: row.project_id,
            creator_id: row.creator_id,
            assignee_id: row.assignee_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Escapes LIKE wildcards so the fragment is matched literally.
fn like_pattern(fragment: &str) -> String {
    let escaped = fragment
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[async_trait]
impl Repository for PgStore {
    async fn create_user(&self, username: &str, hashed_password: &str) -> StoreResult<User> {
        let result = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, hashed_password) VALUES ($1, $2) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(username)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(user) => Ok(user),
            Err(e) if is_unique_violation(&e) => {
                Err(StoreError::Conflict(format!("user '{username}'")))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn user_by_id(&self, id: Id) -> StoreResult<Option<User>> {
        Ok(
            sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn search_users(&self, fragment: &str, limit: usize) -> StoreResult<Vec<User>> {
        Ok(sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username ILIKE $1 ORDER BY id LIMIT $2"
        ))
        .bind(like_pattern(fragment))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn create_project(
        &self,
        owner_id: Id,
        name: &str,
        description: Option<&str>,
    ) -> StoreResult<Project> {
        Ok(sqlx::query_as::<_, Project>(&format!(
            "INSERT INTO projects (name, description, owner_id) VALUES ($1, $2, $3) \
             RETURNING {PROJECT_COLUMNS}"
        ))
        .bind(name)
        .bind(description)
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn project(&self, id: Id) -> StoreResult<Option<Project>> {
        Ok(sqlx::query_as::<_, Project>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn projects_for_user(&self, user_id: Id) -> StoreResult<Vec<Project>> {
        Ok(sqlx::query_as::<_, Project>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects p \
             WHERE p.owner_id = $1 \
                OR EXISTS (SELECT 1 FROM project_members m \
                           WHERE m.project_id = p.id AND m.user_id = $1) \
             ORDER BY p.updated_at DESC, p.id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn update_project(
        &self,
        id: Id,
        changes: ProjectChanges,
    ) -> StoreResult<Option<Project>> {
        Ok(sqlx::query_as::<_, Project>(&format!(
            "UPDATE projects SET \
                name = COALESCE($2, name), \
                description = COALESCE($3, description), \
                updated_at = now() \
             WHERE id = $1 RETURNING {PROJECT_COLUMNS}"
        ))
        .bind(id)
        .bind(changes.name)
        .bind(changes.description)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_project(&self, id: Id) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn members(&self, project_id: Id) -> StoreResult<Vec<ProjectMember>> {
        Ok(sqlx::query_as::<_, ProjectMember>(&format!(
            "SELECT {MEMBER_COLUMNS} FROM project_members WHERE project_id = $1 ORDER BY id"
        ))
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn add_member(&self, project_id: Id, user_id: Id) -> StoreResult<ProjectMember> {
        let result = sqlx::query_as::<_, ProjectMember>(&format!(
            "INSERT INTO project_members (project_id, user_id) VALUES ($1, $2) \
             RETURNING {MEMBER_COLUMNS}"
        ))
        .bind(project_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(member) => Ok(member),
            Err(e) if is_unique_violation(&e) => Err(StoreError::Conflict(format!(
                "membership of user {user_id} in project {project_id}"
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn remove_member(&self, project_id: Id, user_id: Id) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM project_members WHERE project_id = $1 AND user_id = $2")
            .bind(project_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if removed == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            "UPDATE tasks SET assignee_id = NULL, updated_at = now() \
             WHERE project_id = $1 AND assignee_id = $2",
        )
        .bind(project_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn create_task(&self, task: NewTask) -> StoreResult<Task> {
        sqlx::query_as::<_, TaskRow>(&format!(
            "INSERT INTO tasks (title, description, status, complexity, project_id, creator_id, assignee_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {TASK_COLUMNS}"
        ))
        .bind(task.title)
        .bind(task.description)
        .bind(task.status.as_str())
        .bind(task.complexity.as_str())
        .bind(task.project_id)
        .bind(task.creator_id)
        .bind(task.assignee_id)
        .fetch_one(&self.pool)
        .await?
        .try_into()
    }

    async fn tasks(&self, project_id: Id) -> StoreResult<Vec<Task>> {
        sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE project_id = $1 \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Task::try_from)
        .collect()
    }

    async fn task(&self, project_id: Id, task_id: Id) -> StoreResult<Option<Task>> {
        sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1 AND project_id = $2"
        ))
        .bind(task_id)
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await?
        .map(Task::try_from)
        .transpose()
    }

    async fn update_task(
        &self,
        project_id: Id,
        task_id: Id,
        changes: TaskChanges,
    ) -> StoreResult<Option<Task>> {
        let (set_assignee, assignee_id) = match changes.assignee_id {
            Some(assignee_id) => (true, assignee_id),
            None => (false, None),
        };

        sqlx::query_as::<_, TaskRow>(&format!(
            "UPDATE tasks SET \
                title = COALESCE($3, title), \
                description = COALESCE($4, description), \
                status = COALESCE($5, status), \
                complexity = COALESCE($6, complexity), \
                assignee_id = CASE WHEN $7 THEN $8 ELSE assignee_id END, \
                updated_at = now() \
             WHERE id = $1 AND project_id = $2 RETURNING {TASK_COLUMNS}"
        ))
        .bind(task_id)
        .bind(project_id)
        .bind(changes.title)
        .bind(changes.description)
        .bind(changes.status.map(|s| s.as_str()))
        .bind(changes.complexity.map(|c| c.as_str()))
        .bind(set_assignee)
        .bind(assignee_id)
        .fetch_optional(&self.pool)
        .await?
        .map(Task::try_from)
        .transpose()
    }

    async fn delete_task(&self, project_id: Id, task_id: Id) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND project_id = $2")
            .bind(task_id)
            .bind(project_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
