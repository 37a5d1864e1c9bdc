use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{Repository, StoreError, StoreResult};
use crate::model::{Id, NewTask, Project, ProjectChanges, ProjectMember, Task, TaskChanges, User};

/// Keeps everything in process memory. Ids are handed out sequentially per
/// table starting at 1, like a fresh database would.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Tables>,
}

#[derive(Default)]
struct Tables {
    users: BTreeMap<Id, User>,
    projects: BTreeMap<Id, Project>,
    members: BTreeMap<Id, ProjectMember>,
    tasks: BTreeMap<Id, Task>,
    next_user_id: Id,
    next_project_id: Id,
    next_member_id: Id,
    next_task_id: Id,
}

fn next(counter: &mut Id) -> Id {
    *counter += 1;
    *counter
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for MemoryStore {
    async fn create_user(&self, username: &str, hashed_password: &str) -> StoreResult<User> {
        let mut tables = self.inner.write().await;
        if tables.users.values().any(|u| u.username == username) {
            return Err(StoreError::Conflict(format!("user '{username}'")));
        }

        let user = User {
            id: next(&mut tables.next_user_id),
            username: username.to_owned(),
            hashed_password: hashed_password.to_owned(),
            created_at: Utc::now(),
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn user_by_id(&self, id: Id) -> StoreResult<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let tables = self.inner.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn search_users(&self, fragment: &str, limit: usize) -> StoreResult<Vec<User>> {
        let fragment = fragment.to_lowercase();
        let tables = self.inner.read().await;
        Ok(tables
            .users
            .values()
            .filter(|u| u.username.to_lowercase().contains(&fragment))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn create_project(
        &self,
        owner_id: Id,
        name: &str,
        description: Option<&str>,
    ) -> StoreResult<Project> {
        let mut tables = self.inner.write().await;
        let now = Utc::now();
        let project = Project {
            id: next(&mut tables.next_project_id),
            name: name.to_owned(),
            description: description.map(str::to_owned),
            owner_id,
            created_at: now,
            updated_at: now,
        };
        tables.projects.insert(project.id, project.clone());
        Ok(project)
    }

    async fn project(&self, id: Id) -> StoreResult<Option<Project>> {
        Ok(self.inner.read().await.projects.get(&id).cloned())
    }

    async fn projects_for_user(&self, user_id: Id) -> StoreResult<Vec<Project>> {
        let tables = self.inner.read().await;
        let mut projects: Vec<Project> = tables
            .projects
            .values()
            .filter(|p| {
                p.owner_id == user_id
                    || tables
                        .members
                        .values()
                        .any(|m| m.project_id == p.id && m.user_id == user_id)
            })
            .cloned()
            .collect();
        projects.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));
        Ok(projects)
    }

    async fn update_project(
        &self,
        id: Id,
        changes: ProjectChanges,
    ) -> StoreResult<Option<Project>> {
        let mut tables = self.inner.write().await;
        let Some(project) = tables.projects.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(name) = changes.name {
            project.name = name;
        }
        if let Some(description) = changes.description {
            project.description = Some(description);
        }
        project.updated_at = Utc::now();
        Ok(Some(project.clone()))
    }

    async fn delete_project(&self, id: Id) -> StoreResult<bool> {
        let mut tables = self.inner.write().await;
        if tables.projects.remove(&id).is_none() {
            return Ok(false);
        }
        tables.members.retain(|_, m| m.project_id != id);
        tables.tasks.retain(|_, t| t.project_id != id);
        Ok(true)
    }

    async fn members(&self, project_id: Id) -> StoreResult<Vec<ProjectMember>> {
        let tables = self.inner.read().await;
        Ok(tables
            .members
            .values()
            .filter(|m| m.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn add_member(&self, project_id: Id, user_id: Id) -> StoreResult<ProjectMember> {
        let mut tables = self.inner.write().await;
        if tables
            .members
            .values()
            .any(|m| m.project_id == project_id && m.user_id == user_id)
        {
            return Err(StoreError::Conflict(format!(
                "membership of user {user_id} in project {project_id}"
            )));
        }

        let member = ProjectMember {
            id: next(&mut tables.next_member_id),
            project_id,
            user_id,
            joined_at: Utc::now(),
        };
        tables.members.insert(member.id, member.clone());
        Ok(member)
    }

    async fn remove_member(&self, project_id: Id, user_id: Id) -> StoreResult<bool> {
        let mut tables = self.inner.write().await;
        let Some(member_id) = tables
            .members
            .values()
            .find(|m| m.project_id == project_id && m.user_id == user_id)
            .map(|m| m.id)
        else {
            return Ok(false);
        };

        tables.members.remove(&member_id);
        let now = Utc::now();
        for task in tables
            .tasks
            .values_mut()
            .filter(|t| t.project_id == project_id && t.assignee_id == Some(user_id))
        {
            task.assignee_id = None;
            task.updated_at = now;
        }
        Ok(true)
    }

    async fn create_task(&self, new: NewTask) -> StoreResult<Task> {
        let mut tables = self.inner.write().await;
        let now = Utc::now();
        let task = Task {
            id: next(&mut tables.next_task_id),
            title: new.title,
            description: new.description,
            status: new.status,
            complexity: new.complexity,
            project_id: new.project_id,
            creator_id: new.creator_id,
            assignee_id: new.assignee_id,
            created_at: now,
            updated_at: now,
        };
        tables.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn tasks(&self, project_id: Id) -> StoreResult<Vec<Task>> {
        let tables = self.inner.read().await;
        let mut tasks: Vec<Task> = tables
            .tasks
            .values()
            .filter(|t| t.project_id == project_id)
            .cloned()
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(tasks)
    }

    async fn task(&self, project_id: Id, task_id: Id) -> StoreResult<Option<Task>> {
        let tables = self.inner.read().await;
        Ok(tables
            .tasks
            .get(&task_id)
            .filter(|t| t.project_id == project_id)
            .cloned())
    }

    async fn update_task(
        &self,
        project_id: Id,
        task_id: Id,
        changes: TaskChanges,
    ) -> StoreResult<Option<Task>> {
        let mut tables = self.inner.write().await;
        let Some(task) = tables
            .tasks
            .get_mut(&task_id)
            .filter(|t| t.project_id == project_id)
        else {
            return Ok(None);
        };

        if let Some(title) = changes.title {
            task.title = title;
        }
        if let Some(description) = changes.description {
            task.description = Some(description);
        }
        if let Some(status) = changes.status {
            task.status = status;
        }
        if let Some(complexity) = changes.complexity {
            task.complexity = complexity;
        }
        if let Some(assignee_id) = changes.assignee_id {
            task.assignee_id = assignee_id;
        }
        task.updated_at = Utc::now();
        Ok(Some(task.clone()))
    }

    async fn delete_task(&self, project_id: Id, task_id: Id) -> StoreResult<bool> {
        let mut tables = self.inner.write().await;
        let in_project = tables
            .tasks
            .get(&task_id)
            .is_some_and(|t| t.project_id == project_id);
        if in_project {
            tables.tasks.remove(&task_id);
        }
        Ok(in_project)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{TaskComplexity, TaskStatus};

    fn new_task(project_id: Id, creator_id: Id, assignee_id: Option<Id>) -> NewTask {
        NewTask {
            title: "write docs".to_string(),
            description: None,
            status: TaskStatus::Todo,
            complexity: TaskComplexity::Low,
            project_id,
            creator_id,
            assignee_id,
        }
    }

    #[tokio::test]
    async fn usernames_are_unique() {
        let store = MemoryStore::new();
        store.create_user("alice", "hash").await.unwrap();

        let err = store.create_user("alice", "other").await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn search_is_case_insensitive_and_limited() {
        let store = MemoryStore::new();
        for name in ["Alice", "alicia", "bob", "MALICE"] {
            store.create_user(name, "hash").await.unwrap();
        }

        let found = store.search_users("ALI", 10).await.unwrap();
        let names: Vec<_> = found.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["Alice", "alicia", "MALICE"]);

        assert_eq!(store.search_users("ali", 2).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn removing_member_clears_their_assignments() {
        let store = MemoryStore::new();
        let owner = store.create_user("owner", "hash").await.unwrap();
        let member = store.create_user("member", "hash").await.unwrap();
        let project = store.create_project(owner.id, "p", None).await.unwrap();
        store.add_member(project.id, member.id).await.unwrap();

        let assigned = store
            .create_task(new_task(project.id, owner.id, Some(member.id)))
            .await
            .unwrap();
        let owners = store
            .create_task(new_task(project.id, owner.id, Some(owner.id)))
            .await
            .unwrap();

        assert!(store.remove_member(project.id, member.id).await.unwrap());
        assert!(!store.remove_member(project.id, member.id).await.unwrap());

        let assigned = store.task(project.id, assigned.id).await.unwrap().unwrap();
        let owners = store.task(project.id, owners.id).await.unwrap().unwrap();
        assert_eq!(assigned.assignee_id, None);
        assert_eq!(owners.assignee_id, Some(owner.id));
    }

    #[tokio::test]
    async fn deleting_project_cascades() {
        let store = MemoryStore::new();
        let owner = store.create_user("owner", "hash").await.unwrap();
        let member = store.create_user("member", "hash").await.unwrap();
        let project = store.create_project(owner.id, "p", None).await.unwrap();
        store.add_member(project.id, member.id).await.unwrap();
        let task = store
            .create_task(new_task(project.id, owner.id, None))
            .await
            .unwrap();

        assert!(store.delete_project(project.id).await.unwrap());

        assert!(store.project(project.id).await.unwrap().is_none());
        assert!(store.members(project.id).await.unwrap().is_empty());
        assert!(store.task(project.id, task.id).await.unwrap().is_none());
        assert!(store.projects_for_user(member.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn tasks_are_scoped_to_their_project() {
        let store = MemoryStore::new();
        let owner = store.create_user("owner", "hash").await.unwrap();
        let first = store.create_project(owner.id, "first", None).await.unwrap();
        let second = store.create_project(owner.id, "second", None).await.unwrap();
        let task = store
            .create_task(new_task(first.id, owner.id, None))
            .await
            .unwrap();

        assert!(store.task(second.id, task.id).await.unwrap().is_none());
        assert!(!store.delete_task(second.id, task.id).await.unwrap());
        assert!(store
            .update_task(second.id, task.id, TaskChanges::default())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn assignee_update_is_tri_state() {
        let store = MemoryStore::new();
        let owner = store.create_user("owner", "hash").await.unwrap();
        let project = store.create_project(owner.id, "p", None).await.unwrap();
        let task = store
            .create_task(new_task(project.id, owner.id, Some(owner.id)))
            .await
            .unwrap();

        let untouched = store
            .update_task(
                project.id,
                task.id,
                TaskChanges {
                    status: Some(TaskStatus::Done),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(untouched.assignee_id, Some(owner.id));
        assert_eq!(untouched.status, TaskStatus::Done);

        let cleared = store
            .update_task(
                project.id,
                task.id,
                TaskChanges {
                    assignee_id: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cleared.assignee_id, None);
    }
}
