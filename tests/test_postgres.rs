//! Runs against a live Postgres server, see `testdatabase.rs`.
//! Start one with `docker run -e POSTGRES_PASSWORD=password -p 5432:5432 postgres`
//! and run `cargo test -- --ignored`.


use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::{json, Value};
use taskflow::{
    auth::TokenKeys,
    model::{NewTask, ProjectChanges, TaskChanges, TaskComplexity, TaskStatus},
    store::{PgStore, Repository, StoreError},
    AppState,
};
use testapp::TestApp;
use testdatabase::TestDatabase;

fn new_task(project_id: i64, creator_id: i64, assignee_id: Option<i64>) -> NewTask {
    NewTask {
        title: "Write migrations".to_string(),
        description: None,
        status: TaskStatus::Todo,
        complexity: TaskComplexity::High,
        project_id,
        creator_id,
        assignee_id,
    }
}

#[tokio::test]
#[ignore = "needs a Postgres server"]
async fn usernames_are_unique() {
    let db = TestDatabase::from_env().await;
    let store = PgStore::new(db.connection_pool());

    store.create_user("alice", "hash").await.unwrap();
    let duplicate = store.create_user("alice", "other").await;

    assert!(matches!(duplicate, Err(StoreError::Conflict(_))));
}

#[tokio::test]
#[ignore = "needs a Postgres server"]
async fn search_escapes_like_wildcards() {
    let db = TestDatabase::from_env().await;
    let store = PgStore::new(db.connection_pool());
    store.create_user("under_score", "hash").await.unwrap();
    store.create_user("underXscore", "hash").await.unwrap();
    store.create_user("UNDERLINE", "hash").await.unwrap();

    let found = store.search_users("r_s", 10).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].username, "under_score");

    let found = store.search_users("under", 2).await.unwrap();
    assert_eq!(found.len(), 2);
}

#[tokio::test]
#[ignore = "needs a Postgres server"]
async fn project_updates_keep_omitted_fields() {
    let db = TestDatabase::from_env().await;
    let store = PgStore::new(db.connection_pool());
    let owner = store.create_user("owner", "hash").await.unwrap();
    let project = store
        .create_project(owner.id, "Roadmap", Some("Q3"))
        .await
        .unwrap();

    let updated = store
        .update_project(
            project.id,
            ProjectChanges {
                name: Some("Roadmap 2".to_string()),
                description: None,
            },
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(updated.name, "Roadmap 2");
    assert_eq!(updated.description.as_deref(), Some("Q3"));
    assert!(updated.updated_at >= project.updated_at);
}

#[tokio::test]
#[ignore = "needs a Postgres server"]
async fn removing_member_clears_assignments() {
    let db = TestDatabase::from_env().await;
    let store = PgStore::new(db.connection_pool());
    let owner = store.create_user("owner", "hash").await.unwrap();
    let member = store.create_user("member", "hash").await.unwrap();
    let project = store.create_project(owner.id, "Roadmap", None).await.unwrap();
    store.add_member(project.id, member.id).await.unwrap();
    let task = store
        .create_task(new_task(project.id, owner.id, Some(member.id)))
        .await
        .unwrap();

    assert!(store.remove_member(project.id, member.id).await.unwrap());
    assert!(!store.remove_member(project.id, member.id).await.unwrap());

    let task = store.task(project.id, task.id).await.unwrap().unwrap();
    assert_eq!(task.assignee_id, None);
    assert!(store.members(project.id).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore = "needs a Postgres server"]
async fn task_assignee_can_be_kept_or_cleared() {
    let db = TestDatabase::from_env().await;
    let store = PgStore::new(db.connection_pool());
    let owner = store.create_user("owner", "hash").await.unwrap();
    let project = store.create_project(owner.id, "Roadmap", None).await.unwrap();
    let task = store
        .create_task(new_task(project.id, owner.id, Some(owner.id)))
        .await
        .unwrap();

    let kept = store
        .update_task(
            project.id,
            task.id,
            TaskChanges {
                status: Some(TaskStatus::Review),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(kept.status, TaskStatus::Review);
    assert_eq!(kept.assignee_id, Some(owner.id));

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
    assert_eq!(cleared.complexity, TaskComplexity::High);
}

#[tokio::test]
#[ignore = "needs a Postgres server"]
async fn deleting_project_cascades() {
    let db = TestDatabase::from_env().await;
    let store = PgStore::new(db.connection_pool());
    let owner = store.create_user("owner", "hash").await.unwrap();
    let member = store.create_user("member", "hash").await.unwrap();
    let project = store.create_project(owner.id, "Roadmap", None).await.unwrap();
    store.add_member(project.id, member.id).await.unwrap();
    store
        .create_task(new_task(project.id, owner.id, None))
        .await
        .unwrap();

    assert!(store.delete_project(project.id).await.unwrap());

    assert!(store.project(project.id).await.unwrap().is_none());
    assert!(store.tasks(project.id).await.unwrap().is_empty());
    assert!(store.projects_for_user(member.id).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore = "needs a Postgres server"]
async fn api_works_on_postgres() {
    let db = TestDatabase::from_env().await;
    let store: Arc<dyn Repository> = Arc::new(PgStore::new(db.connection_pool()));
    let tokens = TokenKeys::new("test-secret", chrono::Duration::minutes(30));
    let app = TestApp::spawn_with_state(AppState::new(store, tokens)).await;

    let owner = app.create_user("owner").await;
    let member = app.create_user("member").await;
    let project_id = app.create_project(&owner, "Test Project").await;
    app.add_member(&owner, project_id, member.id).await;
    let task = app
        .create_task(
            &member,
            project_id,
            json!({ "title": "Ship it", "assignee_id": owner.id }),
        )
        .await;
    assert_eq!(task["assignee"]["username"], "owner");

    let response = app
        .get(&format!("/api/projects/{project_id}"), Some(&member.token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let project: Value = response.json().await.unwrap();
    assert_eq!(project["members"][0]["user"]["id"], member.id);

    let response = app.get("/healthcheck", None).await;
    assert_eq!(response.text().await.unwrap(), r#"{"status":"ok"}"#);
}
