
use reqwest::StatusCode;
use serde_json::Value;
use testapp::TestApp;

async fn usernames(response: reqwest::Response) -> Vec<String> {
    let users: Vec<Value> = response.json().await.unwrap();
    users
        .iter()
        .map(|user| user["username"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn search_finds_matching_users() {
    let app = TestApp::spawn().await;
    let caller = app.create_user("testuser").await;
    app.create_user("searchme").await;

    let response = app.get("/api/users/search?q=search", Some(&caller.token)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(usernames(response).await, vec!["searchme"]);
}

#[tokio::test]
async fn search_matches_fragments() {
    let app = TestApp::spawn().await;
    let caller = app.create_user("testuser").await;
    app.create_user("alice_dev").await;
    app.create_user("bob_dev").await;
    app.create_user("carol").await;

    let response = app.get("/api/users/search?q=_dev", Some(&caller.token)).await;

    let mut found = usernames(response).await;
    found.sort();
    assert_eq!(found, vec!["alice_dev", "bob_dev"]);
}

#[tokio::test]
async fn search_ignores_case() {
    let app = TestApp::spawn().await;
    let caller = app.create_user("testuser").await;
    app.create_user("MixedCase").await;

    let response = app.get("/api/users/search?q=mixedcase", Some(&caller.token)).await;

    assert_eq!(usernames(response).await, vec!["MixedCase"]);
}

#[tokio::test]
async fn search_without_matches_is_empty() {
    let app = TestApp::spawn().await;
    let caller = app.create_user("testuser").await;

    let response = app.get("/api/users/search?q=nobody", Some(&caller.token)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(usernames(response).await.is_empty());
}

#[tokio::test]
async fn search_returns_at_most_ten_users() {
    let app = TestApp::spawn().await;
    let caller = app.create_user("testuser").await;
    for i in 0..12 {
        app.register(&format!("member{i:02}"), testapp::PASSWORD).await;
    }

    let response = app.get("/api/users/search?q=member", Some(&caller.token)).await;

    assert_eq!(usernames(response).await.len(), 10);
}

#[tokio::test]
async fn search_requires_query() {
    let app = TestApp::spawn().await;
    let caller = app.create_user("testuser").await;

    for path in ["/api/users/search", "/api/users/search?q="] {
        let response = app.get(path, Some(&caller.token)).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY, "{path}");
    }
}

#[tokio::test]
async fn search_requires_authentication() {
    let app = TestApp::spawn().await;

    let response = app.get("/api/users/search?q=test", None).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
