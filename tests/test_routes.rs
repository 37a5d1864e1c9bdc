
use reqwest::StatusCode;
use serde_json::{json, Value};
use testapp::TestApp;

#[tokio::test]
async fn health_check_works() {
    let app = TestApp::spawn().await;

    let response = app.get("/healthcheck", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("application/json"));
    assert_eq!(response.text().await.unwrap(), r#"{"status":"ok"}"#);
}

#[tokio::test]
async fn health_check_ignores_headers_and_query() {
    let app = TestApp::spawn().await;

    let plain = app.get("/healthcheck", None).await.bytes().await.unwrap();
    let decorated = app
        .client
        .get(app.url("/healthcheck?verbose=true&probe=1"))
        .header("X-Probe", "kubelet")
        .bearer_auth("not-a-token")
        .send()
        .await
        .expect("Failed to send request.");

    assert_eq!(decorated.status(), StatusCode::OK);
    assert_eq!(decorated.bytes().await.unwrap(), plain);
}

#[tokio::test]
async fn health_check_is_idempotent() {
    let app = TestApp::spawn().await;

    let mut bodies = Vec::new();
    for _ in 0..5 {
        let response = app.get("/healthcheck", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        bodies.push(response.bytes().await.unwrap());
    }

    assert!(bodies.windows(2).all(|pair| pair[0] == pair[1]));
}

#[tokio::test]
async fn health_check_survives_concurrent_callers() {
    let app = TestApp::spawn().await;

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let client = app.client.clone();
            let url = app.url("/healthcheck");
            tokio::spawn(async move { client.get(url).send().await })
        })
        .collect();

    for handle in handles {
        let response = handle.await.unwrap().expect("Failed to send request.");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.json::<Value>().await.unwrap(),
            json!({ "status": "ok" })
        );
    }
}

#[tokio::test]
async fn root_points_to_docs() {
    let app = TestApp::spawn().await;

    let response = app.get("/", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.json::<Value>().await.unwrap(),
        json!({ "message": "TaskFlow API", "docs": "/docs" })
    );
}

#[tokio::test]
async fn openapi_schema_describes_healthcheck() {
    let app = TestApp::spawn().await;

    let response = app.get("/openapi.json", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let schema: Value = response.json().await.unwrap();
    assert!(schema["openapi"].as_str().unwrap().starts_with("3."));
    assert_eq!(schema["info"]["title"], "TaskFlow API");
    assert!(schema["paths"]["/healthcheck"]["get"].is_object());
    assert!(schema["paths"]["/api/projects/{project_id}/tasks"]["post"].is_object());
}

fn is_html(response: &reqwest::Response) -> bool {
    response.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/html")
}

#[tokio::test]
async fn swagger_ui_points_at_schema() {
    let app = TestApp::spawn().await;

    let response = app.get("/docs", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(is_html(&response));
    assert!(response.text().await.unwrap().contains("swagger-ui"));

    let response = app.get("/docs/swagger-initializer.js", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.text().await.unwrap().contains("/openapi.json"));
}

#[tokio::test]
async fn redoc_embeds_schema() {
    let app = TestApp::spawn().await;

    let response = app.get("/redoc", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(is_html(&response));
    let page = response.text().await.unwrap();
    assert!(page.contains("TaskFlow API"));
    assert!(page.contains("/healthcheck"));
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let app = TestApp::spawn().await;

    let response = app.get("/nonexistent", None).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(testapp::detail(response).await, "Not Found");
}

#[tokio::test]
async fn wrong_method_is_rejected() {
    let app = TestApp::spawn().await;

    let response = app.post_json("/healthcheck", None, &json!({})).await;

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert!(response.headers()["allow"].to_str().unwrap().contains("GET"));
    assert_eq!(testapp::detail(response).await, "Method Not Allowed");
}

#[tokio::test]
async fn cors_preflight_is_answered() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .request(reqwest::Method::OPTIONS, app.url("/api/projects"))
        .header("Origin", "http://localhost:3000")
        .header("Access-Control-Request-Method", "POST")
        .send()
        .await
        .expect("Failed to send request.");

    assert!(response.status().is_success());
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "http://localhost:3000"
    );
}
