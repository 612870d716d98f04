//! Integration tests for health endpoints.

mod helpers;

use http::StatusCode;

#[tokio::test]
async fn test_health() {
    let app = helpers::TestApp::new().await;

    let response = app.request("GET", "/api/health", None, None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["success"], true);
    assert_eq!(response.body["data"]["status"], "ok");
}

#[tokio::test]
async fn test_detailed_health_reports_engine_state() {
    let app = helpers::TestApp::new().await;
    app.book("alice", &["F1"]).await;

    let response = app.request("GET", "/api/health/detailed", None, None).await;

    assert_eq!(response.status, StatusCode::OK);
    let data = &response.body["data"];
    assert_eq!(data["store"], "connected");
    assert_eq!(data["ws_connections"], 0);
    assert_eq!(data["metrics"]["commits_succeeded"], 1);
}
