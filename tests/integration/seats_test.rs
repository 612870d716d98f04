//! Integration tests for the seat map endpoint.

mod helpers;

use http::StatusCode;
use serde_json::json;

use showtime_core::types::OwnerId;

#[tokio::test]
async fn test_seat_map_of_fresh_event() {
    let app = helpers::TestApp::new().await;

    let response = app
        .request("GET", &format!("/api/events/{}/seats", app.event_id), None, None)
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let data = &response.body["data"];
    assert_eq!(data["rows"], 6);
    assert_eq!(data["cols"], 10);
    assert_eq!(data["available"], 60);
    assert_eq!(data["committed_seats"], json!([]));
    assert_eq!(data["locks"], json!({}));
}

#[tokio::test]
async fn test_seat_map_shows_commits_and_locks() {
    let app = helpers::TestApp::new().await;
    app.book("alice", &["A1", "A2"]).await;

    let sessions = &app.realtime.sessions;
    let (conn, _rx) = sessions.connect(OwnerId::parse("bob")).await;
    sessions
        .handle_inbound(
            conn.id,
            &json!({ "type": "subscribe", "event_id": app.event_id }).to_string(),
        )
        .await;
    sessions
        .handle_inbound(
            conn.id,
            &json!({ "type": "acquire_lock", "event_id": app.event_id, "seat_id": "b7" }).to_string(),
        )
        .await;

    let response = app
        .request("GET", &format!("/api/events/{}/seats", app.event_id), None, None)
        .await;

    let data = &response.body["data"];
    assert_eq!(data["committed_seats"], json!(["A1", "A2"]));
    assert_eq!(data["locks"]["B7"]["owner_id"], "bob");
    assert_eq!(data["available"], 57);
}

#[tokio::test]
async fn test_unknown_event_is_not_found() {
    let app = helpers::TestApp::new().await;

    let response = app
        .request("GET", &format!("/api/events/{}/seats", uuid::Uuid::new_v4()), None, None)
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "NOT_FOUND");
}
