//! Integration tests for booking commits over HTTP.

mod helpers;

use http::StatusCode;
use serde_json::json;

use showtime_core::types::{OwnerId, SeatId};
use showtime_realtime::message::OutboundMessage;

#[tokio::test]
async fn test_book_seats_prices_and_normalizes() {
    let app = helpers::TestApp::new().await;

    let response = app.book("alice", &[" a1", "B2", "b2", ""]).await;

    assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
    assert_eq!(response.body["amount"], 2500);
    assert_eq!(response.body["seats"], json!(["A1", "B2"]));
    assert!(response.body["booking_id"].is_string());
}

#[tokio::test]
async fn test_overlapping_booking_conflicts() {
    let app = helpers::TestApp::new().await;
    assert_eq!(app.book("alice", &["C1", "C2"]).await.status, StatusCode::CREATED);

    let response = app.book("bob", &["C3", "C2"]).await;

    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["error"], "CONFLICT");
    assert_eq!(response.body["message"], "Some seats already booked");
    assert_eq!(response.body["clashes"], json!(["C2"]));

    // The loser's free seat stays bookable.
    assert_eq!(app.book("bob", &["C3"]).await.status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_invalid_requests_are_rejected() {
    let app = helpers::TestApp::new().await;

    let missing_owner = app
        .request(
            "POST",
            "/api/bookings",
            Some(json!({ "event_id": app.event_id, "seats": ["A1"] })),
            None,
        )
        .await;
    assert_eq!(missing_owner.status, StatusCode::BAD_REQUEST);

    let empty = app.book("alice", &[]).await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);

    let blank = app.book("alice", &["  "]).await;
    assert_eq!(blank.status, StatusCode::BAD_REQUEST);
    assert_eq!(blank.body["message"], "No valid seats provided");

    let outside = app.book("alice", &["Z99"]).await;
    assert_eq!(outside.status, StatusCode::BAD_REQUEST);

    let unknown_event = app
        .request(
            "POST",
            "/api/bookings",
            Some(json!({ "event_id": uuid::Uuid::new_v4(), "seats": ["A1"] })),
            Some("alice"),
        )
        .await;
    assert_eq!(unknown_event.status, StatusCode::NOT_FOUND);
    assert_eq!(unknown_event.body["error"], "NOT_FOUND");
}

#[tokio::test]
async fn test_my_bookings_are_scoped_to_owner() {
    let app = helpers::TestApp::new().await;
    let first = app.book("alice", &["D1"]).await;
    app.book("alice", &["D2"]).await;
    app.book("bob", &["D3"]).await;

    let mine = app.request("GET", "/api/bookings/mine", None, Some("alice")).await;
    assert_eq!(mine.status, StatusCode::OK);
    let bookings = mine.body.as_array().expect("array body");
    assert_eq!(bookings.len(), 2);
    assert_eq!(bookings[0]["seats"], json!(["D2"]));

    let id = first.body["booking_id"].as_str().unwrap();
    let own = app
        .request("GET", &format!("/api/bookings/{id}"), None, Some("alice"))
        .await;
    assert_eq!(own.status, StatusCode::OK);

    let foreign = app
        .request("GET", &format!("/api/bookings/{id}"), None, Some("bob"))
        .await;
    assert_eq!(foreign.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_http_commit_reaches_websocket_viewers() {
    let app = helpers::TestApp::new().await;
    let sessions = &app.realtime.sessions;

    let (viewer, mut rx) = sessions.connect(OwnerId::parse("viewer")).await;
    let (holder, _holder_rx) = sessions.connect(OwnerId::parse("holder")).await;
    for conn in [&viewer, &holder] {
        sessions
            .handle_inbound(
                conn.id,
                &json!({ "type": "subscribe", "event_id": app.event_id }).to_string(),
            )
            .await;
    }
    sessions
        .handle_inbound(
            holder.id,
            &json!({ "type": "acquire_lock", "event_id": app.event_id, "seat_id": "E5" }).to_string(),
        )
        .await;
    while rx.try_recv().is_ok() {}

    assert_eq!(app.book("buyer", &["E5"]).await.status, StatusCode::CREATED);

    let seat = SeatId::parse("E5").unwrap();
    let committed = rx.try_recv().expect("committed seats broadcast");
    assert!(matches!(
        &*committed,
        OutboundMessage::CommittedSeatsChanged { committed_seats, .. } if committed_seats == &vec![seat.clone()]
    ));
    let locks = rx.try_recv().expect("locks broadcast");
    assert!(matches!(&*locks, OutboundMessage::LocksChanged { locks, .. } if locks.is_empty()));
}
