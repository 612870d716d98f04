//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use chrono::Utc;
use http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use showtime_api::{AppState, build_app};
use showtime_core::config::AppConfig;
use showtime_core::models::{EventRecord, Pricing};
use showtime_core::traits::clock::SystemClock;
use showtime_core::types::{EventId, SeatLayout};
use showtime_database::MemorySeatStore;
use showtime_realtime::RealtimeEngine;

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Engine behind the router, for driving WebSocket sessions directly
    pub realtime: Arc<RealtimeEngine>,
    /// Seeded event
    pub event_id: EventId,
}

impl TestApp {
    /// Create a test application over an in-memory store holding one
    /// 6x10 event priced 1000 per seat, 1500 in row A.
    pub async fn new() -> Self {
        let config = AppConfig::default();
        let store = MemorySeatStore::new();

        let event = EventRecord {
            id: EventId::new(),
            title: "Integration Premiere".to_string(),
            starts_at: Utc::now(),
            layout: SeatLayout::new(6, 10).expect("valid layout"),
            pricing: Pricing {
                price: 1000,
                tiers: BTreeMap::from([("A".to_string(), 1500)]),
            },
            committed_seats: BTreeSet::new(),
        };
        let event_id = event.id;
        store.insert_event(event).await;

        let store = Arc::new(store);
        let realtime = Arc::new(RealtimeEngine::new(
            &config.realtime,
            &config.booking,
            store.clone(),
            Arc::new(SystemClock),
        ));
        let state = AppState::new(config, store, realtime.clone());

        Self {
            router: build_app(state),
            realtime,
            event_id,
        }
    }

    /// Make an HTTP request to the test app
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        owner: Option<&str>,
    ) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let mut req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json");

        if let Some(owner) = owner {
            req = req.header("X-Owner-Id", owner);
        }

        let req = req
            .body(Body::from(body_str))
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read body")
            .to_bytes();

        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }

    /// Book seats as `owner`.
    pub async fn book(&self, owner: &str, seats: &[&str]) -> TestResponse {
        self.request(
            "POST",
            "/api/bookings",
            Some(serde_json::json!({ "event_id": self.event_id, "seats": seats })),
            Some(owner),
        )
        .await
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Parsed JSON body
    pub body: Value,
}
