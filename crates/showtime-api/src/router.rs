//! Route definitions for the Showtime HTTP API.
//!
//! REST routes are mounted under `/api`; the WebSocket upgrade lives at
//! `/ws`.

use axum::Router;
use axum::middleware as axum_middleware;
use axum::routing::{get, post};

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Build the router with every route and the request logger.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(event_routes())
        .merge(booking_routes())
        .merge(health_routes());

    Router::new()
        .nest("/api", api_routes)
        .route("/ws", get(handlers::ws::ws_upgrade))
        .layer(axum_middleware::from_fn(middleware::logging::request_logging))
        .with_state(state)
}

/// Seat maps
fn event_routes() -> Router<AppState> {
    Router::new().route("/events/{id}/seats", get(handlers::event::get_seats))
}

/// Booking commit and lookup
fn booking_routes() -> Router<AppState> {
    Router::new()
        .route("/bookings", post(handlers::booking::create_booking))
        .route("/bookings/mine", get(handlers::booking::my_bookings))
        .route("/bookings/{id}", get(handlers::booking::get_booking))
}

/// Health checks
fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/health/detailed", get(handlers::health::health_detailed))
}
