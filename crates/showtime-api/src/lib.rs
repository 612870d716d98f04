//! # showtime-api
//!
//! HTTP API layer for Showtime built on Axum.
//!
//! Provides the seat map and booking endpoints, health checks, the
//! WebSocket upgrade into the realtime engine, middleware (CORS, request
//! logging, compression), extractors, DTOs, and error mapping.

pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::{build_app, run_server};
pub use state::AppState;
