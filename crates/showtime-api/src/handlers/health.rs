//! Health check handlers.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use crate::dto::response::{ApiResponse, DetailedHealthResponse, HealthResponse};
use crate::state::AppState;

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::ok(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    }))
}

/// GET /api/health/detailed
///
/// Answers 503 when the seat store is unreachable.
pub async fn health_detailed(
    State(state): State<AppState>,
) -> (StatusCode, Json<ApiResponse<DetailedHealthResponse>>) {
    let store_ok = match state.store.health_check().await {
        Ok(ok) => ok,
        Err(e) => {
            tracing::warn!(error = %e, "Seat store health check failed");
            false
        }
    };
    let stats = state.realtime.stats();

    let status = if store_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let body = DetailedHealthResponse {
        status: if store_ok { "ok" } else { "degraded" }.to_string(),
        store: if store_ok { "connected" } else { "unavailable" }.to_string(),
        ws_connections: stats.connections,
        online_owners: stats.owners,
        loaded_events: stats.loaded_events,
        metrics: stats.metrics,
    };

    (status, Json(ApiResponse::ok(body)))
}
