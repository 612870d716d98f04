//! Event seat map handler.

use axum::Json;
use axum::extract::{Path, State};

use showtime_core::types::EventId;

use crate::dto::response::{ApiResponse, SeatMapResponse};
use crate::error::ApiResult;
use crate::state::AppState;

/// GET /api/events/{id}/seats
///
/// Reads the event from the store, refreshing the lock table's committed
/// mirror, and combines it with the live locks.
pub async fn get_seats(
    State(state): State<AppState>,
    Path(event_id): Path<EventId>,
) -> ApiResult<Json<ApiResponse<SeatMapResponse>>> {
    let event = state.bookings().get_event(event_id).await?;
    state.realtime.locks.load_event(&event).await;
    let snapshot = state.realtime.locks.snapshot(event_id).await?;

    Ok(Json(ApiResponse::ok(SeatMapResponse::new(&event, snapshot))))
}
