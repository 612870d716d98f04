//! Booking handlers.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use showtime_core::types::BookingId;
use showtime_service::CommitResult;

use crate::dto::request::{CreateBookingRequest, validate_body};
use crate::dto::response::BookingResponse;
use crate::error::{ApiErrorResponse, ApiResult};
use crate::extractors::Owner;
use crate::state::AppState;

/// POST /api/bookings
///
/// `201` with the booking, or `409` naming the seats that were already
/// booked.
pub async fn create_booking(
    State(state): State<AppState>,
    owner: Owner,
    Json(req): Json<CreateBookingRequest>,
) -> ApiResult<Response> {
    validate_body(&req)?;

    let response = match state
        .bookings()
        .commit(req.event_id, &owner, &req.seats)
        .await?
    {
        CommitResult::Booked(receipt) => {
            (StatusCode::CREATED, Json(BookingResponse::from(receipt))).into_response()
        }
        CommitResult::Conflict { conflicting_seats } => {
            let body = ApiErrorResponse {
                error: "CONFLICT".to_string(),
                message: "Some seats already booked".to_string(),
                clashes: Some(conflicting_seats.into_iter().map(String::from).collect()),
            };
            (StatusCode::CONFLICT, Json(body)).into_response()
        }
    };
    Ok(response)
}

/// GET /api/bookings/mine
pub async fn my_bookings(
    State(state): State<AppState>,
    owner: Owner,
) -> ApiResult<Json<Vec<BookingResponse>>> {
    let bookings = state.bookings().bookings_for_owner(&owner).await?;
    Ok(Json(bookings.into_iter().map(BookingResponse::from).collect()))
}

/// GET /api/bookings/{id}
pub async fn get_booking(
    State(state): State<AppState>,
    owner: Owner,
    Path(booking_id): Path<BookingId>,
) -> ApiResult<Json<BookingResponse>> {
    let booking = state.bookings().get_booking(&owner, booking_id).await?;
    Ok(Json(BookingResponse::from(booking)))
}
