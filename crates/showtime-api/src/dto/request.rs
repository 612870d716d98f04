//! Request DTOs with validation.

use serde::{Deserialize, Serialize};
use validator::Validate;

use showtime_core::error::AppError;
use showtime_core::types::EventId;

/// Book seats body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateBookingRequest {
    /// Event to book.
    pub event_id: EventId,
    /// Raw seat ids; normalized by the booking service.
    #[validate(length(min = 1, max = 64, message = "Between 1 and 64 seats must be requested"))]
    pub seats: Vec<String>,
}

/// Runs derive-based validation, mapping failures to a validation error.
pub fn validate_body<T: Validate>(body: &T) -> Result<(), AppError> {
    body.validate()
        .map_err(|e| AppError::validation(format!("Invalid request: {e}")))
}
