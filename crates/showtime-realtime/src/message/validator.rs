//! Message validation rules.

use showtime_core::error::AppError;

/// Maximum allowed message size in bytes.
pub const MAX_MESSAGE_SIZE: usize = 16_384;

/// Maximum seats accepted in one commit request.
pub const MAX_SEATS_PER_COMMIT: usize = 64;

/// Validates a raw inbound frame before parsing.
pub fn validate_inbound(raw: &str) -> Result<(), AppError> {
    if raw.len() > MAX_MESSAGE_SIZE {
        return Err(AppError::validation(format!(
            "Message exceeds maximum size of {MAX_MESSAGE_SIZE} bytes"
        )));
    }

    if raw.trim().is_empty() {
        return Err(AppError::validation("Empty message"));
    }

    Ok(())
}

/// Validates the size of a commit request.
pub fn validate_commit_size(seats: &[String]) -> Result<(), AppError> {
    if seats.len() > MAX_SEATS_PER_COMMIT {
        return Err(AppError::validation(format!(
            "At most {MAX_SEATS_PER_COMMIT} seats can be booked at once"
        )));
    }
    Ok(())
}
