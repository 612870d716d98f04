//! `Owner` extractor: the caller identity from the `X-Owner-Id` header.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use showtime_core::error::AppError;
use showtime_core::types::OwnerId;

use crate::error::ApiError;

/// Header carrying the caller's owner id. The value is trusted as supplied.
pub const OWNER_HEADER: &str = "x-owner-id";

/// The identified caller.
#[derive(Debug, Clone)]
pub struct Owner(pub OwnerId);

impl std::ops::Deref for Owner {
    type Target = OwnerId;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Owner {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(OWNER_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(OwnerId::parse)
            .map(Owner)
            .ok_or_else(|| AppError::validation("Missing X-Owner-Id header").into())
    }
}
