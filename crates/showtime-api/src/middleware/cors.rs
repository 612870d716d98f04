//! CORS for browser clients of the booking API.

use std::str::FromStr;
use std::time::Duration;

use axum::http::{HeaderName, Method, header};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;

use showtime_core::config::CorsConfig;

use crate::extractors::owner::OWNER_HEADER;

/// Builds the CORS layer. Browsers may send the JSON content type and the
/// owner header; entries that do not parse are logged and skipped.
pub fn build_cors_layer(config: &CorsConfig) -> CorsLayer {
    let origin = if config.allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(parse_entries(&config.allowed_origins, "origin"))
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(parse_entries::<Method>(&config.allowed_methods, "method"))
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(OWNER_HEADER)])
        .max_age(Duration::from_secs(config.max_age_seconds))
}

fn parse_entries<T: FromStr>(raw: &[String], what: &str) -> Vec<T> {
    raw.iter()
        .filter_map(|entry| {
            let parsed = entry.trim().parse().ok();
            if parsed.is_none() {
                warn!(entry = %entry, what, "Ignoring invalid CORS entry");
            }
            parsed
        })
        .collect()
}
