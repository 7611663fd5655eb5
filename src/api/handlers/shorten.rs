//! Handler for link shortening endpoint.

use axum::{Json, extract::State};
use validator::Validate;

use crate::api::dto::shorten::{ShortenRequest, ShortenResponse};
use crate::error::AppError;
use crate::state::AppState;

/// Creates a short link for one URL.
///
/// # Endpoint
///
/// `POST /shorten`
///
/// # Request Body
///
/// ```json
/// {
///   "url": "https://example.com/page",
///   "one_shot": false,
///   "ttl_seconds": 3600
/// }
/// ```
///
/// # Response
///
/// ```json
/// {
///   "short_url": "http://localhost:3000/go/q1w2e3r4t5y6",
///   "code": "q1w2e3r4t5y6",
///   "target_url": "https://example.com/page",
///   "domain": "example.com",
///   "one_shot": false,
///   "expires_at": "2026-01-01T12:00:00Z"
/// }
/// ```
///
/// Plain-HTTP targets are accepted and carry a `warning` field.
///
/// # Errors
///
/// Returns 400 Bad Request if validation fails or the URL is not absolute.
/// Returns 500 Internal Server Error if the entry could not be stored. A
/// failure to schedule its expiration is logged, not returned.
pub async fn shorten_handler(
    State(state): State<AppState>,
    Json(payload): Json<ShortenRequest>,
) -> Result<Json<ShortenResponse>, AppError> {
    payload.validate()?;

    let link = state
        .entry_service
        .create(&payload.url, payload.one_shot, payload.ttl_seconds)
        .await?;

    Ok(Json(link.into()))
}
