//! Handler for short URL redirect.

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect},
};

use crate::error::AppError;
use crate::state::AppState;

/// Resolves a short code and redirects to its target.
///
/// # Endpoint
///
/// `GET /go/{code}`
///
/// Every call counts as an invocation, successful or not. A one-shot link
/// is retired by its first successful resolution.
///
/// # Errors
///
/// - 404 Not Found if the code was never issued
/// - 400 Bad Request if the link has expired
/// - 429 Too Many Requests if a one-shot link was already used
pub async fn redirect_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let target = state.entry_service.resolve(&code).await?;

    Ok(Redirect::temporary(&target))
}
