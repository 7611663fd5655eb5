//! Handlers for activation statistics.

use axum::{
    Json,
    extract::{Path, State},
};

use crate::api::dto::stats::StatsResponse;
use crate::error::AppError;
use crate::state::AppState;

/// Returns activation counters across all domains.
///
/// # Endpoint
///
/// `GET /statistics`
///
/// # Response
///
/// ```json
/// { "total_activations": 42, "active_count": 7 }
/// ```
pub async fn global_stats_handler(
    State(state): State<AppState>,
) -> Result<Json<StatsResponse>, AppError> {
    let counters = state.stats_service.global().await?;
    Ok(Json(counters.into()))
}

/// Returns activation counters for one source domain.
///
/// # Endpoint
///
/// `GET /statistics/{domain}`
///
/// The domain is matched case-insensitively; a domain that never had a
/// link answers with zeros rather than 404.
pub async fn domain_stats_handler(
    Path(domain): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<StatsResponse>, AppError> {
    let counters = state.stats_service.domain(&domain).await?;
    Ok(Json(counters.into()))
}
