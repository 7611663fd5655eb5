//! Handler for health check endpoint.

use axum::{Json, extract::State, http::StatusCode};

use crate::api::dto::health::{CheckStatus, HealthChecks, HealthResponse};
use crate::state::AppState;

/// Returns service health status with component checks.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response Codes
///
/// - **200 OK**: All components healthy
/// - **503 Service Unavailable**: One or more components degraded
///
/// # Components Checked
///
/// 1. **Storage**: Counts active entries through the entry repository
/// 2. **Observers**: Reports live subscriptions
/// 3. **Scheduler**: Reports pending timers and running reminders
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "checks": {
///     "storage": { "status": "ok", "message": "postgres, 12 active entries" },
///     "observers": { "status": "ok", "message": "3 subscriptions" },
///     "scheduler": { "status": "ok", "message": "2 timers, 1 reminders" }
///   }
/// }
/// ```
pub async fn health_handler(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    let storage = check_storage(&state).await;
    let observers = check_observers(&state).await;
    let scheduler = check_scheduler(&state);

    let all_healthy = storage.is_ok() && observers.is_ok() && scheduler.is_ok();

    let response = HealthResponse {
        status: if all_healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks {
            storage,
            observers,
            scheduler,
        },
    };

    if all_healthy {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}

async fn check_storage(state: &AppState) -> CheckStatus {
    match state.entry_service.count_active().await {
        Ok(active) => CheckStatus::ok(format!(
            "{}, {} active entries",
            state.storage_kind(),
            active
        )),
        Err(e) => CheckStatus::error(format!("Storage error: {}", e)),
    }
}

/// The global aggregator is subscribed at startup, so zero subscriptions
/// means statistics are no longer being collected.
async fn check_observers(state: &AppState) -> CheckStatus {
    let count = state.registry.subscriber_count().await;
    if count == 0 {
        CheckStatus::error("No statistics observers subscribed")
    } else {
        CheckStatus::ok(format!("{} subscriptions", count))
    }
}

fn check_scheduler(state: &AppState) -> CheckStatus {
    CheckStatus::ok(format!(
        "{} timers, {} reminders",
        state.scheduler.pending_timers(),
        state.scheduler.active_reminders()
    ))
}
