//! Top-level router configuration.
//!
//! # Route Structure
//!
//! - `POST /shorten`               - Create a short link
//! - `GET  /go/{code}`             - Resolve and redirect
//! - `GET  /statistics`            - Global activation counters
//! - `GET  /statistics/{domain}`   - Per-domain activation counters
//! - `GET  /health`                - Storage, registry and scheduler status
//!
//! # Middleware
//!
//! - **Tracing** - Structured request/response logging
//! - **Path normalization** - Trailing slash handling

use crate::api::handlers::{
    domain_stats_handler, global_stats_handler, health_handler, redirect_handler,
    shorten_handler,
};
use crate::api::middleware::tracing;
use crate::state::AppState;
use axum::Router;
use axum::routing::{get, post};
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

/// Routes without the outer path normalization, for tests that drive the
/// router directly.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/shorten", post(shorten_handler))
        .route("/go/{code}", get(redirect_handler))
        .route("/statistics", get(global_stats_handler))
        .route("/statistics/{domain}", get(domain_stats_handler))
        .route("/health", get(health_handler))
        .with_state(state)
        .layer(tracing::layer())
}

/// Constructs the application router with all routes and middleware.
pub fn app_router(state: AppState) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(api_router(state))
}
