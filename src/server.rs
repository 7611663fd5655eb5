//! HTTP server initialization and runtime setup.
//!
//! Handles storage selection, service wiring, expiration worker spawning,
//! reminder rehydration, and the Axum server lifecycle.

use crate::config::Config;
use crate::infrastructure::persistence::Repositories;
use crate::routes::app_router;
use crate::state::{AppState, StateSettings};

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - PostgreSQL connection pool and migrations (when `DATABASE_URL` is set)
/// - Entry, statistics and expiration services
/// - Background expiration worker
/// - Durable reminders persisted by a previous run
/// - Axum HTTP server with graceful shutdown on Ctrl+C
///
/// # Errors
///
/// Returns an error if:
/// - Database connection or migration fails
/// - Stored counters or reminders cannot be loaded
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let pool = match &config.database_url {
        Some(database_url) => Some(connect(database_url, config.db_max_connections).await?),
        None => None,
    };

    let repositories = match &pool {
        Some(pool) => Repositories::postgres(Arc::new(pool.clone())),
        None => {
            tracing::warn!("DATABASE_URL not set, entries are kept in memory only");
            Repositories::in_memory()
        }
    };

    let settings = StateSettings {
        base_url: config.base_url.clone(),
        observer_staleness: config.observer_staleness(),
        expiration_queue_capacity: config.expiration_queue_capacity,
        scheduler_retry_attempts: config.scheduler_retry_attempts,
    };

    let (state, signal_rx) = AppState::build(repositories, settings, pool)
        .await
        .context("Failed to initialize services")?;

    state.spawn_expiration_worker(signal_rx);
    tracing::info!("Expiration worker started");

    let rehydrated = state
        .entry_service
        .rehydrate()
        .await
        .context("Failed to restore durable reminders")?;
    tracing::info!(reminders = rehydrated, "Durable reminders restored");

    let scheduler = Arc::clone(&state.scheduler);
    let app = app_router(state);

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    scheduler.shutdown();
    tracing::info!("Server stopped");

    Ok(())
}

async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to migrate")?;

    Ok(pool)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
