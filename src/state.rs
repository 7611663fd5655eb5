//! Shared application state and its wiring.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::application::expiration::{ExpirationScheduler, ReminderService};
use crate::application::observers::{AggregatorDirectory, DEFAULT_STALENESS, ObserverRegistry};
use crate::application::services::{EntryService, StatsService};
use crate::domain::events::ExpirationSignal;
use crate::domain::expiration_worker::run_expiration_worker;
use crate::error::StorageError;
use crate::infrastructure::persistence::Repositories;

/// Tunables for [`AppState::build`].
#[derive(Debug, Clone)]
pub struct StateSettings {
    pub base_url: String,
    pub observer_staleness: Duration,
    pub expiration_queue_capacity: usize,
    pub scheduler_retry_attempts: usize,
}

impl Default for StateSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            observer_staleness: DEFAULT_STALENESS,
            expiration_queue_capacity: 10_000,
            scheduler_retry_attempts: 3,
        }
    }
}

/// Services injected into every handler.
///
/// Cloning is cheap; every field is reference counted.
#[derive(Clone)]
pub struct AppState {
    pub entry_service: Arc<EntryService>,
    pub stats_service: Arc<StatsService>,
    pub registry: Arc<ObserverRegistry>,
    pub scheduler: Arc<ExpirationScheduler>,
    /// Set when entries live in PostgreSQL; used by health checks.
    pub db: Option<PgPool>,
}

impl AppState {
    /// Wires the services on top of `repositories`.
    ///
    /// Returns the receiving end of the expiration channel, which must be
    /// handed to [`AppState::spawn_expiration_worker`] before any entry can
    /// expire on schedule.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the persisted global counters cannot be loaded.
    pub async fn build(
        repositories: Repositories,
        settings: StateSettings,
        db: Option<PgPool>,
    ) -> Result<(Self, mpsc::Receiver<ExpirationSignal>), StorageError> {
        let (signal_tx, signal_rx) = mpsc::channel(settings.expiration_queue_capacity);

        let reminders = Arc::new(ReminderService::new(
            repositories.reminders,
            signal_tx.clone(),
            settings.scheduler_retry_attempts,
        ));
        let scheduler = Arc::new(ExpirationScheduler::new(signal_tx, reminders));

        let registry = Arc::new(ObserverRegistry::new(settings.observer_staleness));
        let directory = Arc::new(
            AggregatorDirectory::new(repositories.counters, Arc::clone(&registry)).await?,
        );

        let entry_service = Arc::new(EntryService::new(
            repositories.entries,
            Arc::clone(&scheduler),
            Arc::clone(&registry),
            Arc::clone(&directory),
            settings.base_url,
        ));
        let stats_service = Arc::new(StatsService::new(directory));

        let state = Self {
            entry_service,
            stats_service,
            registry,
            scheduler,
            db,
        };

        Ok((state, signal_rx))
    }

    /// In-memory state with default settings and a running expiration worker.
    ///
    /// # Errors
    ///
    /// Never fails in practice; the in-memory counter store is infallible.
    pub async fn in_memory(base_url: impl Into<String>) -> Result<Self, StorageError> {
        let settings = StateSettings {
            base_url: base_url.into(),
            ..StateSettings::default()
        };
        let (state, rx) = Self::build(Repositories::in_memory(), settings, None).await?;
        state.spawn_expiration_worker(rx);
        Ok(state)
    }

    /// Starts the task that turns scheduler signals into expirations.
    pub fn spawn_expiration_worker(&self, rx: mpsc::Receiver<ExpirationSignal>) -> JoinHandle<()> {
        tokio::spawn(run_expiration_worker(rx, Arc::clone(&self.entry_service)))
    }

    /// Human-readable storage backend name.
    pub fn storage_kind(&self) -> &'static str {
        if self.db.is_some() {
            "postgres"
        } else {
            "in-memory"
        }
    }
}
