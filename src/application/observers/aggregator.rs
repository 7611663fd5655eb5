//! Activation counters for one scope.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::application::observers::registry::StatsObserver;
use crate::domain::entities::{StatsCounters, StatsScope};
use crate::domain::repositories::CounterRepository;
use crate::error::StorageError;

/// Counts activations and live entries for the global scope or one domain.
///
/// Writes are serialized by an async mutex held across persistence: the next
/// value is computed, stored, and only then made visible, so readers never
/// see a value that failed to persist.
pub struct StatsAggregator {
    scope: StatsScope,
    counters: Mutex<StatsCounters>,
    repository: Arc<dyn CounterRepository>,
}

impl StatsAggregator {
    /// Loads the persisted counters of `scope`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the counters cannot be read.
    pub async fn load(
        scope: StatsScope,
        repository: Arc<dyn CounterRepository>,
    ) -> Result<Self, StorageError> {
        let counters = repository.load(&scope).await?;
        tracing::debug!(
            scope = %scope,
            total = counters.total_activations,
            active = counters.active_count,
            "Stats aggregator loaded"
        );

        Ok(Self {
            scope,
            counters: Mutex::new(counters),
            repository,
        })
    }

    pub fn scope(&self) -> &StatsScope {
        &self.scope
    }

    /// +1 total, +1 active.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the new value cannot be persisted; the
    /// in-memory value is left unchanged.
    pub async fn record_new(&self) -> Result<StatsCounters, StorageError> {
        self.apply(StatsCounters::after_new).await
    }

    /// -1 active, floored at zero.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the new value cannot be persisted.
    pub async fn record_expiration(&self) -> Result<StatsCounters, StorageError> {
        self.apply(StatsCounters::after_expiration).await
    }

    pub async fn get_total(&self) -> u64 {
        self.counters.lock().await.total_activations
    }

    pub async fn get_active_count(&self) -> u64 {
        self.counters.lock().await.active_count
    }

    /// Both counters read under one lock.
    pub async fn snapshot(&self) -> StatsCounters {
        *self.counters.lock().await
    }

    async fn apply(
        &self,
        step: fn(StatsCounters) -> StatsCounters,
    ) -> Result<StatsCounters, StorageError> {
        let mut counters = self.counters.lock().await;
        let next = step(*counters);

        self.repository.store(&self.scope, next).await?;
        *counters = next;

        tracing::trace!(
            scope = %self.scope,
            total = next.total_activations,
            active = next.active_count,
            "Counters updated"
        );
        Ok(next)
    }
}

#[async_trait]
impl StatsObserver for StatsAggregator {
    fn id(&self) -> String {
        self.scope.key()
    }

    async fn register_new(&self) -> Result<(), StorageError> {
        self.record_new().await.map(|_| ())
    }

    async fn register_expiration(&self) -> Result<(), StorageError> {
        self.record_expiration().await.map(|_| ())
    }
}
