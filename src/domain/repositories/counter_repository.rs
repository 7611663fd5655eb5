//! Repository trait for statistics counters.

use crate::domain::entities::{StatsCounters, StatsScope};
use crate::error::StorageError;
use async_trait::async_trait;

/// Stores one [`StatsCounters`] record per scope.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CounterRepository: Send + Sync {
    /// Returns the counters of `scope`, or zeros if none were stored yet.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on backend failure.
    async fn load(&self, scope: &StatsScope) -> Result<StatsCounters, StorageError>;

    /// Replaces the counters of `scope`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on backend failure.
    async fn store(&self, scope: &StatsScope, counters: StatsCounters) -> Result<(), StorageError>;
}
