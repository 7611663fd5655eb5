//! DTOs for activation statistics endpoints.

use serde::Serialize;

use crate::domain::entities::StatsCounters;

/// Activation counters for one scope.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    /// Entries ever created in this scope.
    pub total_activations: u64,
    /// Entries created and not yet expired.
    pub active_count: u64,
}

impl From<StatsCounters> for StatsResponse {
    fn from(counters: StatsCounters) -> Self {
        Self {
            total_activations: counters.total_activations,
            active_count: counters.active_count,
        }
    }
}
