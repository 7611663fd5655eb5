//! Activation counters and the scope they belong to.

use std::fmt;

use serde::Serialize;

/// Scope of a counters record: the whole service or a single source domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StatsScope {
    Global,
    Domain(String),
}

impl StatsScope {
    /// Stable storage key for the scope.
    pub fn key(&self) -> String {
        match self {
            StatsScope::Global => "global".to_string(),
            StatsScope::Domain(d) => format!("domain:{d}"),
        }
    }

    /// Inverse of [`StatsScope::key`].
    pub fn from_key(key: &str) -> Option<Self> {
        if key == "global" {
            return Some(StatsScope::Global);
        }
        key.strip_prefix("domain:")
            .filter(|d| !d.is_empty())
            .map(|d| StatsScope::Domain(d.to_string()))
    }
}

impl fmt::Display for StatsScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// Activation counters for one scope.
///
/// `active_count` never goes below zero, even when an expiration is
/// delivered twice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsCounters {
    pub total_activations: u64,
    pub active_count: u64,
}

impl StatsCounters {
    pub fn new(total_activations: u64, active_count: u64) -> Self {
        Self {
            total_activations,
            active_count,
        }
    }

    /// Counters after one more activation.
    pub fn after_new(self) -> Self {
        Self {
            total_activations: self.total_activations.saturating_add(1),
            active_count: self.active_count.saturating_add(1),
        }
    }

    /// Counters after one expiration.
    pub fn after_expiration(self) -> Self {
        Self {
            total_activations: self.total_activations,
            active_count: self.active_count.saturating_sub(1),
        }
    }
}
