//! Statistics fan-out.
//!
//! Entries publish [`crate::domain::events::LifecycleEvent`] values to the
//! [`ObserverRegistry`], which forwards them to the global
//! [`StatsAggregator`] and to the aggregator of the event's domain. The
//! [`AggregatorDirectory`] owns the aggregators and keeps their
//! registrations fresh.

pub mod aggregator;
pub mod directory;
pub mod registry;

pub use aggregator::StatsAggregator;
pub use directory::AggregatorDirectory;
pub use registry::{DEFAULT_STALENESS, DeliveryReport, ObserverRegistry, StatsObserver};

#[cfg(test)]
pub use registry::MockStatsObserver;
