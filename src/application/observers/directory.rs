//! Owner of the global aggregator and the lazily created domain aggregators.

use std::sync::Arc;

use dashmap::DashMap;

use crate::application::observers::aggregator::StatsAggregator;
use crate::application::observers::registry::ObserverRegistry;
use crate::domain::entities::{StatsCounters, StatsScope};
use crate::domain::repositories::CounterRepository;
use crate::error::StorageError;

/// Constructed once at startup and injected wherever statistics are
/// published or queried.
///
/// Domain aggregators are created on the first event for their domain and
/// live for the rest of the process.
pub struct AggregatorDirectory {
    global: Arc<StatsAggregator>,
    domains: DashMap<String, Arc<StatsAggregator>>,
    repository: Arc<dyn CounterRepository>,
    registry: Arc<ObserverRegistry>,
}

impl AggregatorDirectory {
    /// Loads the global aggregator and subscribes it to `registry`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the global counters cannot be loaded.
    pub async fn new(
        repository: Arc<dyn CounterRepository>,
        registry: Arc<ObserverRegistry>,
    ) -> Result<Self, StorageError> {
        let global =
            Arc::new(StatsAggregator::load(StatsScope::Global, Arc::clone(&repository)).await?);
        registry.subscribe_global(global.clone()).await;

        Ok(Self {
            global,
            domains: DashMap::new(),
            repository,
            registry,
        })
    }

    pub fn global(&self) -> Arc<StatsAggregator> {
        Arc::clone(&self.global)
    }

    /// The aggregator for `domain`, if one was created.
    pub fn domain(&self, domain: &str) -> Option<Arc<StatsAggregator>> {
        self.domains.get(domain).map(|a| Arc::clone(a.value()))
    }

    /// Number of domain aggregators created so far.
    pub fn domain_count(&self) -> usize {
        self.domains.len()
    }

    /// Gets or creates the aggregator for `domain` and refreshes both its
    /// registration and the global one.
    ///
    /// Called before every publication so that a subscriber that is still in
    /// use never ages out of the registry.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if a new aggregator cannot load its counters.
    pub async fn ensure_domain(&self, domain: &str) -> Result<Arc<StatsAggregator>, StorageError> {
        let aggregator = match self.domain(domain) {
            Some(existing) => existing,
            None => {
                let loaded = StatsAggregator::load(
                    StatsScope::Domain(domain.to_string()),
                    Arc::clone(&self.repository),
                )
                .await?;
                // A concurrent creator may have won; its instance is kept.
                let entry = self
                    .domains
                    .entry(domain.to_string())
                    .or_insert_with(|| Arc::new(loaded));
                let aggregator = Arc::clone(entry.value());
                drop(entry);

                tracing::info!(domain = %domain, "Domain aggregator created");
                aggregator
            }
        };

        self.registry
            .subscribe_domain(domain, aggregator.clone())
            .await;
        self.registry.subscribe_global(self.global.clone()).await;

        Ok(aggregator)
    }

    /// Counters for `scope`. Unknown domains are read from storage, which
    /// yields zeros for a domain that never had an event; no aggregator is
    /// created.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if storage has to be consulted and fails.
    pub async fn counters(&self, scope: &StatsScope) -> Result<StatsCounters, StorageError> {
        match scope {
            StatsScope::Global => Ok(self.global.snapshot().await),
            StatsScope::Domain(domain) => match self.domain(domain) {
                Some(aggregator) => Ok(aggregator.snapshot().await),
                None => self.repository.load(scope).await,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::observers::registry::DEFAULT_STALENESS;
    use crate::domain::events::LifecycleEvent;
    use crate::infrastructure::persistence::InMemoryCounterRepository;

    async fn directory() -> (AggregatorDirectory, Arc<ObserverRegistry>) {
        let registry = Arc::new(ObserverRegistry::new(DEFAULT_STALENESS));
        let dir = AggregatorDirectory::new(
            Arc::new(InMemoryCounterRepository::new()),
            Arc::clone(&registry),
        )
        .await
        .unwrap();
        (dir, registry)
    }

    #[tokio::test]
    async fn test_global_is_subscribed_at_startup() {
        let (dir, registry) = directory().await;

        assert_eq!(registry.subscriber_count().await, 1);
        registry
            .notify(&LifecycleEvent::new_entry("a", "x.com"))
            .await;

        assert_eq!(dir.global().get_total().await, 1);
        assert!(dir.domain("x.com").is_none());
    }

    #[tokio::test]
    async fn test_ensure_domain_creates_once_and_routes_events() {
        let (dir, registry) = directory().await;

        let first = dir.ensure_domain("x.com").await.unwrap();
        let second = dir.ensure_domain("x.com").await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(dir.domain_count(), 1);
        assert_eq!(registry.subscriber_count().await, 2);

        registry
            .notify(&LifecycleEvent::new_entry("a", "x.com"))
            .await;
        registry
            .notify(&LifecycleEvent::new_entry("b", "y.com"))
            .await;

        assert_eq!(
            dir.counters(&StatsScope::Domain("x.com".into()))
                .await
                .unwrap(),
            StatsCounters::new(1, 1)
        );
        assert_eq!(
            dir.counters(&StatsScope::Global).await.unwrap(),
            StatsCounters::new(2, 2)
        );
    }

    #[tokio::test]
    async fn test_unknown_domain_reads_zero_without_creating() {
        let (dir, _registry) = directory().await;

        let counters = dir
            .counters(&StatsScope::Domain("never.seen".into()))
            .await
            .unwrap();

        assert_eq!(counters, StatsCounters::default());
        assert_eq!(dir.domain_count(), 0);
    }
}
