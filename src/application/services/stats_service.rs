//! Activation statistics queries.

use std::sync::Arc;

use crate::application::observers::AggregatorDirectory;
use crate::domain::entities::{StatsCounters, StatsScope};
use crate::error::LifecycleError;
use crate::utils::extract_domain::domain_key;

/// Read-only access to global and per-domain counters.
pub struct StatsService {
    directory: Arc<AggregatorDirectory>,
}

impl StatsService {
    /// Creates a new statistics service.
    pub fn new(directory: Arc<AggregatorDirectory>) -> Self {
        Self { directory }
    }

    /// Counters across all domains.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Storage`] if stored counters cannot be read.
    pub async fn global(&self) -> Result<StatsCounters, LifecycleError> {
        Ok(self.directory.counters(&StatsScope::Global).await?)
    }

    /// Counters for one source domain, zero-valued if it never had an event.
    ///
    /// The domain is matched case-insensitively and without port.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Storage`] if stored counters cannot be read.
    pub async fn domain(&self, domain: &str) -> Result<StatsCounters, LifecycleError> {
        let Some(key) = domain_key(domain) else {
            return Ok(StatsCounters::default());
        };

        Ok(self.directory.counters(&StatsScope::Domain(key)).await?)
    }

    /// Number of domains with a live aggregator.
    pub fn tracked_domains(&self) -> usize {
        self.directory.domain_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::observers::{DEFAULT_STALENESS, ObserverRegistry};
    use crate::domain::events::LifecycleEvent;
    use crate::domain::repositories::{CounterRepository, MockCounterRepository};
    use crate::error::StorageError;
    use crate::infrastructure::persistence::InMemoryCounterRepository;

    #[tokio::test]
    async fn test_domain_lookup_is_normalized() {
        let registry = Arc::new(ObserverRegistry::new(DEFAULT_STALENESS));
        let directory = Arc::new(
            AggregatorDirectory::new(
                Arc::new(InMemoryCounterRepository::new()),
                Arc::clone(&registry),
            )
            .await
            .unwrap(),
        );
        directory.ensure_domain("example.com").await.unwrap();
        registry
            .notify(&LifecycleEvent::new_entry("a", "example.com"))
            .await;

        let service = StatsService::new(directory);

        assert_eq!(
            service.domain("Example.COM:443").await.unwrap(),
            StatsCounters::new(1, 1)
        );
        assert_eq!(service.global().await.unwrap(), StatsCounters::new(1, 1));
        assert_eq!(service.domain("").await.unwrap(), StatsCounters::default());
        assert_eq!(service.tracked_domains(), 1);
    }

    #[tokio::test]
    async fn test_unknown_domain_falls_back_to_storage() {
        let repo = Arc::new(InMemoryCounterRepository::new());
        repo.store(
            &StatsScope::Domain("old.example.com".into()),
            StatsCounters::new(7, 0),
        )
        .await
        .unwrap();
        let directory = Arc::new(
            AggregatorDirectory::new(
                repo,
                Arc::new(ObserverRegistry::new(DEFAULT_STALENESS)),
            )
            .await
            .unwrap(),
        );
        let service = StatsService::new(directory);

        assert_eq!(
            service.domain("old.example.com").await.unwrap(),
            StatsCounters::new(7, 0)
        );
        assert_eq!(service.tracked_domains(), 0);
    }

    #[tokio::test]
    async fn test_storage_error_is_reported() {
        let mut repo = MockCounterRepository::new();
        repo.expect_load().returning(|scope| match scope {
            StatsScope::Global => Ok(StatsCounters::default()),
            StatsScope::Domain(_) => Err(StorageError::Unavailable("down".into())),
        });
        let directory = Arc::new(
            AggregatorDirectory::new(
                Arc::new(repo),
                Arc::new(ObserverRegistry::new(DEFAULT_STALENESS)),
            )
            .await
            .unwrap(),
        );

        let result = StatsService::new(directory).domain("x.com").await;

        assert!(matches!(result, Err(LifecycleError::Storage(_))));
    }
}
