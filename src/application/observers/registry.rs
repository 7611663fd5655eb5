//! Publish/subscribe hub between entries and statistics collectors.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::events::{EventKind, LifecycleEvent};
use crate::error::StorageError;

/// Default window after which an unrefreshed subscriber is dropped.
pub const DEFAULT_STALENESS: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// A statistics collector that can receive lifecycle events.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatsObserver: Send + Sync {
    /// Stable identifier; one registration per id per table.
    fn id(&self) -> String;

    /// A new entry became active.
    async fn register_new(&self) -> Result<(), StorageError>;

    /// An entry reached its terminal state.
    async fn register_expiration(&self) -> Result<(), StorageError>;
}

struct Registration {
    subscriber: Arc<dyn StatsObserver>,
    last_seen: Instant,
    domain_key: Option<String>,
}

#[derive(Default)]
struct Tables {
    global: HashMap<String, Registration>,
    domain: HashMap<String, Registration>,
}

/// Outcome of one [`ObserverRegistry::notify`] sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
    pub pruned: usize,
}

/// Routes [`LifecycleEvent`]s to global subscribers and to the domain
/// subscribers tagged with the event's domain.
///
/// Registrations not refreshed within the staleness window are dropped
/// during the next [`notify`](Self::notify); nothing polls them in between.
/// Delivery is best-effort per subscriber: a failing subscriber is logged
/// and skipped, and never fails the caller.
pub struct ObserverRegistry {
    tables: Mutex<Tables>,
    staleness: Duration,
}

impl ObserverRegistry {
    pub fn new(staleness: Duration) -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            staleness,
        }
    }

    /// Adds a global subscriber or refreshes its last-seen time.
    pub async fn subscribe_global(&self, subscriber: Arc<dyn StatsObserver>) {
        let id = subscriber.id();
        let mut tables = self.tables.lock().await;
        upsert(&mut tables.global, id, subscriber, None);
    }

    /// Adds a subscriber interested in `domain` only, or refreshes it.
    pub async fn subscribe_domain(&self, domain: &str, subscriber: Arc<dyn StatsObserver>) {
        let id = subscriber.id();
        let mut tables = self.tables.lock().await;
        upsert(
            &mut tables.domain,
            id,
            subscriber,
            Some(domain.to_string()),
        );
    }

    /// Removes the subscriber from both tables. Unknown ids are ignored.
    pub async fn unsubscribe(&self, id: &str) -> bool {
        let mut tables = self.tables.lock().await;
        let global = tables.global.remove(id).is_some();
        let domain = tables.domain.remove(id).is_some();
        global || domain
    }

    /// Number of live registrations across both tables.
    pub async fn subscriber_count(&self) -> usize {
        let tables = self.tables.lock().await;
        tables.global.len() + tables.domain.len()
    }

    /// Delivers `event` to every matching subscriber.
    ///
    /// Stale registrations are pruned first. Targets are snapshotted so
    /// subscribers run without the table lock; each success refreshes the
    /// subscriber's last-seen time.
    pub async fn notify(&self, event: &LifecycleEvent) -> DeliveryReport {
        let mut report = DeliveryReport::default();

        let targets: Vec<(bool, String, Arc<dyn StatsObserver>)> = {
            let mut tables = self.tables.lock().await;
            let now = Instant::now();
            report.pruned = prune(&mut tables.global, now, self.staleness)
                + prune(&mut tables.domain, now, self.staleness);

            let global = tables
                .global
                .iter()
                .map(|(id, r)| (true, id.clone(), Arc::clone(&r.subscriber)));
            let domain = tables
                .domain
                .iter()
                .filter(|(_, r)| r.domain_key.as_deref() == Some(event.domain.as_str()))
                .map(|(id, r)| (false, id.clone(), Arc::clone(&r.subscriber)));

            global.chain(domain).collect()
        };

        if report.pruned > 0 {
            tracing::debug!(pruned = report.pruned, "Pruned stale observers");
        }

        let mut refreshed = Vec::with_capacity(targets.len());
        for (is_global, id, subscriber) in targets {
            let result = match event.kind {
                EventKind::New => subscriber.register_new().await,
                EventKind::Expired => subscriber.register_expiration().await,
            };

            match result {
                Ok(()) => {
                    report.delivered += 1;
                    refreshed.push((is_global, id));
                }
                Err(e) => {
                    report.failed += 1;
                    metrics::counter!("shortlink_notifications_failed_total").increment(1);
                    tracing::warn!(
                        subscriber = %id,
                        code = %event.code,
                        kind = %event.kind,
                        error = %e,
                        "Observer notification failed"
                    );
                }
            }
        }

        if !refreshed.is_empty() {
            let mut tables = self.tables.lock().await;
            let now = Instant::now();
            for (is_global, id) in refreshed {
                let table = if is_global {
                    &mut tables.global
                } else {
                    &mut tables.domain
                };
                if let Some(r) = table.get_mut(&id) {
                    r.last_seen = now;
                }
            }
        }

        report
    }
}

fn upsert(
    table: &mut HashMap<String, Registration>,
    id: String,
    subscriber: Arc<dyn StatsObserver>,
    domain_key: Option<String>,
) {
    table.insert(
        id,
        Registration {
            subscriber,
            last_seen: Instant::now(),
            domain_key,
        },
    );
}

fn prune(table: &mut HashMap<String, Registration>, now: Instant, staleness: Duration) -> usize {
    let before = table.len();
    table.retain(|_, r| now.duration_since(r.last_seen) <= staleness);
    before - table.len()
}
