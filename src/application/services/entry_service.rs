//! Entry lifecycle: create, resolve and expire short codes.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::application::expiration::ExpirationScheduler;
use crate::application::observers::{AggregatorDirectory, ObserverRegistry};
use crate::domain::entities::{DEFAULT_TTL_SECS, EntryState, ShortenedEntry};
use crate::domain::events::{ExpirationSignal, LifecycleEvent};
use crate::domain::expiration_worker::ExpirationHandler;
use crate::domain::repositories::EntryRepository;
use crate::error::{LifecycleError, StorageError};
use crate::utils::code_generator::{issue_code, prepare_target};
use crate::utils::url_normalizer::NormalizedUrl;

/// Result of a successful create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedLink {
    pub code: String,
    pub short_url: String,
    pub target_url: String,
    pub domain: String,
    pub one_shot: bool,
    pub insecure: bool,
    pub expires_at: DateTime<Utc>,
}

/// Per-code state cell. `loaded` distinguishes "not read from storage yet"
/// from "read, and absent".
#[derive(Default)]
struct EntrySlot {
    loaded: bool,
    entry: Option<ShortenedEntry>,
}

/// Owns the state machine of every short code.
///
/// Operations on one code run strictly one at a time behind that code's
/// async mutex; different codes never contend. Entries are read from the
/// repository on first touch and kept in memory afterwards.
///
/// # Lifecycle
///
/// `Created`/`Active` entries resolve; `Expired` is terminal. Every path that
/// ends an entry goes through the same idempotent expiration step: disarm the
/// scheduler, publish "expired", mark the entry expired.
pub struct EntryService {
    repository: Arc<dyn EntryRepository>,
    scheduler: Arc<ExpirationScheduler>,
    registry: Arc<ObserverRegistry>,
    directory: Arc<AggregatorDirectory>,
    slots: DashMap<String, Arc<Mutex<EntrySlot>>>,
    base_url: String,
}

impl EntryService {
    pub fn new(
        repository: Arc<dyn EntryRepository>,
        scheduler: Arc<ExpirationScheduler>,
        registry: Arc<ObserverRegistry>,
        directory: Arc<AggregatorDirectory>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            scheduler,
            registry,
            directory,
            slots: DashMap::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Public URL resolving `code`.
    pub fn short_url(&self, code: &str) -> String {
        format!("{}/go/{}", self.base_url, code)
    }

    /// Shortens `target_url` under a freshly generated code.
    ///
    /// A missing or zero TTL means [`DEFAULT_TTL_SECS`], not "expire now".
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::InvalidUrl`] for a malformed target
    /// - [`LifecycleError::InvalidTtl`] for a negative or oversized TTL
    /// - [`LifecycleError::Storage`] if the entry could not be persisted
    pub async fn create(
        &self,
        target_url: &str,
        one_shot: bool,
        ttl_seconds: Option<i64>,
    ) -> Result<CreatedLink, LifecycleError> {
        let ttl = effective_ttl(ttl_seconds)?;
        let issued = issue_code(target_url)?;

        self.install(issued.code, issued.target, one_shot, ttl).await
    }

    /// Like [`create`](Self::create) but under a caller-chosen code.
    ///
    /// An entry already stored under `code` is overwritten; if it was still
    /// active it is expired first so its statistics stay balanced.
    ///
    /// # Errors
    ///
    /// Same as [`create`](Self::create).
    pub async fn create_with_code(
        &self,
        code: &str,
        target_url: &str,
        one_shot: bool,
        ttl_seconds: Option<i64>,
    ) -> Result<CreatedLink, LifecycleError> {
        let ttl = effective_ttl(ttl_seconds)?;
        let target = prepare_target(target_url)?;

        self.install(code.to_string(), target, one_shot, ttl).await
    }

    /// Resolves `code` to its target URL.
    ///
    /// The invocation count is incremented on every call that finds the
    /// entry, including failing ones. A one-shot entry is expired right after
    /// its first successful read.
    ///
    /// # Errors
    ///
    /// In priority order:
    /// - [`LifecycleError::NotFound`] if the code was never created
    /// - [`LifecycleError::InvocationExceeded`] if a one-shot entry was already read
    /// - [`LifecycleError::Expired`] if the TTL elapsed or the entry is terminal
    /// - [`LifecycleError::Storage`] if the updated entry could not be persisted
    pub async fn resolve(&self, code: &str) -> Result<String, LifecycleError> {
        let handle = self.slot(code);
        let mut slot = handle.lock().await;
        self.ensure_loaded(&mut slot, code).await?;

        let Some(entry) = slot.entry.as_mut() else {
            drop(slot);
            self.release_vacant(code, handle);
            record_resolution("not_found");
            return Err(LifecycleError::NotFound(code.to_string()));
        };

        entry.invocation_count = entry.invocation_count.saturating_add(1);

        let outcome = if entry.one_shot && entry.invocation_count > 1 {
            Err(LifecycleError::InvocationExceeded(code.to_string()))
        } else if !entry.is_active() {
            Err(LifecycleError::Expired(code.to_string()))
        } else if entry.is_past_expiry(Utc::now()) {
            // The scheduler has not delivered yet (or its timer died with a
            // previous process); finish the expiration here.
            self.expire_in_place(entry).await;
            Err(LifecycleError::Expired(code.to_string()))
        } else {
            let target = entry.target_url.clone();
            if entry.one_shot {
                tracing::info!(code = %code, "One-shot entry consumed");
                self.expire_in_place(entry).await;
            }
            Ok(target)
        };

        record_resolution(match &outcome {
            Ok(_) => "success",
            Err(LifecycleError::InvocationExceeded(_)) => "invocation_exceeded",
            Err(_) => "expired",
        });

        self.repository.save(entry).await?;
        outcome
    }

    /// Scheduler callback: expires `code`.
    ///
    /// Idempotent. Returns `false` when the entry is unknown or already
    /// expired, in which case nothing is published.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Storage`] if the entry cannot be loaded or
    /// the expired state cannot be persisted.
    pub async fn on_expire(&self, code: &str) -> Result<bool, LifecycleError> {
        let handle = self.slot(code);
        let mut slot = handle.lock().await;
        self.ensure_loaded(&mut slot, code).await?;

        let Some(entry) = slot.entry.as_mut() else {
            drop(slot);
            self.release_vacant(code, handle);
            tracing::debug!(code = %code, "Expiration for unknown code ignored");
            return Ok(false);
        };

        if !self.expire_in_place(entry).await {
            return Ok(false);
        }

        self.repository.save(entry).await?;
        Ok(true)
    }

    /// Handles one scheduler firing.
    ///
    /// Signals whose ticket does not belong to the entry's live handle come
    /// from an earlier incarnation of the code; they are dropped and whatever
    /// still fires them is stopped.
    ///
    /// # Errors
    ///
    /// Same as [`on_expire`](Self::on_expire).
    pub async fn on_scheduler_fire(&self, signal: ExpirationSignal) -> Result<bool, LifecycleError> {
        let handle = self.slot(&signal.code);
        let mut slot = handle.lock().await;
        self.ensure_loaded(&mut slot, &signal.code).await?;

        let live_ticket = slot
            .entry
            .as_ref()
            .filter(|e| e.is_active())
            .and_then(|e| e.scheduler.as_ref())
            .map(|h| h.ticket);

        if live_ticket != Some(signal.ticket) {
            tracing::debug!(
                code = %signal.code,
                ticket = signal.ticket,
                "Stale expiration signal dropped"
            );
            if let Err(e) = self
                .scheduler
                .discard_stale(&signal.code, signal.ticket)
                .await
            {
                tracing::warn!(code = %signal.code, error = %e, "Failed to discard stale reminder");
            }
            if slot.entry.is_none() {
                drop(slot);
                self.release_vacant(&signal.code, handle);
            }
            return Ok(false);
        }

        let Some(entry) = slot.entry.as_mut() else {
            return Ok(false);
        };
        self.expire_in_place(entry).await;
        self.repository.save(entry).await?;
        Ok(true)
    }

    /// Current stored state of `code`. Expired entries stay readable.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Storage`] if the entry cannot be loaded.
    pub async fn get(&self, code: &str) -> Result<Option<ShortenedEntry>, LifecycleError> {
        let handle = self.slot(code);
        let mut slot = handle.lock().await;
        self.ensure_loaded(&mut slot, code).await?;
        let entry = slot.entry.clone();
        if entry.is_none() {
            drop(slot);
            self.release_vacant(code, handle);
        }
        Ok(entry)
    }

    /// Restarts durable reminders left by a previous process. Entries
    /// themselves are loaded lazily.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if reminders cannot be listed.
    pub async fn rehydrate(&self) -> Result<usize, StorageError> {
        self.scheduler.rehydrate().await
    }

    /// Count of non-expired entries in storage.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on backend failure.
    pub async fn count_active(&self) -> Result<u64, StorageError> {
        self.repository.count_active().await
    }

    async fn install(
        &self,
        code: String,
        target: NormalizedUrl,
        one_shot: bool,
        ttl: u32,
    ) -> Result<CreatedLink, LifecycleError> {
        let slot = self.slot(&code);
        let mut slot = slot.lock().await;
        self.ensure_loaded(&mut slot, &code).await?;

        if let Some(previous) = slot.entry.as_mut() {
            if self.expire_in_place(previous).await {
                tracing::info!(code = %code, "Active entry overwritten");
                if let Err(e) = self.repository.save(previous).await {
                    tracing::warn!(code = %code, error = %e, "Failed to persist overwritten entry");
                }
            }
        }

        let mut entry = ShortenedEntry::new(
            code.clone(),
            target.url,
            target.host,
            one_shot,
            ttl,
            Utc::now(),
        );

        self.refresh_observers(&entry.domain).await;
        let event = LifecycleEvent::new_entry(&entry.code, &entry.domain);
        let (report, armed) = tokio::join!(
            self.registry.notify(&event),
            self.scheduler.arm(&code, ttl)
        );
        tracing::debug!(
            code = %code,
            delivered = report.delivered,
            failed = report.failed,
            "New entry published"
        );

        // Without a handle the entry stays `Created` and is expired lazily
        // by the first resolution past its expiry.
        match armed {
            Ok(handle) => {
                entry.scheduler = Some(handle);
                entry.state = EntryState::Active;
            }
            Err(e) => {
                tracing::error!(code = %code, error = %e, "Failed to arm expiration");
            }
        }

        let saved = self.repository.save(&entry).await;
        let created = CreatedLink {
            short_url: self.short_url(&code),
            code,
            target_url: entry.target_url.clone(),
            domain: entry.domain.clone(),
            one_shot,
            insecure: target.insecure,
            expires_at: entry.expires_at,
        };
        slot.entry = Some(entry);

        saved?;

        metrics::counter!("shortlink_entries_created_total").increment(1);
        tracing::info!(
            code = %created.code,
            domain = %created.domain,
            one_shot,
            ttl_seconds = ttl,
            "Entry created"
        );
        Ok(created)
    }

    /// Runs the expiration path once. Returns `false` if the entry was
    /// already expired.
    ///
    /// Disarming completes before the state changes, so a scheduler firing
    /// that races with early retirement finds the entry expired.
    async fn expire_in_place(&self, entry: &mut ShortenedEntry) -> bool {
        if !entry.is_active() {
            return false;
        }

        if let Some(handle) = entry.scheduler.take() {
            if let Err(e) = self.scheduler.disarm(&handle).await {
                tracing::warn!(code = %entry.code, error = %e, "Failed to disarm scheduler");
            }
        }

        self.refresh_observers(&entry.domain).await;
        let report = self
            .registry
            .notify(&LifecycleEvent::expired(&entry.code, &entry.domain))
            .await;
        entry.mark_expired();

        metrics::counter!("shortlink_entries_expired_total").increment(1);
        tracing::info!(
            code = %entry.code,
            domain = %entry.domain,
            delivered = report.delivered,
            "Entry expired"
        );
        true
    }

    /// Makes sure the domain aggregator exists and both statistics
    /// subscriptions are fresh. Failures only cost statistics.
    async fn refresh_observers(&self, domain: &str) {
        if let Err(e) = self.directory.ensure_domain(domain).await {
            tracing::warn!(domain = %domain, error = %e, "Failed to prepare domain statistics");
        }
    }

    async fn ensure_loaded(&self, slot: &mut EntrySlot, code: &str) -> Result<(), StorageError> {
        if !slot.loaded {
            slot.entry = self.repository.load(code).await?;
            slot.loaded = true;
        }
        Ok(())
    }

    fn slot(&self, code: &str) -> Arc<Mutex<EntrySlot>> {
        Arc::clone(&self.slots.entry(code.to_string()).or_default())
    }

    /// Drops the slot of a code with no entry unless another caller holds it.
    fn release_vacant(&self, code: &str, handle: Arc<Mutex<EntrySlot>>) {
        drop(handle);
        self.slots
            .remove_if(code, |_, slot| Arc::strong_count(slot) == 1);
    }
}

#[async_trait]
impl ExpirationHandler for EntryService {
    async fn handle_expiration(&self, signal: ExpirationSignal) -> Result<(), LifecycleError> {
        self.on_scheduler_fire(signal).await.map(|_| ())
    }
}

/// Maps the caller's TTL onto seconds. `None` and `0` mean the default.
fn effective_ttl(ttl_seconds: Option<i64>) -> Result<u32, LifecycleError> {
    match ttl_seconds {
        None | Some(0) => Ok(DEFAULT_TTL_SECS),
        Some(ttl) if ttl < 0 => Err(LifecycleError::InvalidTtl(ttl)),
        Some(ttl) => u32::try_from(ttl).map_err(|_| LifecycleError::InvalidTtl(ttl)),
    }
}

fn record_resolution(outcome: &'static str) {
    metrics::counter!("shortlink_resolutions_total", "outcome" => outcome).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::expiration::ReminderService;
    use crate::application::observers::DEFAULT_STALENESS;
    use crate::domain::entities::{SchedulerKind, StatsCounters, StatsScope};
    use crate::domain::repositories::{
        MockEntryRepository, MockReminderRepository, ReminderRepository,
    };
    use crate::infrastructure::persistence::{
        InMemoryCounterRepository, InMemoryEntryRepository, InMemoryReminderRepository,
    };
    use tokio::sync::mpsc;

    struct Harness {
        service: EntryService,
        directory: Arc<AggregatorDirectory>,
        scheduler: Arc<ExpirationScheduler>,
        signals: mpsc::Receiver<ExpirationSignal>,
    }

    async fn harness_with(repository: Arc<dyn EntryRepository>) -> Harness {
        harness_parts(repository, Arc::new(InMemoryReminderRepository::new())).await
    }

    async fn harness_parts(
        repository: Arc<dyn EntryRepository>,
        reminder_repository: Arc<dyn ReminderRepository>,
    ) -> Harness {
        let (tx, rx) = mpsc::channel(64);
        let registry = Arc::new(ObserverRegistry::new(DEFAULT_STALENESS));
        let directory = Arc::new(
            AggregatorDirectory::new(
                Arc::new(InMemoryCounterRepository::new()),
                Arc::clone(&registry),
            )
            .await
            .unwrap(),
        );
        let reminders = Arc::new(ReminderService::new(reminder_repository, tx.clone(), 3));
        let scheduler = Arc::new(ExpirationScheduler::new(tx, reminders));
        let service = EntryService::new(
            repository,
            Arc::clone(&scheduler),
            registry,
            Arc::clone(&directory),
            "http://localhost:3000/",
        );

        Harness {
            service,
            directory,
            scheduler,
            signals: rx,
        }
    }

    async fn harness() -> Harness {
        harness_with(Arc::new(InMemoryEntryRepository::new())).await
    }

    async fn global(h: &Harness) -> StatsCounters {
        h.directory.counters(&StatsScope::Global).await.unwrap()
    }

    #[test]
    fn test_effective_ttl() {
        assert_eq!(effective_ttl(None).unwrap(), 60);
        assert_eq!(effective_ttl(Some(0)).unwrap(), 60);
        assert_eq!(effective_ttl(Some(5)).unwrap(), 5);
        assert!(matches!(
            effective_ttl(Some(-1)),
            Err(LifecycleError::InvalidTtl(-1))
        ));
        assert!(effective_ttl(Some(i64::MAX)).is_err());
    }

    #[tokio::test]
    async fn test_create_publishes_and_arms() {
        let h = harness().await;

        let created = h
            .service
            .create("HTTPS://Example.com/Page", false, Some(120))
            .await
            .unwrap();

        assert_eq!(created.target_url, "https://example.com/Page");
        assert_eq!(created.domain, "example.com");
        assert_eq!(
            created.short_url,
            format!("http://localhost:3000/go/{}", created.code)
        );
        assert!(!created.insecure);

        let entry = h.service.get(&created.code).await.unwrap().unwrap();
        assert_eq!(entry.state, EntryState::Active);
        assert_eq!(entry.scheduler.as_ref().unwrap().kind, SchedulerKind::Durable);
        assert_eq!(global(&h).await, StatsCounters::new(1, 1));
        assert_eq!(
            h.directory
                .counters(&StatsScope::Domain("example.com".into()))
                .await
                .unwrap(),
            StatsCounters::new(1, 1)
        );
        h.scheduler.shutdown();
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_input() {
        let h = harness().await;

        assert!(matches!(
            h.service.create("not a url", false, None).await,
            Err(LifecycleError::InvalidUrl(_))
        ));
        assert!(matches!(
            h.service.create("https://example.com", false, Some(-5)).await,
            Err(LifecycleError::InvalidTtl(-5))
        ));
        assert_eq!(global(&h).await, StatsCounters::default());
    }

    #[tokio::test]
    async fn test_insecure_target_is_flagged_but_resolves() {
        let h = harness().await;

        let created = h
            .service
            .create("http://example.com", false, Some(30))
            .await
            .unwrap();

        assert!(created.insecure);
        assert_eq!(
            h.service.resolve(&created.code).await.unwrap(),
            "http://example.com/"
        );
        h.scheduler.shutdown();
    }

    #[tokio::test]
    async fn test_resolve_unknown_code() {
        let h = harness().await;

        assert!(matches!(
            h.service.resolve("missing").await,
            Err(LifecycleError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_codes_leave_no_slots_behind() {
        let h = harness().await;

        for i in 0..1_000 {
            assert!(matches!(
                h.service.resolve(&format!("nope{i}")).await,
                Err(LifecycleError::NotFound(_))
            ));
        }
        assert!(!h.service.on_expire("nope-expire").await.unwrap());
        assert!(h.service.get("nope-get").await.unwrap().is_none());

        assert_eq!(h.service.slots.len(), 0);
    }

    #[tokio::test]
    async fn test_slot_of_created_code_is_kept() {
        let h = harness().await;
        let created = h
            .service
            .create("https://example.com/kept", false, Some(30))
            .await
            .unwrap();
        let _ = h.service.resolve("missing").await;

        assert_eq!(h.service.slots.len(), 1);
        assert!(h.service.slots.contains_key(&created.code));
        h.scheduler.shutdown();
    }

    #[tokio::test]
    async fn test_one_shot_retires_after_first_read() {
        let h = harness().await;
        let created = h
            .service
            .create("https://example.com", true, Some(60))
            .await
            .unwrap();

        assert_eq!(
            h.service.resolve(&created.code).await.unwrap(),
            "https://example.com/"
        );
        assert_eq!(global(&h).await, StatsCounters::new(1, 0));
        assert_eq!(h.scheduler.active_reminders(), 0);

        for _ in 0..3 {
            assert!(matches!(
                h.service.resolve(&created.code).await,
                Err(LifecycleError::InvocationExceeded(_))
            ));
        }

        let entry = h.service.get(&created.code).await.unwrap().unwrap();
        assert_eq!(entry.invocation_count, 4);
        assert_eq!(entry.state, EntryState::Expired);
        assert_eq!(global(&h).await, StatsCounters::new(1, 0));
    }

    #[tokio::test]
    async fn test_on_expire_is_idempotent() {
        let h = harness().await;
        let created = h
            .service
            .create("https://example.com", false, Some(600))
            .await
            .unwrap();

        assert!(h.service.on_expire(&created.code).await.unwrap());
        assert!(!h.service.on_expire(&created.code).await.unwrap());
        assert!(!h.service.on_expire("unknown").await.unwrap());

        assert_eq!(global(&h).await, StatsCounters::new(1, 0));
        assert!(matches!(
            h.service.resolve(&created.code).await,
            Err(LifecycleError::Expired(_))
        ));
    }

    #[tokio::test]
    async fn test_scheduler_fire_with_stale_ticket_is_ignored() {
        let h = harness().await;
        let created = h
            .service
            .create_with_code("fixed", "https://example.com", false, Some(600))
            .await
            .unwrap();
        let ticket = h
            .service
            .get("fixed")
            .await
            .unwrap()
            .unwrap()
            .scheduler
            .unwrap()
            .ticket;

        let stale = ExpirationSignal {
            code: created.code.clone(),
            ticket: ticket.wrapping_add(1),
        };
        assert!(!h.service.on_scheduler_fire(stale).await.unwrap());
        assert_eq!(global(&h).await, StatsCounters::new(1, 1));

        let live = ExpirationSignal {
            code: created.code.clone(),
            ticket,
        };
        assert!(h.service.on_scheduler_fire(live.clone()).await.unwrap());
        assert!(!h.service.on_scheduler_fire(live).await.unwrap());
        assert_eq!(global(&h).await, StatsCounters::new(1, 0));
    }

    #[tokio::test]
    async fn test_overwrite_expires_previous_entry() {
        let h = harness().await;

        h.service
            .create_with_code("dup", "https://a.example.com", false, Some(600))
            .await
            .unwrap();
        h.service
            .create_with_code("dup", "https://b.example.com", false, Some(600))
            .await
            .unwrap();

        assert_eq!(global(&h).await, StatsCounters::new(2, 1));
        assert_eq!(
            h.service.resolve("dup").await.unwrap(),
            "https://b.example.com/"
        );
        assert_eq!(h.scheduler.active_reminders(), 1);
        h.scheduler.shutdown();
    }

    #[tokio::test]
    async fn test_short_ttl_timer_signals_the_entry() {
        let mut h = harness().await;
        let created = h
            .service
            .create("https://example.com", false, Some(1))
            .await
            .unwrap();

        let signal = tokio::time::timeout(std::time::Duration::from_secs(3), h.signals.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(signal.code, created.code);

        assert!(h.service.on_scheduler_fire(signal).await.unwrap());
        assert_eq!(global(&h).await, StatsCounters::new(1, 0));
    }

    #[tokio::test]
    async fn test_arming_failure_keeps_entry_resolvable() {
        let mut reminders = MockReminderRepository::new();
        reminders
            .expect_upsert()
            .times(3)
            .returning(|_| Err(StorageError::Unavailable("down".into())));
        let h = harness_parts(Arc::new(InMemoryEntryRepository::new()), Arc::new(reminders)).await;

        let created = h
            .service
            .create("https://example.com/long", false, Some(600))
            .await
            .unwrap();

        let entry = h.service.get(&created.code).await.unwrap().unwrap();
        assert_eq!(entry.state, EntryState::Created);
        assert!(entry.scheduler.is_none());
        assert_eq!(h.scheduler.active_reminders(), 0);
        assert_eq!(global(&h).await, StatsCounters::new(1, 1));
        assert_eq!(
            h.service.resolve(&created.code).await.unwrap(),
            "https://example.com/long"
        );

        assert!(h.service.on_expire(&created.code).await.unwrap());
        assert_eq!(global(&h).await, StatsCounters::new(1, 0));
    }

    #[tokio::test]
    async fn test_storage_failure_surfaces_on_resolve() {
        let mut repo = MockEntryRepository::new();
        repo.expect_load().returning(|code| {
            let mut e = ShortenedEntry::new(
                code.to_string(),
                "https://example.com/".into(),
                "example.com".into(),
                false,
                600,
                Utc::now(),
            );
            e.state = EntryState::Active;
            Ok(Some(e))
        });
        repo.expect_save()
            .returning(|_| Err(StorageError::Unavailable("down".into())));
        let h = harness_with(Arc::new(repo)).await;

        assert!(matches!(
            h.service.resolve("abc").await,
            Err(LifecycleError::Storage(_))
        ));
        // The in-memory count still advanced.
        assert_eq!(
            h.service.get("abc").await.unwrap().unwrap().invocation_count,
            1
        );
    }
}
