//! Durable periodic reminders.
//!
//! A reminder is a persisted row plus an in-process ticking task. The row is
//! what survives a restart; [`ReminderService::rehydrate`] restarts the
//! ticking tasks from it.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_retry::Retry;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tokio_util::sync::CancellationToken;

use crate::domain::entities::ReminderRow;
use crate::domain::events::ExpirationSignal;
use crate::domain::repositories::ReminderRepository;
use crate::error::{SchedulingError, StorageError};

struct Ticking {
    ticket: u64,
    cancel: CancellationToken,
}

/// Registers, ticks and unregisters named periodic callbacks.
pub struct ReminderService {
    repository: Arc<dyn ReminderRepository>,
    signals: mpsc::Sender<ExpirationSignal>,
    tasks: DashMap<String, Ticking>,
    retry_attempts: usize,
}

impl ReminderService {
    /// `retry_attempts` is the total number of tries for each storage write.
    pub fn new(
        repository: Arc<dyn ReminderRepository>,
        signals: mpsc::Sender<ExpirationSignal>,
        retry_attempts: usize,
    ) -> Self {
        Self {
            repository,
            signals,
            tasks: DashMap::new(),
            retry_attempts: retry_attempts.max(1),
        }
    }

    /// Registers or replaces the reminder `name`, firing every `period`
    /// starting one period from now.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulingError::RegistrationFailed`] once every storage
    /// attempt failed. No ticking task is started in that case.
    pub async fn register(
        &self,
        name: &str,
        code: &str,
        ticket: u64,
        period: Duration,
    ) -> Result<(), SchedulingError> {
        let row = ReminderRow {
            name: name.to_string(),
            code: code.to_string(),
            ticket,
            period_seconds: period.as_secs().max(1),
            registered_at: Utc::now(),
        };

        self.persist_with_retry(&row)
            .await
            .map_err(|source| SchedulingError::RegistrationFailed {
                name: name.to_string(),
                attempts: self.retry_attempts,
                source,
            })?;

        self.start_ticking(&row, period);
        tracing::debug!(reminder = %name, code = %code, ticket, "Reminder registered");
        Ok(())
    }

    /// Stops the reminder and deletes its row. Returns `false` if nothing was
    /// registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulingError::UnregistrationFailed`] if the row could not
    /// be deleted. The ticking task is stopped regardless.
    pub async fn unregister(&self, name: &str) -> Result<bool, SchedulingError> {
        let stopped = self.stop_ticking(name);

        let deleted = self.repository.delete(name).await.map_err(|source| {
            SchedulingError::UnregistrationFailed {
                name: name.to_string(),
                source,
            }
        })?;

        if stopped || deleted {
            tracing::debug!(reminder = %name, "Reminder unregistered");
        }
        Ok(stopped || deleted)
    }

    /// Unregisters `name` only if it still carries `ticket`.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulingError`] if storage could not be read or updated.
    pub async fn unregister_if_ticket(&self, name: &str, ticket: u64) -> Result<bool, SchedulingError> {
        let stored = self.repository.find(name).await.map_err(|source| {
            SchedulingError::UnregistrationFailed {
                name: name.to_string(),
                source,
            }
        })?;

        let running = self.tasks.get(name).map(|t| t.ticket);
        let matches = stored.as_ref().is_some_and(|r| r.ticket == ticket)
            || (stored.is_none() && running == Some(ticket));

        if matches {
            self.unregister(name).await
        } else {
            Ok(false)
        }
    }

    /// Restarts ticking tasks for every persisted reminder.
    ///
    /// The first firing lands on the next period boundary since
    /// registration, or immediately if one was missed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the reminders cannot be listed.
    pub async fn rehydrate(&self) -> Result<usize, StorageError> {
        let rows = self.repository.list().await?;
        let now = Utc::now();

        for row in &rows {
            self.start_ticking(row, row.next_fire_in(now));
        }

        tracing::info!(count = rows.len(), "Reminders rehydrated");
        Ok(rows.len())
    }

    /// Number of reminders with a running ticking task.
    pub fn active_count(&self) -> usize {
        self.tasks.len()
    }

    /// Cancels every ticking task without touching storage.
    pub fn shutdown(&self) {
        for t in self.tasks.iter() {
            t.cancel.cancel();
        }
        self.tasks.clear();
    }

    async fn persist_with_retry(&self, row: &ReminderRow) -> Result<(), StorageError> {
        let strategy = ExponentialBackoff::from_millis(10)
            .max_delay(Duration::from_secs(1))
            .map(jitter)
            .take(self.retry_attempts - 1);

        Retry::spawn(strategy, || async {
            self.repository.upsert(row).await.inspect_err(|e| {
                tracing::warn!(reminder = %row.name, error = %e, "Reminder write failed");
            })
        })
        .await
    }

    fn start_ticking(&self, row: &ReminderRow, first_delay: Duration) {
        let cancel = CancellationToken::new();
        let previous = self.tasks.insert(
            row.name.clone(),
            Ticking {
                ticket: row.ticket,
                cancel: cancel.clone(),
            },
        );
        if let Some(previous) = previous {
            previous.cancel.cancel();
        }

        let period = Duration::from_secs(row.period_seconds.max(1));
        let signal = ExpirationSignal {
            code: row.code.clone(),
            ticket: row.ticket,
        };
        let signals = self.signals.clone();
        let name = row.name.clone();

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + first_delay, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        tracing::debug!(reminder = %name, "Reminder fired");
                        if signals.send(signal.clone()).await.is_err() {
                            tracing::debug!(reminder = %name, "Expiration channel closed");
                            break;
                        }
                    }
                }
            }
        });
    }

    fn stop_ticking(&self, name: &str) -> bool {
        match self.tasks.remove(name) {
            Some((_, t)) => {
                t.cancel.cancel();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::reminder_name_for;
    use crate::domain::repositories::MockReminderRepository;
    use crate::infrastructure::persistence::InMemoryReminderRepository;

    fn service(
        repo: Arc<dyn ReminderRepository>,
    ) -> (ReminderService, mpsc::Receiver<ExpirationSignal>) {
        let (tx, rx) = mpsc::channel(16);
        (ReminderService::new(repo, tx, 3), rx)
    }

    #[tokio::test]
    async fn test_register_persists_and_unregister_removes() {
        let repo = Arc::new(InMemoryReminderRepository::new());
        let (svc, _rx) = service(repo.clone());
        let name = reminder_name_for("abc");

        svc.register(&name, "abc", 5, Duration::from_secs(60))
            .await
            .unwrap();

        let row = repo.find(&name).await.unwrap().unwrap();
        assert_eq!(row.ticket, 5);
        assert_eq!(row.period_seconds, 60);
        assert_eq!(svc.active_count(), 1);

        assert!(svc.unregister(&name).await.unwrap());
        assert!(!svc.unregister(&name).await.unwrap());
        assert_eq!(svc.active_count(), 0);
        assert!(repo.find(&name).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_register_replaces_existing() {
        let repo = Arc::new(InMemoryReminderRepository::new());
        let (svc, _rx) = service(repo.clone());
        let name = reminder_name_for("abc");

        svc.register(&name, "abc", 1, Duration::from_secs(60))
            .await
            .unwrap();
        svc.register(&name, "abc", 2, Duration::from_secs(90))
            .await
            .unwrap();

        assert_eq!(svc.active_count(), 1);
        assert_eq!(repo.find(&name).await.unwrap().unwrap().ticket, 2);
        assert!(!svc.unregister_if_ticket(&name, 1).await.unwrap());
        assert!(svc.unregister_if_ticket(&name, 2).await.unwrap());
    }

    #[tokio::test]
    async fn test_register_retries_then_fails() {
        let mut repo = MockReminderRepository::new();
        repo.expect_upsert()
            .times(3)
            .returning(|_| Err(StorageError::Unavailable("down".into())));
        let (svc, _rx) = service(Arc::new(repo));

        let err = svc
            .register("expire:abc", "abc", 1, Duration::from_secs(60))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SchedulingError::RegistrationFailed { attempts: 3, .. }
        ));
        assert_eq!(svc.active_count(), 0);
    }

    #[tokio::test]
    async fn test_register_recovers_after_transient_failure() {
        let mut repo = MockReminderRepository::new();
        let mut seq = mockall::Sequence::new();
        repo.expect_upsert()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(StorageError::Unavailable("blip".into())));
        repo.expect_upsert()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        let (svc, _rx) = service(Arc::new(repo));

        svc.register("expire:abc", "abc", 1, Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(svc.active_count(), 1);
        svc.shutdown();
    }

    #[tokio::test]
    async fn test_rehydrate_fires_overdue_reminders_immediately() {
        let repo = Arc::new(InMemoryReminderRepository::new());
        repo.upsert(&ReminderRow {
            name: reminder_name_for("old"),
            code: "old".into(),
            ticket: 42,
            period_seconds: 60,
            registered_at: Utc::now() - chrono::Duration::seconds(300),
        })
        .await
        .unwrap();
        let (svc, mut rx) = service(repo);

        assert_eq!(svc.rehydrate().await.unwrap(), 1);

        let signal = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(signal.code, "old");
        assert_eq!(signal.ticket, 42);
        svc.shutdown();
    }
}
