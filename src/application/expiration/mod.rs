//! Expiration scheduling.
//!
//! Every active entry carries exactly one [`SchedulerHandle`]. TTLs below
//! [`crate::domain::entities::DURABLE_TTL_THRESHOLD_SECS`] get a volatile in-process timer that is lost
//! on restart; longer TTLs get a durable reminder (see [`reminders`]) named
//! after the code, which keeps firing every TTL until unregistered.
//!
//! Both mechanisms deliver [`ExpirationSignal`]s over one channel to
//! [`crate::domain::expiration_worker::run_expiration_worker`].

pub mod reminders;

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::domain::entities::{SchedulerHandle, SchedulerKind, reminder_name_for};
use crate::domain::events::ExpirationSignal;
use crate::error::{SchedulingError, StorageError};
use crate::utils::code_generator::generate_ticket;

pub use reminders::ReminderService;

/// Arms and disarms expiration callbacks.
pub struct ExpirationScheduler {
    signals: mpsc::Sender<ExpirationSignal>,
    timers: Arc<DashMap<u64, CancellationToken>>,
    reminders: Arc<ReminderService>,
}

impl ExpirationScheduler {
    pub fn new(signals: mpsc::Sender<ExpirationSignal>, reminders: Arc<ReminderService>) -> Self {
        Self {
            signals,
            timers: Arc::new(DashMap::new()),
            reminders,
        }
    }

    /// Arms a callback for `code` firing after `ttl_seconds`.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulingError`] if a durable reminder could not be
    /// registered after retries. Volatile timers cannot fail.
    pub async fn arm(&self, code: &str, ttl_seconds: u32) -> Result<SchedulerHandle, SchedulingError> {
        let ticket = generate_ticket();
        let ttl = Duration::from_secs(u64::from(ttl_seconds));

        match SchedulerKind::for_ttl(ttl_seconds) {
            SchedulerKind::Volatile => {
                self.start_timer(code, ticket, ttl);
                tracing::debug!(code = %code, ticket, ttl_seconds, "Volatile timer armed");
                Ok(SchedulerHandle {
                    kind: SchedulerKind::Volatile,
                    ticket,
                    reminder_name: None,
                })
            }
            SchedulerKind::Durable => {
                let name = reminder_name_for(code);
                self.reminders.register(&name, code, ticket, ttl).await?;
                tracing::debug!(code = %code, ticket, ttl_seconds, "Durable reminder armed");
                Ok(SchedulerHandle {
                    kind: SchedulerKind::Durable,
                    ticket,
                    reminder_name: Some(name),
                })
            }
        }
    }

    /// Disarms `handle`. Disarming twice, or a handle that already fired,
    /// is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulingError`] if a durable reminder row could not be
    /// deleted. Its ticking task is stopped either way.
    pub async fn disarm(&self, handle: &SchedulerHandle) -> Result<(), SchedulingError> {
        match handle.kind {
            SchedulerKind::Volatile => {
                if let Some((_, token)) = self.timers.remove(&handle.ticket) {
                    token.cancel();
                }
                Ok(())
            }
            SchedulerKind::Durable => {
                if let Some(name) = handle.reminder_name.as_deref() {
                    self.reminders.unregister(name).await?;
                }
                Ok(())
            }
        }
    }

    /// Stops whatever still fires `ticket` for `code` after the entry moved on.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulingError`] if reminder storage fails.
    pub async fn discard_stale(&self, code: &str, ticket: u64) -> Result<(), SchedulingError> {
        if let Some((_, token)) = self.timers.remove(&ticket) {
            token.cancel();
        }
        self.reminders
            .unregister_if_ticket(&reminder_name_for(code), ticket)
            .await?;
        Ok(())
    }

    /// Restarts durable reminders persisted by a previous process.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if reminders cannot be listed.
    pub async fn rehydrate(&self) -> Result<usize, StorageError> {
        self.reminders.rehydrate().await
    }

    /// Number of armed volatile timers.
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Number of running durable reminders.
    pub fn active_reminders(&self) -> usize {
        self.reminders.active_count()
    }

    /// Cancels every timer and reminder task without touching storage.
    pub fn shutdown(&self) {
        for t in self.timers.iter() {
            t.value().cancel();
        }
        self.timers.clear();
        self.reminders.shutdown();
    }

    fn start_timer(&self, code: &str, ticket: u64, ttl: Duration) {
        let cancel = CancellationToken::new();
        self.timers.insert(ticket, cancel.clone());

        let timers = Arc::clone(&self.timers);
        let signals = self.signals.clone();
        let signal = ExpirationSignal {
            code: code.to_string(),
            ticket,
        };

        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(ttl) => {
                    timers.remove(&ticket);
                    if signals.send(signal).await.is_err() {
                        tracing::debug!(ticket, "Expiration channel closed");
                    }
                }
            }
        });
    }
}
