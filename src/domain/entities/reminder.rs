//! Durable reminder record.

use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};

/// Name under which the durable reminder for `code` is registered.
///
/// Derived only from the code, so a reminder can be found after a restart
/// before the entry itself has been loaded.
pub fn reminder_name_for(code: &str) -> String {
    format!("expire:{code}")
}

/// A persisted periodic callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderRow {
    pub name: String,
    pub code: String,
    pub ticket: u64,
    pub period_seconds: u64,
    pub registered_at: DateTime<Utc>,
}

impl ReminderRow {
    /// Delay until the next firing at or after `now`.
    ///
    /// Firings happen at `registered_at + k * period` for `k >= 1`. Returns
    /// zero when `now` sits exactly on a boundary or the period is zero.
    pub fn next_fire_in(&self, now: DateTime<Utc>) -> StdDuration {
        let period_ms = self.period_seconds.saturating_mul(1000);
        if period_ms == 0 {
            return StdDuration::ZERO;
        }

        let elapsed_ms = (now - self.registered_at).num_milliseconds();
        if elapsed_ms < 0 {
            let until_registration = elapsed_ms.unsigned_abs();
            return StdDuration::from_millis(until_registration.saturating_add(period_ms));
        }

        let elapsed_ms = elapsed_ms as u64;
        if elapsed_ms < period_ms {
            return StdDuration::from_millis(period_ms - elapsed_ms);
        }

        // Overdue: the first missed firing is delivered immediately.
        StdDuration::ZERO
    }
}
