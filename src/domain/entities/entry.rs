//! Shortened entry entity and its lifecycle state.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};

/// TTLs strictly below this many seconds use a volatile timer,
/// everything else a durable reminder.
pub const DURABLE_TTL_THRESHOLD_SECS: u32 = 60;

/// TTL applied when the caller passes none or zero.
pub const DEFAULT_TTL_SECS: u32 = 60;

/// Lifecycle state of an entry.
///
/// `Created` and `Active` both resolve normally. `Created` means the entry was
/// stored without a live scheduler handle. `Expired` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Created,
    Active,
    Expired,
}

impl EntryState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryState::Created => "created",
            EntryState::Active => "active",
            EntryState::Expired => "expired",
        }
    }
}

impl fmt::Display for EntryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(EntryState::Created),
            "active" => Ok(EntryState::Active),
            "expired" => Ok(EntryState::Expired),
            other => Err(format!("unknown entry state '{other}'")),
        }
    }
}

/// Mechanism backing a scheduler handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerKind {
    Volatile,
    Durable,
}

impl SchedulerKind {
    /// Picks the mechanism for a TTL.
    pub fn for_ttl(ttl_seconds: u32) -> Self {
        if ttl_seconds < DURABLE_TTL_THRESHOLD_SECS {
            SchedulerKind::Volatile
        } else {
            SchedulerKind::Durable
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SchedulerKind::Volatile => "volatile",
            SchedulerKind::Durable => "durable",
        }
    }
}

impl FromStr for SchedulerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "volatile" => Ok(SchedulerKind::Volatile),
            "durable" => Ok(SchedulerKind::Durable),
            other => Err(format!("unknown scheduler kind '{other}'")),
        }
    }
}

/// Reference to an armed expiration callback.
///
/// `ticket` is unique per arming; signals carrying a different ticket belong
/// to an earlier incarnation of the entry and are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerHandle {
    pub kind: SchedulerKind,
    pub ticket: u64,
    pub reminder_name: Option<String>,
}

/// One shortened code and its lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub struct ShortenedEntry {
    pub code: String,
    pub target_url: String,
    pub domain: String,
    pub one_shot: bool,
    pub ttl_seconds: u32,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub invocation_count: u64,
    pub state: EntryState,
    pub scheduler: Option<SchedulerHandle>,
}

impl ShortenedEntry {
    /// Builds a fresh entry in state [`EntryState::Created`].
    pub fn new(
        code: String,
        target_url: String,
        domain: String,
        one_shot: bool,
        ttl_seconds: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            code,
            target_url,
            domain,
            one_shot,
            ttl_seconds,
            created_at: now,
            expires_at: now + Duration::seconds(i64::from(ttl_seconds)),
            invocation_count: 0,
            state: EntryState::Created,
            scheduler: None,
        }
    }

    /// True until the entry reaches the terminal state.
    pub fn is_active(&self) -> bool {
        self.state != EntryState::Expired
    }

    /// True strictly after `expires_at`.
    pub fn is_past_expiry(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Name of the durable reminder, if one backs this entry.
    pub fn reminder_name(&self) -> Option<&str> {
        self.scheduler
            .as_ref()
            .and_then(|h| h.reminder_name.as_deref())
    }

    /// Moves the entry to the terminal state and drops its handle.
    pub fn mark_expired(&mut self) {
        self.state = EntryState::Expired;
        self.scheduler = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(ttl: u32) -> ShortenedEntry {
        ShortenedEntry::new(
            "abc123".to_string(),
            "https://example.com/".to_string(),
            "example.com".to_string(),
            false,
            ttl,
            Utc::now(),
        )
    }

    #[test]
    fn test_new_entry_is_created_and_active() {
        let e = entry(60);

        assert_eq!(e.state, EntryState::Created);
        assert!(e.is_active());
        assert_eq!(e.invocation_count, 0);
        assert_eq!(e.expires_at - e.created_at, Duration::seconds(60));
        assert!(e.reminder_name().is_none());
    }

    #[test]
    fn test_expiry_is_strictly_after_deadline() {
        let e = entry(10);

        assert!(!e.is_past_expiry(e.expires_at));
        assert!(e.is_past_expiry(e.expires_at + Duration::milliseconds(1)));
    }

    #[test]
    fn test_mark_expired_is_terminal_and_clears_handle() {
        let mut e = entry(120);
        e.state = EntryState::Active;
        e.scheduler = Some(SchedulerHandle {
            kind: SchedulerKind::Durable,
            ticket: 7,
            reminder_name: Some("expire:abc123".to_string()),
        });
        assert_eq!(e.reminder_name(), Some("expire:abc123"));

        e.mark_expired();

        assert!(!e.is_active());
        assert!(e.scheduler.is_none());
    }

    #[test]
    fn test_scheduler_kind_threshold() {
        assert_eq!(SchedulerKind::for_ttl(1), SchedulerKind::Volatile);
        assert_eq!(SchedulerKind::for_ttl(59), SchedulerKind::Volatile);
        assert_eq!(SchedulerKind::for_ttl(60), SchedulerKind::Durable);
        assert_eq!(SchedulerKind::for_ttl(86_400), SchedulerKind::Durable);
    }

    #[test]
    fn test_state_parse() {
        assert_eq!("active".parse::<EntryState>(), Ok(EntryState::Active));
        assert_eq!(EntryState::Expired.to_string(), "expired");
        assert!("gone".parse::<EntryState>().is_err());
        assert_eq!("durable".parse::<SchedulerKind>(), Ok(SchedulerKind::Durable));
    }
}
