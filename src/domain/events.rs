//! Values exchanged between entries, the observer registry and schedulers.

use std::fmt;

/// Kind of a lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    New,
    Expired,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::New => f.write_str("new"),
            EventKind::Expired => f.write_str("expired"),
        }
    }
}

/// Event published by an entry to the observer registry.
///
/// Carries values only; observers never get a reference back into the entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleEvent {
    pub kind: EventKind,
    pub code: String,
    pub domain: String,
}

impl LifecycleEvent {
    pub fn new_entry(code: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            kind: EventKind::New,
            code: code.into(),
            domain: domain.into(),
        }
    }

    pub fn expired(code: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Expired,
            code: code.into(),
            domain: domain.into(),
        }
    }
}

/// A scheduler firing for one armed handle.
///
/// Sent from timers and reminders to
/// [`crate::domain::expiration_worker::run_expiration_worker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpirationSignal {
    pub code: String,
    pub ticket: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_constructors() {
        let new = LifecycleEvent::new_entry("abc", "example.com");
        let expired = LifecycleEvent::expired("abc", "example.com");

        assert_eq!(new.kind, EventKind::New);
        assert_eq!(expired.kind, EventKind::Expired);
        assert_eq!(new.domain, expired.domain);
        assert_eq!(EventKind::Expired.to_string(), "expired");
    }
}
