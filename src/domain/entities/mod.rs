//! Core domain entities.
//!
//! # Entity Types
//!
//! - [`ShortenedEntry`] - One short code, its target and lifecycle state
//! - [`StatsCounters`] - Activation counters for a [`StatsScope`]
//! - [`ReminderRow`] - A persisted periodic expiration callback
//!
//! Entities are plain data with a few state helpers; the lifecycle rules live
//! in [`crate::application::services::EntryService`].

pub mod counters;
pub mod entry;
pub mod reminder;

pub use counters::{StatsCounters, StatsScope};
pub use entry::{
    DEFAULT_TTL_SECS, DURABLE_TTL_THRESHOLD_SECS, EntryState, SchedulerHandle, SchedulerKind,
    ShortenedEntry,
};
pub use reminder::{ReminderRow, reminder_name_for};
