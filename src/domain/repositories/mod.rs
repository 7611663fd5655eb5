//! Repository trait definitions for the domain layer.
//!
//! These traits are the persistence boundary. Implementations live in
//! `crate::infrastructure::persistence`; mocks are generated with `mockall`.
//!
//! # Available Repositories
//!
//! - [`EntryRepository`] - Entry state keyed by code
//! - [`CounterRepository`] - Statistics counters keyed by scope
//! - [`ReminderRepository`] - Durable expiration reminders keyed by name

pub mod counter_repository;
pub mod entry_repository;
pub mod reminder_repository;

pub use counter_repository::CounterRepository;
pub use entry_repository::EntryRepository;
pub use reminder_repository::ReminderRepository;

#[cfg(test)]
pub use counter_repository::MockCounterRepository;
#[cfg(test)]
pub use entry_repository::MockEntryRepository;
#[cfg(test)]
pub use reminder_repository::MockReminderRepository;
