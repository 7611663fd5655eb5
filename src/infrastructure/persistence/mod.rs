//! Repository implementations.
//!
//! # Repositories
//!
//! - [`InMemoryEntryRepository`], [`InMemoryCounterRepository`],
//!   [`InMemoryReminderRepository`] - process-local, used without a database
//! - [`PgEntryRepository`] - Entry state in PostgreSQL
//! - [`PgCounterRepository`] - Statistics counters in PostgreSQL
//! - [`PgReminderRepository`] - Durable reminders in PostgreSQL
//!
//! The PostgreSQL implementations use runtime-checked queries; the schema
//! lives in `migrations/` and is applied at startup.

pub mod memory;
pub mod pg_counter_repository;
pub mod pg_entry_repository;
pub mod pg_reminder_repository;

pub use memory::{InMemoryCounterRepository, InMemoryEntryRepository, InMemoryReminderRepository};
pub use pg_counter_repository::PgCounterRepository;
pub use pg_entry_repository::PgEntryRepository;
pub use pg_reminder_repository::PgReminderRepository;

use std::sync::Arc;

use sqlx::PgPool;

use crate::domain::repositories::{CounterRepository, EntryRepository, ReminderRepository};

/// The three repositories one running service needs, backed by the same store.
#[derive(Clone)]
pub struct Repositories {
    pub entries: Arc<dyn EntryRepository>,
    pub counters: Arc<dyn CounterRepository>,
    pub reminders: Arc<dyn ReminderRepository>,
}

impl Repositories {
    /// Process-local storage; nothing survives a restart.
    pub fn in_memory() -> Self {
        Self {
            entries: Arc::new(InMemoryEntryRepository::new()),
            counters: Arc::new(InMemoryCounterRepository::new()),
            reminders: Arc::new(InMemoryReminderRepository::new()),
        }
    }

    /// PostgreSQL storage sharing one pool.
    pub fn postgres(pool: Arc<PgPool>) -> Self {
        Self {
            entries: Arc::new(PgEntryRepository::new(Arc::clone(&pool))),
            counters: Arc::new(PgCounterRepository::new(Arc::clone(&pool))),
            reminders: Arc::new(PgReminderRepository::new(pool)),
        }
    }
}
