//! Process-local repository implementations.
//!
//! Used when no `DATABASE_URL` is configured and throughout the test suite.
//! State lives in sharded [`DashMap`]s and is lost on restart, so durable
//! reminders only survive restarts with the PostgreSQL backend.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::domain::entities::{ReminderRow, ShortenedEntry, StatsCounters, StatsScope};
use crate::domain::repositories::{CounterRepository, EntryRepository, ReminderRepository};
use crate::error::StorageError;

/// In-memory entry store keyed by code.
#[derive(Debug, Default)]
pub struct InMemoryEntryRepository {
    entries: DashMap<String, ShortenedEntry>,
}

impl InMemoryEntryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntryRepository for InMemoryEntryRepository {
    async fn load(&self, code: &str) -> Result<Option<ShortenedEntry>, StorageError> {
        Ok(self.entries.get(code).map(|e| e.value().clone()))
    }

    async fn save(&self, entry: &ShortenedEntry) -> Result<(), StorageError> {
        self.entries.insert(entry.code.clone(), entry.clone());
        Ok(())
    }

    async fn count_active(&self) -> Result<u64, StorageError> {
        Ok(self.entries.iter().filter(|e| e.is_active()).count() as u64)
    }
}

/// In-memory counters keyed by [`StatsScope::key`].
#[derive(Debug, Default)]
pub struct InMemoryCounterRepository {
    counters: DashMap<String, StatsCounters>,
}

impl InMemoryCounterRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CounterRepository for InMemoryCounterRepository {
    async fn load(&self, scope: &StatsScope) -> Result<StatsCounters, StorageError> {
        Ok(self
            .counters
            .get(&scope.key())
            .map(|c| *c.value())
            .unwrap_or_default())
    }

    async fn store(&self, scope: &StatsScope, counters: StatsCounters) -> Result<(), StorageError> {
        self.counters.insert(scope.key(), counters);
        Ok(())
    }
}

/// In-memory reminders keyed by name.
#[derive(Debug, Default)]
pub struct InMemoryReminderRepository {
    reminders: DashMap<String, ReminderRow>,
}

impl InMemoryReminderRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReminderRepository for InMemoryReminderRepository {
    async fn upsert(&self, reminder: &ReminderRow) -> Result<(), StorageError> {
        self.reminders
            .insert(reminder.name.clone(), reminder.clone());
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<bool, StorageError> {
        Ok(self.reminders.remove(name).is_some())
    }

    async fn find(&self, name: &str) -> Result<Option<ReminderRow>, StorageError> {
        Ok(self.reminders.get(name).map(|r| r.value().clone()))
    }

    async fn list(&self) -> Result<Vec<ReminderRow>, StorageError> {
        let mut rows: Vec<ReminderRow> = self.reminders.iter().map(|r| r.value().clone()).collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }
}
