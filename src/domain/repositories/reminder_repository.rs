//! Repository trait for durable reminders.

use crate::domain::entities::ReminderRow;
use crate::error::StorageError;
use async_trait::async_trait;

/// Persists durable reminders by name so they survive restarts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReminderRepository: Send + Sync {
    /// Inserts the reminder or replaces the one with the same name.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on backend failure.
    async fn upsert(&self, reminder: &ReminderRow) -> Result<(), StorageError>;

    /// Removes the reminder. Returns `false` if no reminder had that name.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on backend failure.
    async fn delete(&self, name: &str) -> Result<bool, StorageError>;

    /// Looks up a reminder by name.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on backend failure.
    async fn find(&self, name: &str) -> Result<Option<ReminderRow>, StorageError>;

    /// Lists every registered reminder.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on backend failure.
    async fn list(&self) -> Result<Vec<ReminderRow>, StorageError>;
}
