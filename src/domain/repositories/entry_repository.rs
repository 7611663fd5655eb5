//! Repository trait for entry state.

use crate::domain::entities::ShortenedEntry;
use crate::error::StorageError;
use async_trait::async_trait;

/// Durable key-value store for entries, keyed by code.
///
/// Entries are never hard-deleted; expired entries stay readable.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::InMemoryEntryRepository`] - process-local map
/// - [`crate::infrastructure::persistence::PgEntryRepository`] - PostgreSQL implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EntryRepository: Send + Sync {
    /// Loads the entry stored under `code`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend fails or the stored row is invalid.
    async fn load(&self, code: &str) -> Result<Option<ShortenedEntry>, StorageError>;

    /// Inserts or overwrites the entry stored under `entry.code`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend fails.
    async fn save(&self, entry: &ShortenedEntry) -> Result<(), StorageError>;

    /// Counts stored entries that are not yet expired.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend fails.
    async fn count_active(&self) -> Result<u64, StorageError>;
}
