//! PostgreSQL implementation of the entry repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::{SchedulerHandle, ShortenedEntry};
use crate::domain::repositories::EntryRepository;
use crate::error::StorageError;

/// PostgreSQL repository for entry state.
///
/// Saves are upserts keyed by code, so re-creating a code overwrites the row.
pub struct PgEntryRepository {
    pool: Arc<PgPool>,
}

impl PgEntryRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct EntryRow {
    code: String,
    target_url: String,
    domain: String,
    one_shot: bool,
    ttl_seconds: i32,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    invocation_count: i64,
    state: String,
    scheduler_kind: Option<String>,
    scheduler_ticket: Option<i64>,
    reminder_name: Option<String>,
}

impl TryFrom<EntryRow> for ShortenedEntry {
    type Error = StorageError;

    fn try_from(row: EntryRow) -> Result<Self, Self::Error> {
        let state = row.state.parse().map_err(StorageError::InvalidData)?;

        let scheduler = match (row.scheduler_kind, row.scheduler_ticket) {
            (Some(kind), Some(ticket)) => Some(SchedulerHandle {
                kind: kind.parse().map_err(StorageError::InvalidData)?,
                ticket: ticket as u64,
                reminder_name: row.reminder_name,
            }),
            _ => None,
        };

        Ok(ShortenedEntry {
            code: row.code,
            target_url: row.target_url,
            domain: row.domain,
            one_shot: row.one_shot,
            ttl_seconds: u32::try_from(row.ttl_seconds)
                .map_err(|_| StorageError::InvalidData(format!("ttl {}", row.ttl_seconds)))?,
            created_at: row.created_at,
            expires_at: row.expires_at,
            invocation_count: row.invocation_count.max(0) as u64,
            state,
            scheduler,
        })
    }
}

#[async_trait]
impl EntryRepository for PgEntryRepository {
    async fn load(&self, code: &str) -> Result<Option<ShortenedEntry>, StorageError> {
        let row = sqlx::query_as::<_, EntryRow>(
            r#"
            SELECT code, target_url, domain, one_shot, ttl_seconds, created_at, expires_at,
                   invocation_count, state, scheduler_kind, scheduler_ticket, reminder_name
            FROM entries
            WHERE code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.map(ShortenedEntry::try_from).transpose()
    }

    async fn save(&self, entry: &ShortenedEntry) -> Result<(), StorageError> {
        let ttl = i32::try_from(entry.ttl_seconds)
            .map_err(|_| StorageError::InvalidData(format!("ttl {}", entry.ttl_seconds)))?;
        // Tickets are opaque; the bit pattern round-trips through BIGINT.
        let ticket = entry.scheduler.as_ref().map(|h| h.ticket as i64);
        let kind = entry.scheduler.as_ref().map(|h| h.kind.as_str());

        sqlx::query(
            r#"
            INSERT INTO entries (code, target_url, domain, one_shot, ttl_seconds, created_at,
                                 expires_at, invocation_count, state, scheduler_kind,
                                 scheduler_ticket, reminder_name, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, NOW())
            ON CONFLICT (code) DO UPDATE SET
                target_url = EXCLUDED.target_url,
                domain = EXCLUDED.domain,
                one_shot = EXCLUDED.one_shot,
                ttl_seconds = EXCLUDED.ttl_seconds,
                created_at = EXCLUDED.created_at,
                expires_at = EXCLUDED.expires_at,
                invocation_count = EXCLUDED.invocation_count,
                state = EXCLUDED.state,
                scheduler_kind = EXCLUDED.scheduler_kind,
                scheduler_ticket = EXCLUDED.scheduler_ticket,
                reminder_name = EXCLUDED.reminder_name,
                updated_at = NOW()
            "#,
        )
        .bind(&entry.code)
        .bind(&entry.target_url)
        .bind(&entry.domain)
        .bind(entry.one_shot)
        .bind(ttl)
        .bind(entry.created_at)
        .bind(entry.expires_at)
        .bind(i64::try_from(entry.invocation_count).unwrap_or(i64::MAX))
        .bind(entry.state.as_str())
        .bind(kind)
        .bind(ticket)
        .bind(entry.reminder_name())
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn count_active(&self) -> Result<u64, StorageError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM entries WHERE state <> 'expired'")
                .fetch_one(self.pool.as_ref())
                .await?;

        Ok(count.max(0) as u64)
    }
}
