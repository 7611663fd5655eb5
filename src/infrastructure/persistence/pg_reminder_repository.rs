//! PostgreSQL implementation of the reminder repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::ReminderRow;
use crate::domain::repositories::ReminderRepository;
use crate::error::StorageError;

/// PostgreSQL repository for durable reminders.
pub struct PgReminderRepository {
    pool: Arc<PgPool>,
}

impl PgReminderRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct DbReminder {
    name: String,
    code: String,
    ticket: i64,
    period_seconds: i64,
    registered_at: DateTime<Utc>,
}

impl From<DbReminder> for ReminderRow {
    fn from(row: DbReminder) -> Self {
        ReminderRow {
            name: row.name,
            code: row.code,
            ticket: row.ticket as u64,
            period_seconds: row.period_seconds.max(0) as u64,
            registered_at: row.registered_at,
        }
    }
}

#[async_trait]
impl ReminderRepository for PgReminderRepository {
    async fn upsert(&self, reminder: &ReminderRow) -> Result<(), StorageError> {
        let period = i64::try_from(reminder.period_seconds).map_err(|_| {
            StorageError::InvalidData(format!("period {}", reminder.period_seconds))
        })?;

        sqlx::query(
            r#"
            INSERT INTO reminders (name, code, ticket, period_seconds, registered_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (name) DO UPDATE SET
                code = EXCLUDED.code,
                ticket = EXCLUDED.ticket,
                period_seconds = EXCLUDED.period_seconds,
                registered_at = EXCLUDED.registered_at
            "#,
        )
        .bind(&reminder.name)
        .bind(&reminder.code)
        .bind(reminder.ticket as i64)
        .bind(period)
        .bind(reminder.registered_at)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM reminders WHERE name = $1")
            .bind(name)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find(&self, name: &str) -> Result<Option<ReminderRow>, StorageError> {
        let row = sqlx::query_as::<_, DbReminder>(
            "SELECT name, code, ticket, period_seconds, registered_at FROM reminders WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(ReminderRow::from))
    }

    async fn list(&self) -> Result<Vec<ReminderRow>, StorageError> {
        let rows = sqlx::query_as::<_, DbReminder>(
            "SELECT name, code, ticket, period_seconds, registered_at FROM reminders ORDER BY name",
        )
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.into_iter().map(ReminderRow::from).collect())
    }
}
