//! PostgreSQL implementation of the counter repository.

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::{StatsCounters, StatsScope};
use crate::domain::repositories::CounterRepository;
use crate::error::StorageError;

/// PostgreSQL repository for statistics counters, one row per scope.
pub struct PgCounterRepository {
    pool: Arc<PgPool>,
}

impl PgCounterRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

fn to_db(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[async_trait]
impl CounterRepository for PgCounterRepository {
    async fn load(&self, scope: &StatsScope) -> Result<StatsCounters, StorageError> {
        let row: Option<(i64, i64)> = sqlx::query_as(
            "SELECT total_activations, active_count FROM stats_counters WHERE scope = $1",
        )
        .bind(scope.key())
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row
            .map(|(total, active)| StatsCounters::new(total.max(0) as u64, active.max(0) as u64))
            .unwrap_or_default())
    }

    async fn store(&self, scope: &StatsScope, counters: StatsCounters) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO stats_counters (scope, total_activations, active_count, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (scope) DO UPDATE SET
                total_activations = EXCLUDED.total_activations,
                active_count = EXCLUDED.active_count,
                updated_at = NOW()
            "#,
        )
        .bind(scope.key())
        .bind(to_db(counters.total_activations))
        .bind(to_db(counters.active_count))
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }
}
