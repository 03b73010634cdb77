//! PostgreSQL counter store
//!
//! One `INSERT ... ON CONFLICT DO UPDATE ... RETURNING` statement creates,
//! resets or increments the bucket and reads it back. The row lock taken by
//! the upsert serializes concurrent requests on the same key.

use sqlx::PgPool;
use std::time::Duration;

use crate::domain::decision::CounterSnapshot;
use crate::domain::repository::CounterStore;
use crate::error::RateLimitResult;

#[derive(Clone)]
pub struct PgCounterStore {
    pool: PgPool,
}

impl PgCounterStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Delete buckets whose window has passed.
    pub async fn cleanup_expired(&self) -> RateLimitResult<u64> {
        let result = sqlx::query("DELETE FROM rate_limit_counters WHERE expires_at <= now()")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

impl CounterStore for PgCounterStore {
    async fn increment(&self, key: &str, ttl: Duration) -> RateLimitResult<CounterSnapshot> {
        let row = sqlx::query_as::<_, (i64, i64)>(
            r#"
            INSERT INTO rate_limit_counters (key, count, expires_at)
            VALUES ($1, 1, now() + make_interval(secs => $2))
            ON CONFLICT (key) DO UPDATE SET
                count = CASE
                    WHEN rate_limit_counters.expires_at <= now() THEN 1
                    ELSE rate_limit_counters.count + 1
                END,
                expires_at = CASE
                    WHEN rate_limit_counters.expires_at <= now() THEN EXCLUDED.expires_at
                    ELSE rate_limit_counters.expires_at
                END
            RETURNING
                count,
                GREATEST(ROUND(EXTRACT(EPOCH FROM (expires_at - now()))), 0)::BIGINT
            "#,
        )
        .bind(key)
        .bind(ttl.as_secs().max(1) as f64)
        .fetch_one(&self.pool)
        .await?;

        Ok(CounterSnapshot::new(row.0, row.1))
    }
}

impl std::fmt::Debug for PgCounterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgCounterStore").finish_non_exhaustive()
    }
}
