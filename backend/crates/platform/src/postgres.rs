//! PostgreSQL-backed [`KvStore`]
//!
//! Tables are UNLOGGED: the data is a shared cache of counters and windows,
//! not a system of record. Every operation is a single statement so the
//! atomicity of each call is that of one PostgreSQL statement.

use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;

use crate::kv::{KvStore, StoreResult, expiry_ms};

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgKvStore {
    pool: PgPool,
}

impl PgKvStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Delete expired rows from every table
    pub async fn cleanup_expired(&self) -> StoreResult<(u64, u64, u64)> {
        let now_ms = Utc::now().timestamp_millis();

        let counters = sqlx::query("DELETE FROM kv_counters WHERE expires_at_ms <= $1")
            .bind(now_ms)
            .execute(&self.pool)
            .await?
            .rows_affected();

        let values = sqlx::query("DELETE FROM kv_values WHERE expires_at_ms <= $1")
            .bind(now_ms)
            .execute(&self.pool)
            .await?
            .rows_affected();

        let window_entries = sqlx::query("DELETE FROM kv_window_entries WHERE expires_at_ms <= $1")
            .bind(now_ms)
            .execute(&self.pool)
            .await?
            .rows_affected();

        tracing::info!(
            counters = counters,
            values = values,
            window_entries = window_entries,
            "Cleaned up expired store entries"
        );

        Ok((counters, values, window_entries))
    }
}

impl KvStore for PgKvStore {
    async fn get_counter(&self, key: &str) -> StoreResult<Option<i64>> {
        let now_ms = Utc::now().timestamp_millis();

        let value = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT counter_value
            FROM kv_counters
            WHERE counter_key = $1
              AND (expires_at_ms IS NULL OR expires_at_ms > $2)
            "#,
        )
        .bind(key)
        .bind(now_ms)
        .fetch_optional(&self.pool)
        .await?;

        Ok(value)
    }

    async fn incr_by(&self, key: &str, delta: i64, ttl: Option<Duration>) -> StoreResult<i64> {
        let now_ms = Utc::now().timestamp_millis();

        // An expired row restarts from 0 and drops its old expiry.
        let value = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO kv_counters (counter_key, counter_value, expires_at_ms)
            VALUES ($1, $2, $3)
            ON CONFLICT (counter_key) DO UPDATE SET
                counter_value = CASE
                    WHEN kv_counters.expires_at_ms IS NOT NULL AND kv_counters.expires_at_ms <= $4
                        THEN EXCLUDED.counter_value
                    ELSE kv_counters.counter_value + EXCLUDED.counter_value
                END,
                expires_at_ms = CASE
                    WHEN EXCLUDED.expires_at_ms IS NOT NULL THEN EXCLUDED.expires_at_ms
                    WHEN kv_counters.expires_at_ms IS NOT NULL AND kv_counters.expires_at_ms <= $4
                        THEN NULL
                    ELSE kv_counters.expires_at_ms
                END
            RETURNING counter_value
            "#,
        )
        .bind(key)
        .bind(delta)
        .bind(expiry_ms(now_ms, ttl))
        .bind(now_ms)
        .fetch_one(&self.pool)
        .await?;

        Ok(value)
    }

    async fn incr_by_capped(
        &self,
        key: &str,
        delta: i64,
        cap: i64,
        ttl: Option<Duration>,
    ) -> StoreResult<Option<i64>> {
        let now_ms = Utc::now().timestamp_millis();

        // No row comes back when either the fresh insert or the conflicting
        // update would push the counter past the cap.
        let value = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO kv_counters (counter_key, counter_value, expires_at_ms)
            SELECT $1::TEXT, $2::BIGINT, $3::BIGINT
            WHERE $2::BIGINT <= $5::BIGINT
            ON CONFLICT (counter_key) DO UPDATE SET
                counter_value = CASE
                    WHEN kv_counters.expires_at_ms IS NOT NULL AND kv_counters.expires_at_ms <= $4
                        THEN EXCLUDED.counter_value
                    ELSE kv_counters.counter_value + EXCLUDED.counter_value
                END,
                expires_at_ms = CASE
                    WHEN EXCLUDED.expires_at_ms IS NOT NULL THEN EXCLUDED.expires_at_ms
                    WHEN kv_counters.expires_at_ms IS NOT NULL AND kv_counters.expires_at_ms <= $4
                        THEN NULL
                    ELSE kv_counters.expires_at_ms
                END
            WHERE CASE
                    WHEN kv_counters.expires_at_ms IS NOT NULL AND kv_counters.expires_at_ms <= $4
                        THEN 0
                    ELSE kv_counters.counter_value
                END + EXCLUDED.counter_value <= $5::BIGINT
            RETURNING counter_value
            "#,
        )
        .bind(key)
        .bind(delta)
        .bind(expiry_ms(now_ms, ttl))
        .bind(now_ms)
        .bind(cap)
        .fetch_optional(&self.pool)
        .await?;

        Ok(value)
    }

    async fn get_value(&self, key: &str) -> StoreResult<Option<String>> {
        let now_ms = Utc::now().timestamp_millis();

        let value = sqlx::query_scalar::<_, String>(
            r#"
            SELECT value_text
            FROM kv_values
            WHERE value_key = $1
              AND (expires_at_ms IS NULL OR expires_at_ms > $2)
            "#,
        )
        .bind(key)
        .bind(now_ms)
        .fetch_optional(&self.pool)
        .await?;

        Ok(value)
    }

    async fn set_value(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()> {
        let now_ms = Utc::now().timestamp_millis();

        sqlx::query(
            r#"
            INSERT INTO kv_values (value_key, value_text, expires_at_ms)
            VALUES ($1, $2, $3)
            ON CONFLICT (value_key) DO UPDATE SET
                value_text = EXCLUDED.value_text,
                expires_at_ms = EXCLUDED.expires_at_ms
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(expiry_ms(now_ms, ttl))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let removed = sqlx::query_scalar::<_, i64>(
            r#"
            WITH c AS (DELETE FROM kv_counters WHERE counter_key = $1 RETURNING 1),
                 v AS (DELETE FROM kv_values WHERE value_key = $1 RETURNING 1),
                 w AS (DELETE FROM kv_window_entries WHERE window_key = $1 RETURNING 1)
            SELECT (SELECT COUNT(*) FROM c) + (SELECT COUNT(*) FROM v) + (SELECT COUNT(*) FROM w)
            "#,
        )
        .bind(key)
        .fetch_one(&self.pool)
        .await?;

        Ok(removed > 0)
    }

    async fn window_insert(
        &self,
        key: &str,
        member: &str,
        score: i64,
        ttl: Option<Duration>,
    ) -> StoreResult<()> {
        let now_ms = Utc::now().timestamp_millis();

        sqlx::query(
            r#"
            WITH refreshed AS (
                UPDATE kv_window_entries
                SET expires_at_ms = $4::BIGINT
                WHERE window_key = $1 AND member <> $2 AND $4::BIGINT IS NOT NULL
            )
            INSERT INTO kv_window_entries (window_key, member, score, expires_at_ms)
            VALUES ($1, $2, $3, $4::BIGINT)
            ON CONFLICT (window_key, member) DO UPDATE SET
                score = EXCLUDED.score,
                expires_at_ms = COALESCE(EXCLUDED.expires_at_ms, kv_window_entries.expires_at_ms)
            "#,
        )
        .bind(key)
        .bind(member)
        .bind(score)
        .bind(expiry_ms(now_ms, ttl))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn window_trim_count(&self, key: &str, window_start: i64) -> StoreResult<u64> {
        let now_ms = Utc::now().timestamp_millis();

        // The outer SELECT sees the pre-delete snapshot, hence the repeated filter.
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            WITH trimmed AS (
                DELETE FROM kv_window_entries
                WHERE window_key = $1
                  AND (score <= $2 OR (expires_at_ms IS NOT NULL AND expires_at_ms <= $3))
            )
            SELECT COUNT(*)
            FROM kv_window_entries
            WHERE window_key = $1
              AND score > $2
              AND (expires_at_ms IS NULL OR expires_at_ms > $3)
            "#,
        )
        .bind(key)
        .bind(window_start)
        .bind(now_ms)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.max(0) as u64)
    }

    async fn window_count(&self, key: &str, window_start: i64) -> StoreResult<u64> {
        let now_ms = Utc::now().timestamp_millis();

        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM kv_window_entries
            WHERE window_key = $1
              AND score > $2
              AND (expires_at_ms IS NULL OR expires_at_ms > $3)
            "#,
        )
        .bind(key)
        .bind(window_start)
        .bind(now_ms)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.max(0) as u64)
    }
}
