//! Remote key-value store port
//!
//! The budget ledger, the frequency controller, the inbound rate limiter and
//! the config service all keep their shared state behind [`KvStore`]. The
//! store is the only source of truth shared between process instances, so
//! every read-modify-write it offers is a single atomic operation.
//!
//! Three families of keys are supported:
//! - counters (`get_counter`, `incr_by`, `incr_by_capped`)
//! - string values (`get_value`, `set_value`)
//! - ordered windows of `(member, score)` entries (`window_*`)
//!
//! Expired keys always read as absent.

use std::time::Duration;

use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by a [`KvStore`] implementation
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Store could not be reached (connection refused, pool closed, ...)
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A value exists but cannot be interpreted
    #[error("Corrupt value at {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

impl StoreError {
    /// `true` when retrying later may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Unavailable(_) => true,
            StoreError::Database(e) => matches!(
                e,
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
            ),
            StoreError::Corrupt { .. } => false,
        }
    }
}

/// Atomic key-value / counter / ordered-window operations
#[trait_variant::make(KvStore: Send)]
pub trait LocalKvStore {
    /// Current counter value, `None` when the key is absent or expired
    async fn get_counter(&self, key: &str) -> StoreResult<Option<i64>>;

    /// Atomically add `delta` and return the new value.
    ///
    /// An absent key starts from 0. `Some(ttl)` (re)sets the expiry to
    /// `now + ttl`; `None` keeps the current expiry.
    async fn incr_by(&self, key: &str, delta: i64, ttl: Option<Duration>) -> StoreResult<i64>;

    /// Atomically add `delta` only if the result stays `<= cap`.
    ///
    /// Returns the new value, or `None` (and leaves the counter untouched)
    /// when the increment would exceed the cap.
    async fn incr_by_capped(
        &self,
        key: &str,
        delta: i64,
        cap: i64,
        ttl: Option<Duration>,
    ) -> StoreResult<Option<i64>>;

    async fn get_value(&self, key: &str) -> StoreResult<Option<String>>;

    async fn set_value(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()>;

    /// Remove the key from every family. Returns whether anything was removed.
    async fn delete(&self, key: &str) -> StoreResult<bool>;

    /// Insert (or re-score) `member` in the ordered window at `key`.
    /// `Some(ttl)` refreshes the expiry of the whole window.
    async fn window_insert(
        &self,
        key: &str,
        member: &str,
        score: i64,
        ttl: Option<Duration>,
    ) -> StoreResult<()>;

    /// Drop entries with `score <= window_start`, then count the rest.
    /// Both steps happen in one round trip.
    async fn window_trim_count(&self, key: &str, window_start: i64) -> StoreResult<u64>;

    /// Count entries with `score > window_start` without trimming
    async fn window_count(&self, key: &str, window_start: i64) -> StoreResult<u64>;
}

/// Absolute expiry in epoch milliseconds for an optional TTL
pub(crate) fn expiry_ms(now_ms: i64, ttl: Option<Duration>) -> Option<i64> {
    ttl.map(|ttl| now_ms.saturating_add(ttl.as_millis().min(i64::MAX as u128) as i64))
}
