//! Rate Limiting Infrastructure
//!
//! Sliding-window limiter on top of [`KvStore`] ordered windows. Each
//! admitted event is one window entry scored by its timestamp; a check trims
//! entries older than `now - window` and counts the rest in one round trip.
//!
//! The trim/count and the insert are two calls, so concurrent callers can
//! overshoot the limit by the number of in-flight checks. That is accepted
//! for traffic shaping.

use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use crate::kv::{KvStore, StoreResult};

/// Rate limit configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests allowed in the window
    pub max_requests: u32,
    /// Time window duration
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(1),
        }
    }
}

impl RateLimitConfig {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }

    /// `qps` requests per second, rounded up to at least one
    pub fn per_second(qps: f64) -> Self {
        let max_requests = if qps.is_finite() && qps > 1.0 {
            qps.ceil().min(u32::MAX as f64) as u32
        } else {
            1
        };
        Self::new(max_requests, Duration::from_secs(1))
    }

    pub fn window_ms(&self) -> i64 {
        self.window.as_millis().min(i64::MAX as u128) as i64
    }
}

/// Rate limit check result
#[derive(Debug, Clone)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_at_ms: i64,
}

/// Trait for rate limit storage backends
#[trait_variant::make(RateLimitStore: Send)]
pub trait LocalRateLimitStore {
    /// Count the request against `key` and report whether it is admitted.
    /// Rejected requests are not counted.
    async fn check_and_increment(
        &self,
        key: &str,
        config: &RateLimitConfig,
    ) -> StoreResult<RateLimitResult>;
}

/// Sliding-log limiter over a [`KvStore`]
#[derive(Debug, Clone)]
pub struct SlidingWindowLimiter<S> {
    store: S,
    prefix: String,
}

impl<S: KvStore + Sync> SlidingWindowLimiter<S> {
    pub fn new(store: S, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    fn window_key(&self, key: &str) -> String {
        format!("{}:{}", self.prefix, key)
    }

    /// Events currently inside the window, without trimming
    pub async fn count(&self, key: &str, config: &RateLimitConfig) -> StoreResult<u64> {
        let window_start = Utc::now().timestamp_millis() - config.window_ms();
        self.store
            .window_count(&self.window_key(key), window_start)
            .await
    }

    /// Drop every recorded event for `key`
    pub async fn clear(&self, key: &str) -> StoreResult<bool> {
        self.store.delete(&self.window_key(key)).await
    }
}

impl<S: KvStore + Sync> RateLimitStore for SlidingWindowLimiter<S> {
    async fn check_and_increment(
        &self,
        key: &str,
        config: &RateLimitConfig,
    ) -> StoreResult<RateLimitResult> {
        let now_ms = Utc::now().timestamp_millis();
        let window_key = self.window_key(key);
        let reset_at_ms = now_ms + config.window_ms();

        let count = self
            .store
            .window_trim_count(&window_key, now_ms - config.window_ms())
            .await?;

        if count >= u64::from(config.max_requests) {
            tracing::debug!(key = %window_key, count = count, max = config.max_requests, "Rate limit exceeded");
            return Ok(RateLimitResult {
                allowed: false,
                remaining: 0,
                reset_at_ms,
            });
        }

        let member = format!("{}-{}", now_ms, Uuid::new_v4());
        self.store
            .window_insert(&window_key, &member, now_ms, Some(config.window))
            .await?;

        Ok(RateLimitResult {
            allowed: true,
            remaining: config.max_requests.saturating_sub(count as u32 + 1),
            reset_at_ms,
        })
    }
}
