//! In-process [`KvStore`] adapter
//!
//! Single mutex around all key families. Used by tests and by single-node
//! development runs; it gives the same atomicity as the PostgreSQL adapter
//! within one process and nothing across processes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;

use crate::kv::{KvStore, StoreError, StoreResult, expiry_ms};

#[derive(Debug)]
struct Expiring<T> {
    value: T,
    expires_at_ms: Option<i64>,
}

impl<T> Expiring<T> {
    fn is_live(&self, now_ms: i64) -> bool {
        self.expires_at_ms.is_none_or(|at| at > now_ms)
    }
}

#[derive(Debug, Default)]
struct Inner {
    counters: HashMap<String, Expiring<i64>>,
    values: HashMap<String, Expiring<String>>,
    windows: HashMap<String, Expiring<HashMap<String, i64>>>,
}

impl Inner {
    fn live_counter(&mut self, key: &str, now_ms: i64) -> Option<&mut Expiring<i64>> {
        if self.counters.get(key).is_some_and(|c| !c.is_live(now_ms)) {
            self.counters.remove(key);
        }
        self.counters.get_mut(key)
    }

    fn live_window(&mut self, key: &str, now_ms: i64) -> Option<&mut Expiring<HashMap<String, i64>>> {
        if self.windows.get(key).is_some_and(|w| !w.is_live(now_ms)) {
            self.windows.remove(key);
        }
        self.windows.get_mut(key)
    }
}

/// Mutex-guarded in-memory store
#[derive(Debug, Clone, Default)]
pub struct MemoryKvStore {
    inner: Arc<Mutex<Inner>>,
    offline: Arc<AtomicBool>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While offline every operation fails with [`StoreError::Unavailable`]
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Inner>> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".to_string()));
        }
        Ok(self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner()))
    }
}

impl KvStore for MemoryKvStore {
    async fn get_counter(&self, key: &str) -> StoreResult<Option<i64>> {
        let now_ms = Utc::now().timestamp_millis();
        let mut inner = self.lock()?;
        Ok(inner.live_counter(key, now_ms).map(|c| c.value))
    }

    async fn incr_by(&self, key: &str, delta: i64, ttl: Option<Duration>) -> StoreResult<i64> {
        let now_ms = Utc::now().timestamp_millis();
        let mut inner = self.lock()?;
        let expires_at_ms = expiry_ms(now_ms, ttl);

        let value = match inner.live_counter(key, now_ms) {
            Some(counter) => {
                counter.value = counter.value.saturating_add(delta);
                if expires_at_ms.is_some() {
                    counter.expires_at_ms = expires_at_ms;
                }
                counter.value
            }
            None => {
                inner.counters.insert(
                    key.to_string(),
                    Expiring {
                        value: delta,
                        expires_at_ms,
                    },
                );
                delta
            }
        };
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
        let mut inner = self.lock()?;
        let expires_at_ms = expiry_ms(now_ms, ttl);

        let current = inner.live_counter(key, now_ms).map_or(0, |c| c.value);
        let next = current.saturating_add(delta);
        if next > cap {
            return Ok(None);
        }

        let entry = inner.counters.entry(key.to_string()).or_insert(Expiring {
            value: 0,
            expires_at_ms: None,
        });
        entry.value = next;
        if expires_at_ms.is_some() {
            entry.expires_at_ms = expires_at_ms;
        }
        Ok(Some(next))
    }

    async fn get_value(&self, key: &str) -> StoreResult<Option<String>> {
        let now_ms = Utc::now().timestamp_millis();
        let mut inner = self.lock()?;
        if inner.values.get(key).is_some_and(|v| !v.is_live(now_ms)) {
            inner.values.remove(key);
        }
        Ok(inner.values.get(key).map(|v| v.value.clone()))
    }

    async fn set_value(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()> {
        let now_ms = Utc::now().timestamp_millis();
        let mut inner = self.lock()?;
        inner.values.insert(
            key.to_string(),
            Expiring {
                value: value.to_string(),
                expires_at_ms: expiry_ms(now_ms, ttl),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let mut inner = self.lock()?;
        let counter = inner.counters.remove(key).is_some();
        let value = inner.values.remove(key).is_some();
        let window = inner.windows.remove(key).is_some();
        Ok(counter || value || window)
    }

    async fn window_insert(
        &self,
        key: &str,
        member: &str,
        score: i64,
        ttl: Option<Duration>,
    ) -> StoreResult<()> {
        let now_ms = Utc::now().timestamp_millis();
        let mut inner = self.lock()?;
        let expires_at_ms = expiry_ms(now_ms, ttl);

        match inner.live_window(key, now_ms) {
            Some(window) => {
                window.value.insert(member.to_string(), score);
                if expires_at_ms.is_some() {
                    window.expires_at_ms = expires_at_ms;
                }
            }
            None => {
                let mut members = HashMap::new();
                members.insert(member.to_string(), score);
                inner.windows.insert(
                    key.to_string(),
                    Expiring {
                        value: members,
                        expires_at_ms,
                    },
                );
            }
        }
        Ok(())
    }

    async fn window_trim_count(&self, key: &str, window_start: i64) -> StoreResult<u64> {
        let now_ms = Utc::now().timestamp_millis();
        let mut inner = self.lock()?;
        let Some(window) = inner.live_window(key, now_ms) else {
            return Ok(0);
        };
        window.value.retain(|_, score| *score > window_start);
        Ok(window.value.len() as u64)
    }

    async fn window_count(&self, key: &str, window_start: i64) -> StoreResult<u64> {
        let now_ms = Utc::now().timestamp_millis();
        let mut inner = self.lock()?;
        Ok(inner.live_window(key, now_ms).map_or(0, |window| {
            window.value.values().filter(|score| **score > window_start).count() as u64
        }))
    }
}
