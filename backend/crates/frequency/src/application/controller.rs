//! Frequency Controller
//!
//! Stateless pass-through to the shared store: reads treat an absent counter
//! as zero, records increment and refresh the counter's expiry.

use std::sync::Arc;

use chrono::Utc;
use platform::kv::KvStore;

use crate::domain::entities::{EventKind, FrequencyConfig, FrequencyStats};
use crate::domain::services::{config_key, counter_key, validate_ids, validate_target};
use crate::error::{FrequencyError, FrequencyResult};

pub struct FrequencyController<S> {
    store: Arc<S>,
    defaults: FrequencyConfig,
}

impl<S> FrequencyController<S>
where
    S: KvStore + Sync,
{
    /// Controller falling back to [`FrequencyConfig::default`]
    pub fn new(store: Arc<S>) -> Self {
        Self::with_defaults(store, FrequencyConfig::default())
    }

    pub fn with_defaults(store: Arc<S>, defaults: FrequencyConfig) -> Self {
        Self { store, defaults }
    }

    pub fn defaults(&self) -> &FrequencyConfig {
        &self.defaults
    }

    pub async fn check_impression(&self, user_id: &str, target_id: &str) -> FrequencyResult<bool> {
        self.check(EventKind::Impression, user_id, target_id).await
    }

    pub async fn record_impression(&self, user_id: &str, target_id: &str) -> FrequencyResult<u64> {
        self.record(EventKind::Impression, user_id, target_id).await
    }

    pub async fn check_click(&self, user_id: &str, target_id: &str) -> FrequencyResult<bool> {
        self.check(EventKind::Click, user_id, target_id).await
    }

    pub async fn record_click(&self, user_id: &str, target_id: &str) -> FrequencyResult<u64> {
        self.record(EventKind::Click, user_id, target_id).await
    }

    /// `count < limit` for the current window
    pub async fn check(&self, kind: EventKind, user_id: &str, target_id: &str) -> FrequencyResult<bool> {
        validate_ids(user_id, target_id)?;

        let config = self.get_config(target_id).await?;
        let count = self.count(kind, user_id, target_id).await?;
        let limit = config.limit_for(kind);
        let allowed = count < limit;

        if !allowed {
            tracing::debug!(
                user_id = %user_id,
                target_id = %target_id,
                kind = %kind,
                count = count,
                limit = limit,
                "Frequency limit reached"
            );
        }
        Ok(allowed)
    }

    /// Increment and refresh the expiry to the target's window.
    /// Returns the new count.
    pub async fn record(&self, kind: EventKind, user_id: &str, target_id: &str) -> FrequencyResult<u64> {
        validate_ids(user_id, target_id)?;

        let config = self.get_config(target_id).await?;
        let key = counter_key(kind, user_id, target_id, Utc::now());
        let count = self
            .store
            .incr_by(&key, 1, Some(config.time_window))
            .await?;

        Ok(count.max(0) as u64)
    }

    /// Current count, absent counters read as zero
    pub async fn count(&self, kind: EventKind, user_id: &str, target_id: &str) -> FrequencyResult<u64> {
        let key = counter_key(kind, user_id, target_id, Utc::now());
        let count = self.store.get_counter(&key).await?.unwrap_or(0);
        Ok(count.max(0) as u64)
    }

    pub async fn stats(&self, user_id: &str, target_id: &str) -> FrequencyResult<FrequencyStats> {
        validate_ids(user_id, target_id)?;

        Ok(FrequencyStats {
            user_id: user_id.to_string(),
            target_id: target_id.to_string(),
            impressions: self.count(EventKind::Impression, user_id, target_id).await?,
            clicks: self.count(EventKind::Click, user_id, target_id).await?,
            config: self.get_config(target_id).await?,
        })
    }

    /// Reset both counters for the current window
    pub async fn clear(&self, user_id: &str, target_id: &str) -> FrequencyResult<()> {
        validate_ids(user_id, target_id)?;

        let now = Utc::now();
        for kind in [EventKind::Impression, EventKind::Click] {
            self.store
                .delete(&counter_key(kind, user_id, target_id, now))
                .await?;
        }
        tracing::info!(user_id = %user_id, target_id = %target_id, "Frequency counters cleared");
        Ok(())
    }

    /// Per-target override, else the defaults
    pub async fn get_config(&self, target_id: &str) -> FrequencyResult<FrequencyConfig> {
        validate_target(target_id)?;

        match self.store.get_value(&config_key(target_id)).await? {
            Some(raw) => serde_json::from_str(&raw).map_err(|source| FrequencyError::CorruptConfig {
                target_id: target_id.to_string(),
                source,
            }),
            None => Ok(self.defaults.clone()),
        }
    }

    pub async fn update_config(&self, target_id: &str, config: &FrequencyConfig) -> FrequencyResult<()> {
        validate_target(target_id)?;
        config.validate()?;

        let encoded = serde_json::to_string(config).map_err(|source| FrequencyError::CorruptConfig {
            target_id: target_id.to_string(),
            source,
        })?;
        self.store
            .set_value(&config_key(target_id), &encoded, None)
            .await?;

        tracing::info!(
            target_id = %target_id,
            impression_limit = config.impression_limit,
            click_limit = config.click_limit,
            window_ms = config.time_window.as_millis() as u64,
            "Frequency config updated"
        );
        Ok(())
    }

    /// Drop the override so the defaults apply again
    pub async fn reset_config(&self, target_id: &str) -> FrequencyResult<bool> {
        validate_target(target_id)?;
        Ok(self.store.delete(&config_key(target_id)).await?)
    }
}
