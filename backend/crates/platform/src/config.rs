//! Runtime configuration
//!
//! - [`env_or`]: typed environment lookups for process startup
//! - [`ConfigValue`] / [`ConfigService`]: versioned, typed runtime config
//!   entries kept in the shared [`KvStore`]

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::kv::{KvStore, StoreError};

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    InvalidEnv { name: String, value: String },

    #[error("Config key must not be empty")]
    EmptyKey,

    #[error("Config not found: {0}")]
    NotFound(String),

    #[error("Config version not found: {key}@{version}")]
    VersionNotFound { key: String, version: i64 },

    #[error("Corrupt config entry {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Parse the environment variable `name`, or return `default` when unset.
///
/// A set but unparsable value is an error rather than a silent default.
pub fn env_or<T>(name: &str, default: T) -> ConfigResult<T>
where
    T: FromStr,
{
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
            name: name.to_string(),
            value: raw,
        }),
        Err(_) => Ok(default),
    }
}

/// Environment variable as a string, treating blank as unset
pub fn env_opt(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// A typed config value
///
/// Serialized as `{"type": "...", "value": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ConfigValue {
    String(String),
    Number(f64),
    Bool(bool),
    Json(serde_json::Value),
}

impl ConfigValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ConfigValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ConfigValue::String(_) => "string",
            ConfigValue::Number(_) => "number",
            ConfigValue::Bool(_) => "bool",
            ConfigValue::Json(_) => "json",
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::String(s) => f.write_str(s),
            ConfigValue::Number(n) => write!(f, "{}", n),
            ConfigValue::Bool(b) => write!(f, "{}", b),
            ConfigValue::Json(v) => write!(f, "{}", v),
        }
    }
}

/// One stored version of a config entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigItem {
    pub key: String,
    pub value: ConfigValue,
    pub version: i64,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
}

/// Versioned config entries on top of a [`KvStore`]
///
/// Every `set_config` takes the next version from an atomic counter and
/// writes both the current entry and an immutable history entry.
#[derive(Debug, Clone)]
pub struct ConfigService<S> {
    store: S,
}

impl<S: KvStore + Sync> ConfigService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn current_key(key: &str) -> String {
        format!("config:current:{}", key)
    }

    fn version_key(key: &str) -> String {
        format!("config:version:{}", key)
    }

    fn history_key(key: &str, version: i64) -> String {
        format!("config:history:{}:{}", key, version)
    }

    pub async fn set_config(
        &self,
        key: &str,
        value: ConfigValue,
        updated_by: &str,
    ) -> ConfigResult<ConfigItem> {
        if key.trim().is_empty() {
            return Err(ConfigError::EmptyKey);
        }

        let version = self.store.incr_by(&Self::version_key(key), 1, None).await?;
        let item = ConfigItem {
            key: key.to_string(),
            value,
            version,
            updated_at: Utc::now(),
            updated_by: updated_by.to_string(),
        };
        let encoded = serde_json::to_string(&item).map_err(|source| ConfigError::Corrupt {
            key: key.to_string(),
            source,
        })?;

        self.store
            .set_value(&Self::history_key(key, version), &encoded, None)
            .await?;
        self.store
            .set_value(&Self::current_key(key), &encoded, None)
            .await?;

        tracing::info!(
            config_key = %key,
            version = version,
            kind = item.value.kind(),
            updated_by = %updated_by,
            "Config updated"
        );

        Ok(item)
    }

    pub async fn get_config(&self, key: &str) -> ConfigResult<ConfigItem> {
        let raw = self
            .store
            .get_value(&Self::current_key(key))
            .await?
            .ok_or_else(|| ConfigError::NotFound(key.to_string()))?;
        Self::decode(key, &raw)
    }

    pub async fn get_config_history(&self, key: &str, version: i64) -> ConfigResult<ConfigItem> {
        let raw = self
            .store
            .get_value(&Self::history_key(key, version))
            .await?
            .ok_or_else(|| ConfigError::VersionNotFound {
                key: key.to_string(),
                version,
            })?;
        Self::decode(key, &raw)
    }

    /// Remove the entry, its version counter and every history version
    pub async fn delete_config(&self, key: &str) -> ConfigResult<()> {
        let Some(version) = self.store.get_counter(&Self::version_key(key)).await? else {
            return Err(ConfigError::NotFound(key.to_string()));
        };

        self.store.delete(&Self::current_key(key)).await?;
        for v in 1..=version {
            self.store.delete(&Self::history_key(key, v)).await?;
        }
        self.store.delete(&Self::version_key(key)).await?;

        tracing::info!(config_key = %key, versions = version, "Config deleted");
        Ok(())
    }

    fn decode(key: &str, raw: &str) -> ConfigResult<ConfigItem> {
        serde_json::from_str(raw).map_err(|source| ConfigError::Corrupt {
            key: key.to_string(),
            source,
        })
    }
}
