//! Frequency limits and event kinds

use std::time::Duration;

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::error::{FrequencyError, FrequencyResult};

/// Countable user event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    #[display("impression")]
    Impression,
    #[display("click")]
    Click,
}

impl EventKind {
    /// Segment used in counter keys
    #[inline]
    pub const fn key_segment(&self) -> &'static str {
        match self {
            Self::Impression => "imp",
            Self::Click => "click",
        }
    }
}

/// Per-target limits
///
/// Serialized with the window in milliseconds:
/// `{"impression_limit":10,"click_limit":3,"time_window_ms":86400000,"qps_limit":100.0}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyConfig {
    pub impression_limit: u64,
    pub click_limit: u64,
    #[serde(rename = "time_window_ms", with = "duration_ms")]
    pub time_window: Duration,
    pub qps_limit: f64,
}

impl Default for FrequencyConfig {
    fn default() -> Self {
        Self {
            impression_limit: 10,
            click_limit: 3,
            time_window: Duration::from_secs(24 * 60 * 60),
            qps_limit: 100.0,
        }
    }
}

impl FrequencyConfig {
    /// Every field must be strictly positive
    pub fn validate(&self) -> FrequencyResult<()> {
        if self.impression_limit == 0 {
            return Err(FrequencyError::InvalidConfig(
                "impression_limit must be > 0".to_string(),
            ));
        }
        if self.click_limit == 0 {
            return Err(FrequencyError::InvalidConfig(
                "click_limit must be > 0".to_string(),
            ));
        }
        if self.time_window.is_zero() {
            return Err(FrequencyError::InvalidConfig(
                "time_window must be > 0".to_string(),
            ));
        }
        if !(self.qps_limit.is_finite() && self.qps_limit > 0.0) {
            return Err(FrequencyError::InvalidConfig(
                "qps_limit must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    #[inline]
    pub fn limit_for(&self, kind: EventKind) -> u64 {
        match kind {
            EventKind::Impression => self.impression_limit,
            EventKind::Click => self.click_limit,
        }
    }
}

/// Current counts for one (user, target) pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyStats {
    pub user_id: String,
    pub target_id: String,
    pub impressions: u64,
    pub clicks: u64,
    pub config: FrequencyConfig,
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis().min(u64::MAX as u128) as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
