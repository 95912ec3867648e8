//! Key layout

use chrono::{DateTime, Utc};

use crate::domain::entities::EventKind;
use crate::error::{FrequencyError, FrequencyResult};

/// `freq:{imp|click}:{user}:{target}:{YYYYMMDD}`
pub fn counter_key(kind: EventKind, user_id: &str, target_id: &str, at: DateTime<Utc>) -> String {
    format!(
        "freq:{}:{}:{}:{}",
        kind.key_segment(),
        user_id,
        target_id,
        at.format("%Y%m%d")
    )
}

/// `freq:config:{target}`
pub fn config_key(target_id: &str) -> String {
    format!("freq:config:{}", target_id)
}

pub fn validate_ids(user_id: &str, target_id: &str) -> FrequencyResult<()> {
    if user_id.trim().is_empty() {
        return Err(FrequencyError::InvalidUserId);
    }
    validate_target(target_id)
}

pub fn validate_target(target_id: &str) -> FrequencyResult<()> {
    if target_id.trim().is_empty() {
        return Err(FrequencyError::InvalidTargetId);
    }
    Ok(())
}
