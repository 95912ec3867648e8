//! API DTOs (Data Transfer Objects)

use serde::{Deserialize, Serialize};

use crate::domain::entities::FrequencyConfig;

/// Response for GET /api/v1/frequency/{target_id}/config
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigResponse {
    pub target_id: String,
    pub config: FrequencyConfig,
}

/// Query for GET /api/v1/frequency/{target_id}/stats
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsQuery {
    pub user_id: String,
}
