//! HTTP Handlers

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use platform::kv::KvStore;

use crate::application::controller::FrequencyController;
use crate::domain::entities::{FrequencyConfig, FrequencyStats};
use crate::error::FrequencyResult;
use crate::presentation::dto::{ConfigResponse, StatsQuery};

pub struct FrequencyAppState<S> {
    pub controller: Arc<FrequencyController<S>>,
}

impl<S> Clone for FrequencyAppState<S> {
    fn clone(&self) -> Self {
        Self {
            controller: self.controller.clone(),
        }
    }
}

/// GET /api/v1/frequency/{target_id}/config
pub async fn get_config<S>(
    State(state): State<FrequencyAppState<S>>,
    Path(target_id): Path<String>,
) -> FrequencyResult<Json<ConfigResponse>>
where
    S: KvStore + Sync + 'static,
{
    let config = state.controller.get_config(&target_id).await?;
    Ok(Json(ConfigResponse { target_id, config }))
}

/// PUT /api/v1/frequency/{target_id}/config
pub async fn update_config<S>(
    State(state): State<FrequencyAppState<S>>,
    Path(target_id): Path<String>,
    Json(config): Json<FrequencyConfig>,
) -> FrequencyResult<Json<ConfigResponse>>
where
    S: KvStore + Sync + 'static,
{
    state.controller.update_config(&target_id, &config).await?;
    Ok(Json(ConfigResponse { target_id, config }))
}

/// DELETE /api/v1/frequency/{target_id}/config
pub async fn reset_config<S>(
    State(state): State<FrequencyAppState<S>>,
    Path(target_id): Path<String>,
) -> FrequencyResult<StatusCode>
where
    S: KvStore + Sync + 'static,
{
    state.controller.reset_config(&target_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/frequency/{target_id}/stats?userId=
pub async fn get_stats<S>(
    State(state): State<FrequencyAppState<S>>,
    Path(target_id): Path<String>,
    Query(query): Query<StatsQuery>,
) -> FrequencyResult<Json<FrequencyStats>>
where
    S: KvStore + Sync + 'static,
{
    Ok(Json(state.controller.stats(&query.user_id, &target_id).await?))
}
