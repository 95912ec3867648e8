//! HTTP Handlers

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use chrono::Utc;
use platform::client::{extract_client_ip, resolve_request_id};
use platform::rate_limit::RateLimitStore;

use crate::application::engine::BidProcessor;
use crate::application::traffic::{TrafficOutcome, TrafficService};
use crate::domain::entities::{BidStrategy, NewStrategy, StrategyFilter, StrategyUpdate};
use crate::domain::repository::{BudgetGate, StrategyRepository, TargetingService};
use crate::domain::services::{validate_new_strategy, validate_update};
use crate::error::{BiddingError, BiddingResult};
use crate::presentation::dto::{
    BidRequestBody, BidResponseBody, CreateStrategyRequest, CreativeResponse,
    ListStrategiesQuery, StatsQuery, StatsResponse, StrategyListResponse, StrategyResponse,
    UpdateStatusRequest, UpdateStrategyRequest,
};

// ============================================================================
// Bid
// ============================================================================

/// Shared state for the bid endpoint
pub struct BidAppState<E, T, L> {
    pub traffic: Arc<TrafficService<E, T, L>>,
}

impl<E, T, L> Clone for BidAppState<E, T, L> {
    fn clone(&self) -> Self {
        Self {
            traffic: self.traffic.clone(),
        }
    }
}

/// POST /api/v1/bid
///
/// No-fill is a 200 with an empty `data` list.
pub async fn bid<E, T, L>(
    State(state): State<BidAppState<E, T, L>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    payload: Result<Json<BidRequestBody>, JsonRejection>,
) -> BiddingResult<Json<BidResponseBody>>
where
    E: BidProcessor + Send + Sync + 'static,
    T: TargetingService + Send + Sync + 'static,
    L: RateLimitStore + Send + Sync + 'static,
{
    // Malformed bodies are validation failures like any other
    let Json(body) = payload.map_err(|e| BiddingError::InvalidRequest(e.body_text()))?;
    let request_id = resolve_request_id(&headers, Some(&body.request_id));
    let ip = if body.ip.trim().is_empty() {
        extract_client_ip(&headers, Some(addr.ip()))
            .map(|ip| ip.to_string())
            .unwrap_or_default()
    } else {
        body.ip.clone()
    };
    let request = body.into_request(request_id, ip)?;

    let response = match state.traffic.handle(&request).await? {
        TrafficOutcome::Filled(response) => BidResponseBody::filled(response),
        TrafficOutcome::NoFill(reason) => BidResponseBody::no_fill(request.request_id, reason),
    };
    Ok(Json(response))
}

// ============================================================================
// Strategies
// ============================================================================

/// Shared state for strategy handlers
pub struct StrategyAppState<R, B> {
    pub repo: Arc<R>,
    pub budget: Arc<B>,
}

impl<R, B> Clone for StrategyAppState<R, B> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            budget: self.budget.clone(),
        }
    }
}

/// Keep the ledger entry in step with the catalog. A failure here is
/// repaired by the periodic resync, so it does not fail the admin call.
async fn sync_ledger<B>(budget: &B, strategy: &BidStrategy)
where
    B: BudgetGate + Sync,
{
    if let Err(e) = budget.sync_strategy(strategy).await {
        tracing::warn!(strategy_id = strategy.id, error = %e, "Failed to sync strategy budget");
    }
}

/// GET /api/v1/strategies
pub async fn list_strategies<R, B>(
    State(state): State<StrategyAppState<R, B>>,
    Query(query): Query<ListStrategiesQuery>,
) -> BiddingResult<Json<StrategyListResponse>>
where
    R: StrategyRepository + Send + Sync + 'static,
    B: BudgetGate + Send + Sync + 'static,
{
    let filter = StrategyFilter::from(query);
    let (strategies, total) = state.repo.list(&filter).await?;
    Ok(Json(StrategyListResponse {
        items: strategies.into_iter().map(StrategyResponse::from).collect(),
        total,
        page: filter.page,
        page_size: filter.page_size,
    }))
}

/// POST /api/v1/strategies
pub async fn create_strategy<R, B>(
    State(state): State<StrategyAppState<R, B>>,
    Json(req): Json<CreateStrategyRequest>,
) -> BiddingResult<(StatusCode, Json<StrategyResponse>)>
where
    R: StrategyRepository + Send + Sync + 'static,
    B: BudgetGate + Send + Sync + 'static,
{
    let new = NewStrategy::from(req);
    validate_new_strategy(&new)?;

    let created = state.repo.create(&new).await?;
    tracing::info!(
        strategy_id = created.id,
        bid_type = %created.bid_type,
        price = created.price,
        "Strategy created"
    );
    sync_ledger(state.budget.as_ref(), &created).await;
    Ok((StatusCode::CREATED, Json(created.into())))
}

/// GET /api/v1/strategies/{id}
pub async fn get_strategy<R, B>(
    State(state): State<StrategyAppState<R, B>>,
    Path(id): Path<i64>,
) -> BiddingResult<Json<StrategyResponse>>
where
    R: StrategyRepository + Send + Sync + 'static,
    B: BudgetGate + Send + Sync + 'static,
{
    let strategy = state
        .repo
        .get(id)
        .await?
        .ok_or(BiddingError::StrategyNotFound(id))?;
    Ok(Json(strategy.into()))
}

/// PUT /api/v1/strategies/{id}
pub async fn update_strategy<R, B>(
    State(state): State<StrategyAppState<R, B>>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateStrategyRequest>,
) -> BiddingResult<Json<StrategyResponse>>
where
    R: StrategyRepository + Send + Sync + 'static,
    B: BudgetGate + Send + Sync + 'static,
{
    let update = StrategyUpdate::from(req);
    validate_update(&update)?;

    let updated = state.repo.update(id, &update).await?;
    if updated.is_price_locked && updated.price != update.price {
        tracing::debug!(strategy_id = id, "Price change ignored on locked strategy");
    }
    sync_ledger(state.budget.as_ref(), &updated).await;
    Ok(Json(updated.into()))
}

/// DELETE /api/v1/strategies/{id}
pub async fn delete_strategy<R, B>(
    State(state): State<StrategyAppState<R, B>>,
    Path(id): Path<i64>,
) -> BiddingResult<StatusCode>
where
    R: StrategyRepository + Send + Sync + 'static,
    B: BudgetGate + Send + Sync + 'static,
{
    state.repo.delete(id).await?;
    if let Err(e) = state.budget.forget_strategy(id).await {
        tracing::warn!(strategy_id = id, error = %e, "Failed to drop strategy budget");
    }
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/strategies/{id}/status
pub async fn update_strategy_status<R, B>(
    State(state): State<StrategyAppState<R, B>>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateStatusRequest>,
) -> BiddingResult<Json<StrategyResponse>>
where
    R: StrategyRepository + Send + Sync + 'static,
    B: BudgetGate + Send + Sync + 'static,
{
    let updated = state.repo.update_status(id, req.status).await?;
    tracing::info!(strategy_id = id, status = %updated.status, "Strategy status changed");
    sync_ledger(state.budget.as_ref(), &updated).await;
    Ok(Json(updated.into()))
}

/// GET /api/v1/strategies/{id}/creatives
pub async fn list_creatives<R, B>(
    State(state): State<StrategyAppState<R, B>>,
    Path(id): Path<i64>,
) -> BiddingResult<Json<Vec<CreativeResponse>>>
where
    R: StrategyRepository + Send + Sync + 'static,
    B: BudgetGate + Send + Sync + 'static,
{
    let creatives = state.repo.list_creatives(id).await?;
    Ok(Json(creatives.into_iter().map(CreativeResponse::from).collect()))
}

/// POST /api/v1/strategies/{id}/creatives/{creative_id}
pub async fn add_creative<R, B>(
    State(state): State<StrategyAppState<R, B>>,
    Path((id, creative_id)): Path<(i64, i64)>,
) -> BiddingResult<(StatusCode, Json<CreativeResponse>)>
where
    R: StrategyRepository + Send + Sync + 'static,
    B: BudgetGate + Send + Sync + 'static,
{
    let link = state.repo.add_creative(id, creative_id).await?;
    Ok((StatusCode::CREATED, Json(link.into())))
}

/// DELETE /api/v1/strategies/{id}/creatives/{creative_id}
pub async fn remove_creative<R, B>(
    State(state): State<StrategyAppState<R, B>>,
    Path((id, creative_id)): Path<(i64, i64)>,
) -> BiddingResult<StatusCode>
where
    R: StrategyRepository + Send + Sync + 'static,
    B: BudgetGate + Send + Sync + 'static,
{
    state.repo.remove_creative(id, creative_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/strategies/{id}/stats
pub async fn get_strategy_stats<R, B>(
    State(state): State<StrategyAppState<R, B>>,
    Path(id): Path<i64>,
    Query(query): Query<StatsQuery>,
) -> BiddingResult<Json<Vec<StatsResponse>>>
where
    R: StrategyRepository + Send + Sync + 'static,
    B: BudgetGate + Send + Sync + 'static,
{
    let (start, end) = query.range(Utc::now().date_naive())?;
    if state.repo.get(id).await?.is_none() {
        return Err(BiddingError::StrategyNotFound(id));
    }
    let stats = state.repo.get_strategy_stats(id, start, end).await?;
    Ok(Json(stats.into_iter().map(StatsResponse::from).collect()))
}
