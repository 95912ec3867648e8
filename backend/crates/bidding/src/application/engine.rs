//! Bidding Engine
//!
//! One bid decision per call:
//! 1. fetch active strategies from the catalog
//! 2. evaluate every eligible strategy concurrently against the first slot
//!    (frequency, CTR, price range, budget)
//! 3. rank what arrived before the deadline and return the winner
//!
//! Candidate tasks are independent tokio tasks. A failing or panicking task
//! only removes its own candidate; the deadline aborts whatever is still
//! running and ranking proceeds on the results already collected.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{Instant, timeout_at};

use crate::application::config::EngineConfig;
use crate::domain::entities::{AdSlot, BidCandidate, BidRequest, BidResponse, BidStrategy, StrategyFilter};
use crate::domain::repository::{
    BudgetGate, ConstantCtr, CtrPredictor, FrequencyGate, StrategyRepository,
};
use crate::domain::services::{
    compute_bid_price, normalize_ctr, rank_candidates, render_markup, validate_bid_request,
    win_notice_url,
};
use crate::error::{BiddingError, BiddingResult};

/// Anything that turns a request into a bid decision
#[trait_variant::make(BidProcessor: Send)]
pub trait LocalBidProcessor {
    /// Decide before `deadline`; late candidates are dropped
    async fn process_bid_until(
        &self,
        request: &BidRequest,
        deadline: Instant,
    ) -> BiddingResult<BidResponse>;
}

pub struct BiddingEngine<R, B, F, P = ConstantCtr> {
    repo: Arc<R>,
    budget: Arc<B>,
    frequency: Arc<F>,
    predictor: Arc<P>,
    config: Arc<EngineConfig>,
}

impl<R, B, F> BiddingEngine<R, B, F, ConstantCtr> {
    /// Engine with the constant CTR placeholder
    pub fn new(repo: Arc<R>, budget: Arc<B>, frequency: Arc<F>, config: Arc<EngineConfig>) -> Self {
        Self::with_predictor(repo, budget, frequency, Arc::new(ConstantCtr::default()), config)
    }
}

impl<R, B, F, P> BiddingEngine<R, B, F, P> {
    pub fn with_predictor(
        repo: Arc<R>,
        budget: Arc<B>,
        frequency: Arc<F>,
        predictor: Arc<P>,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            repo,
            budget,
            frequency,
            predictor,
            config,
        }
    }
}

/// A candidate that passed every check, before ranking
struct Evaluated {
    strategy: BidStrategy,
    bid_price: f64,
    ctr: f64,
}

/// Everything one candidate task needs, owned so the task is `'static`
struct CandidateTask<B, F, P> {
    strategy: BidStrategy,
    request_id: Arc<str>,
    user_id: Arc<str>,
    slot: Arc<AdSlot>,
    budget: Arc<B>,
    frequency: Arc<F>,
    predictor: Arc<P>,
    permits: Arc<Semaphore>,
}

impl<B, F, P> CandidateTask<B, F, P>
where
    B: BudgetGate + Send + Sync + 'static,
    F: FrequencyGate + Send + Sync + 'static,
    P: CtrPredictor + 'static,
{
    async fn run(self) -> Option<Evaluated> {
        let _permit = self.permits.acquire_owned().await.ok()?;
        let strategy_id = self.strategy.id;

        match self.frequency.check_impression(&self.user_id, strategy_id).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(
                    request_id = %self.request_id,
                    strategy_id = strategy_id,
                    "Candidate dropped: frequency cap reached"
                );
                return None;
            }
            Err(e) => {
                // Fail closed: an unknown count must not over-serve
                tracing::debug!(
                    request_id = %self.request_id,
                    strategy_id = strategy_id,
                    error = %e,
                    "Candidate dropped: frequency check failed"
                );
                return None;
            }
        }

        let ctr = normalize_ctr(self.predictor.predict(&self.strategy, &self.user_id, &self.slot));
        if ctr <= 0.0 {
            tracing::debug!(
                request_id = %self.request_id,
                strategy_id = strategy_id,
                "Candidate dropped: no predicted click-through"
            );
            return None;
        }
        let bid_price = compute_bid_price(self.strategy.bid_type, self.strategy.price, ctr);
        if !self.slot.price_in_range(bid_price) {
            tracing::debug!(
                request_id = %self.request_id,
                strategy_id = strategy_id,
                bid_price = bid_price,
                min_price = self.slot.min_price,
                max_price = self.slot.max_price,
                "Candidate dropped: price outside slot range"
            );
            return None;
        }

        match self.budget.check_and_deduct(strategy_id, bid_price).await {
            Ok(true) => Some(Evaluated {
                strategy: self.strategy,
                bid_price,
                ctr,
            }),
            Ok(false) => {
                tracing::debug!(
                    request_id = %self.request_id,
                    strategy_id = strategy_id,
                    bid_price = bid_price,
                    "Candidate dropped: budget exceeded"
                );
                None
            }
            Err(e) => {
                tracing::debug!(
                    request_id = %self.request_id,
                    strategy_id = strategy_id,
                    error = %e,
                    "Candidate dropped: budget check failed"
                );
                None
            }
        }
    }
}

/// `None` once the deadline passes
async fn until<T>(deadline: Option<Instant>, fut: impl Future<Output = T>) -> Option<T> {
    match deadline {
        Some(deadline) => timeout_at(deadline, fut).await.ok(),
        None => Some(fut.await),
    }
}

impl<R, B, F, P> BiddingEngine<R, B, F, P>
where
    R: StrategyRepository + Send + Sync,
    B: BudgetGate + Send + Sync + 'static,
    F: FrequencyGate + Send + Sync + 'static,
    P: CtrPredictor + 'static,
{
    /// Decide without a deadline
    pub async fn process_bid(&self, request: &BidRequest) -> BiddingResult<BidResponse> {
        self.run(request, None).await
    }

    async fn run(&self, request: &BidRequest, deadline: Option<Instant>) -> BiddingResult<BidResponse> {
        validate_bid_request(request)?;
        let slot = request
            .ad_slots
            .first()
            .cloned()
            .map(Arc::new)
            .ok_or_else(|| BiddingError::InvalidRequest("at least one ad slot is required".into()))?;

        let filter = StrategyFilter::active(self.config.page_size).normalized();
        let Some(fetched) = until(deadline, self.repo.list(&filter)).await else {
            tracing::debug!(request_id = %request.request_id, "Deadline reached while fetching strategies");
            return Err(BiddingError::NoAvailableAds);
        };
        let (strategies, _total) = fetched?;
        if strategies.is_empty() {
            return Err(BiddingError::NoAvailableAds);
        }

        let request_id: Arc<str> = Arc::from(request.request_id.as_str());
        let user_id: Arc<str> = Arc::from(request.user_id.as_str());
        let permits = Arc::new(Semaphore::new(self.config.max_concurrent_bids.max(1)));

        let mut tasks = JoinSet::new();
        for strategy in strategies {
            if !strategy.status.is_enabled() || !slot.accepts(strategy.bid_type) {
                continue;
            }
            let task = CandidateTask {
                strategy,
                request_id: request_id.clone(),
                user_id: user_id.clone(),
                slot: slot.clone(),
                budget: self.budget.clone(),
                frequency: self.frequency.clone(),
                predictor: self.predictor.clone(),
                permits: permits.clone(),
            };
            tasks.spawn(task.run());
        }
        let spawned = tasks.len();

        let mut candidates = Vec::with_capacity(spawned);
        loop {
            let Some(joined) = until(deadline, tasks.join_next()).await else {
                tracing::debug!(
                    request_id = %request_id,
                    collected = candidates.len(),
                    abandoned = tasks.len(),
                    "Deadline reached, ranking partial results"
                );
                tasks.abort_all();
                break;
            };
            match joined {
                None => break,
                Some(Ok(Some(evaluated))) => {
                    let arrival = candidates.len();
                    candidates.push(BidCandidate {
                        strategy: evaluated.strategy,
                        bid_price: evaluated.bid_price,
                        ctr: evaluated.ctr,
                        arrival,
                    });
                }
                Some(Ok(None)) => {}
                Some(Err(e)) if e.is_panic() => {
                    tracing::error!(request_id = %request_id, error = %e, "Candidate evaluation panicked");
                }
                Some(Err(e)) => {
                    tracing::debug!(request_id = %request_id, error = %e, "Candidate evaluation cancelled");
                }
            }
        }

        rank_candidates(&mut candidates);
        let Some(winner) = candidates.into_iter().next() else {
            tracing::debug!(request_id = %request_id, evaluated = spawned, "No candidate survived evaluation");
            return Err(BiddingError::NoAvailableAds);
        };

        self.record_impression_later(&request_id, &user_id, winner.strategy.id);

        tracing::info!(
            request_id = %request_id,
            strategy_id = winner.strategy.id,
            bid_price = winner.bid_price,
            bid_type = %winner.strategy.bid_type,
            evaluated = spawned,
            "Bid won"
        );

        Ok(BidResponse {
            request_id: request.request_id.clone(),
            slot_id: slot.slot_id.clone(),
            ad_id: winner.strategy.id.to_string(),
            bid_price: winner.bid_price,
            bid_type: winner.strategy.bid_type,
            ad_markup: render_markup(&winner.strategy, &slot),
            win_notice_url: win_notice_url(&self.config.win_notice_path, &winner.strategy, winner.bid_price),
        })
    }

    /// Fire and forget; the response never waits on it
    fn record_impression_later(&self, request_id: &Arc<str>, user_id: &Arc<str>, strategy_id: i64) {
        let frequency = self.frequency.clone();
        let request_id = request_id.clone();
        let user_id = user_id.clone();
        tokio::spawn(async move {
            if let Err(e) = frequency.record_impression(&user_id, strategy_id).await {
                tracing::warn!(
                    request_id = %request_id,
                    user_id = %user_id,
                    strategy_id = strategy_id,
                    error = %e,
                    "Failed to record impression"
                );
            }
        });
    }
}

impl<R, B, F, P> BidProcessor for BiddingEngine<R, B, F, P>
where
    R: StrategyRepository + Send + Sync,
    B: BudgetGate + Send + Sync + 'static,
    F: FrequencyGate + Send + Sync + 'static,
    P: CtrPredictor + 'static,
{
    async fn process_bid_until(
        &self,
        request: &BidRequest,
        deadline: Instant,
    ) -> BiddingResult<BidResponse> {
        self.run(request, Some(deadline)).await
    }
}
