//! Bidding Routers

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
};
use platform::rate_limit::RateLimitStore;

use crate::application::engine::BidProcessor;
use crate::application::traffic::TrafficService;
use crate::domain::repository::{BudgetGate, StrategyRepository, TargetingService};
use crate::presentation::handlers::{self, BidAppState, StrategyAppState};

/// Bid exchange, to be nested under `/api/v1/bid`.
///
/// The server must be run with connect info so the client address is known.
pub fn bid_router<E, T, L>(traffic: Arc<TrafficService<E, T, L>>) -> Router
where
    E: BidProcessor + Send + Sync + 'static,
    T: TargetingService + Send + Sync + 'static,
    L: RateLimitStore + Send + Sync + 'static,
{
    let state = BidAppState { traffic };

    Router::new()
        .route("/", post(handlers::bid::<E, T, L>))
        .with_state(state)
}

/// Strategy admin routes, to be nested under `/api/v1/strategies`
pub fn strategy_router<R, B>(repo: Arc<R>, budget: Arc<B>) -> Router
where
    R: StrategyRepository + Send + Sync + 'static,
    B: BudgetGate + Send + Sync + 'static,
{
    let state = StrategyAppState { repo, budget };

    Router::new()
        .route(
            "/",
            get(handlers::list_strategies::<R, B>).post(handlers::create_strategy::<R, B>),
        )
        .route(
            "/{id}",
            get(handlers::get_strategy::<R, B>)
                .put(handlers::update_strategy::<R, B>)
                .delete(handlers::delete_strategy::<R, B>),
        )
        .route("/{id}/status", put(handlers::update_strategy_status::<R, B>))
        .route("/{id}/creatives", get(handlers::list_creatives::<R, B>))
        .route(
            "/{id}/creatives/{creative_id}",
            post(handlers::add_creative::<R, B>).delete(handlers::remove_creative::<R, B>),
        )
        .route("/{id}/stats", get(handlers::get_strategy_stats::<R, B>))
        .with_state(state)
}
