//! Bidding
//!
//! Real-time bid decisions over the strategy catalog.
//!
//! - `domain/` - strategies, slots, candidates, pricing and ranking rules,
//!   and the ports the engine depends on
//! - `application/` - [`BiddingEngine`] and the [`TrafficService`] in front of it
//! - `infra/` - PostgreSQL and in-memory catalogs, the targeting client, and
//!   adapters binding the budget ledger and frequency controller to the ports
//! - `presentation/` - bid exchange and strategy admin routes
//!
//! ## Request flow
//! validation → inbound QPS shaping → targeting → engine fan-out
//! (frequency, CTR, price range, budget per candidate) → eCPM ranking →
//! winner, with the winner's impression recorded in the background.
//!
//! ## Failure policy
//! - Frequency and budget failures drop the candidate (fail closed)
//! - Targeting failures reject the request with 503 (fail closed)
//! - Limiter store failures admit the request (fail open)
//! - Impression recording failures are only logged

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

pub use application::config::{EngineConfig, TrafficConfig};
pub use application::engine::{BidProcessor, BiddingEngine};
pub use application::traffic::{TrafficOutcome, TrafficService};
pub use domain::entities::{
    AdSlot, BidCandidate, BidRequest, BidResponse, BidStrategy, BillingType, StrategyFilter,
    StrategyStatus,
};
pub use domain::repository::{
    BudgetGate, ConstantCtr, CtrPredictor, FrequencyGate, StrategyRepository, TargetingService,
};
pub use error::{BiddingError, BiddingResult, GateError};
pub use infra::memory::InMemoryStrategyRepository;
pub use infra::postgres::PgStrategyRepository;
pub use infra::targeting::{HttpTargetingClient, StaticTargeting};
pub use presentation::router::{bid_router, strategy_router};
