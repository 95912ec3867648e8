//! Repository Traits and Collaborator Ports
//!
//! Interfaces the engine and the traffic handler depend on. Implementations
//! are in the infrastructure layer.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::domain::entities::{
    AdSlot, BidStrategy, NewStrategy, StrategyCreative, StrategyFilter, StrategyStats,
    StrategyStatus, StrategyUpdate,
};
use crate::error::{BiddingResult, GateError};

/// Strategy catalog
#[trait_variant::make(StrategyRepository: Send)]
pub trait LocalStrategyRepository {
    /// One page of matching strategies, ordered by id descending, plus the
    /// total number of matches
    async fn list(&self, filter: &StrategyFilter) -> BiddingResult<(Vec<BidStrategy>, u64)>;

    async fn get(&self, id: i64) -> BiddingResult<Option<BidStrategy>>;

    /// Assigns the id and timestamps
    async fn create(&self, strategy: &NewStrategy) -> BiddingResult<BidStrategy>;

    /// Price changes are dropped for price-locked strategies
    async fn update(&self, id: i64, update: &StrategyUpdate) -> BiddingResult<BidStrategy>;

    /// Removes the strategy and its creative links
    async fn delete(&self, id: i64) -> BiddingResult<()>;

    async fn update_status(&self, id: i64, status: StrategyStatus) -> BiddingResult<BidStrategy>;

    async fn add_creative(&self, strategy_id: i64, creative_id: i64) -> BiddingResult<StrategyCreative>;

    async fn remove_creative(&self, strategy_id: i64, creative_id: i64) -> BiddingResult<()>;

    async fn list_creatives(&self, strategy_id: i64) -> BiddingResult<Vec<StrategyCreative>>;

    /// Daily sums over `[start, end]`, newest first
    async fn get_strategy_stats(
        &self,
        strategy_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> BiddingResult<Vec<StrategyStats>>;
}

/// Spend control for a strategy
#[trait_variant::make(BudgetGate: Send)]
pub trait LocalBudgetGate {
    /// `Ok(false)` when the charge would exceed the remaining budget
    async fn check_and_deduct(&self, strategy_id: i64, amount: f64) -> Result<bool, GateError>;

    /// Create or refresh the strategy's daily ledger entry
    async fn sync_strategy(&self, strategy: &BidStrategy) -> Result<(), GateError>;

    /// Forget the strategy's ledger entry
    async fn forget_strategy(&self, strategy_id: i64) -> Result<(), GateError>;
}

/// Impression caps per (user, strategy)
#[trait_variant::make(FrequencyGate: Send)]
pub trait LocalFrequencyGate {
    async fn check_impression(&self, user_id: &str, strategy_id: i64) -> Result<bool, GateError>;

    async fn record_impression(&self, user_id: &str, strategy_id: i64) -> Result<(), GateError>;
}

/// External audience targeting
#[trait_variant::make(TargetingService: Send)]
pub trait LocalTargetingService {
    async fn check_targeting(&self, user_id: &str) -> Result<bool, GateError>;

    async fn batch_check_targeting(
        &self,
        user_ids: &[String],
    ) -> Result<HashMap<String, bool>, GateError>;
}

/// Click-through-rate prediction
///
/// Must return a probability in `[0, 1]`; out-of-range values are clamped
/// by the engine.
pub trait CtrPredictor: Send + Sync {
    fn predict(&self, strategy: &BidStrategy, user_id: &str, slot: &AdSlot) -> f64;
}

/// Same CTR for every impression
#[derive(Debug, Clone, Copy)]
pub struct ConstantCtr(pub f64);

impl Default for ConstantCtr {
    fn default() -> Self {
        Self(0.01)
    }
}

impl CtrPredictor for ConstantCtr {
    fn predict(&self, _strategy: &BidStrategy, _user_id: &str, _slot: &AdSlot) -> f64 {
        self.0
    }
}
