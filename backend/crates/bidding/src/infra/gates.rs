//! Ledger and frequency adapters
//!
//! Strategies are identified in the ledger and the frequency store by their
//! numeric id rendered as a string.

use budget::{Budget, BudgetError, BudgetManager, BudgetState};
use chrono::Utc;
use frequency::FrequencyController;
use kernel::money::MinorUnits;
use platform::kv::KvStore;

use crate::domain::entities::BidStrategy;
use crate::domain::repository::{BudgetGate, FrequencyGate};
use crate::error::GateError;

/// Today's daily ledger entry for a strategy
pub fn daily_budget_for(strategy: &BidStrategy) -> Budget {
    let state = if strategy.status.is_enabled() {
        BudgetState::Active
    } else {
        BudgetState::Inactive
    };
    Budget::daily(
        strategy.id.to_string(),
        MinorUnits::from_major(strategy.daily_budget),
        Utc::now().date_naive(),
    )
    .with_state(state)
    .with_description(strategy.name.clone())
}

impl<S> BudgetGate for BudgetManager<S>
where
    S: KvStore + Send + Sync,
{
    async fn check_and_deduct(&self, strategy_id: i64, amount: f64) -> Result<bool, GateError> {
        let id = strategy_id.to_string();
        match BudgetManager::check_and_deduct(self, &id, amount).await {
            // Past midnight before the periodic resync got to this entry
            Err(BudgetError::Expired(_)) if self.roll_over_daily(&id)? => {
                self.hydrate(&id).await?;
                Ok(BudgetManager::check_and_deduct(self, &id, amount).await?)
            }
            result => Ok(result?),
        }
    }

    async fn sync_strategy(&self, strategy: &BidStrategy) -> Result<(), GateError> {
        let budget = daily_budget_for(strategy);
        let id = budget.id.clone();
        match self.add_budget(budget.clone()) {
            Ok(()) => {}
            Err(BudgetError::AlreadyExists(_)) => {
                let existing = self.get_budget(&id)?;
                if existing.start_time == budget.start_time {
                    self.update_budget(budget)?;
                } else {
                    // New day: yesterday's spend must not carry over
                    self.remove_budget(&id)?;
                    self.add_budget(budget)?;
                }
            }
            Err(e) => return Err(e.into()),
        }
        // Spend committed by other instances today
        self.hydrate(&id).await?;
        Ok(())
    }

    async fn forget_strategy(&self, strategy_id: i64) -> Result<(), GateError> {
        match self.remove_budget(&strategy_id.to_string()) {
            Ok(_) | Err(BudgetError::NotFound(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl<S> FrequencyGate for FrequencyController<S>
where
    S: KvStore + Send + Sync,
{
    async fn check_impression(&self, user_id: &str, strategy_id: i64) -> Result<bool, GateError> {
        Ok(FrequencyController::check_impression(self, user_id, &strategy_id.to_string()).await?)
    }

    async fn record_impression(&self, user_id: &str, strategy_id: i64) -> Result<(), GateError> {
        FrequencyController::record_impression(self, user_id, &strategy_id.to_string()).await?;
        Ok(())
    }
}
