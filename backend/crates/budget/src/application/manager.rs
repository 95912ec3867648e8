//! Budget Manager
//!
//! Holds the in-memory ledger snapshot for one process and commits spend to
//! the shared [`KvStore`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use kernel::money::MinorUnits;
use platform::kv::KvStore;

use crate::application::config::BudgetConfig;
use crate::domain::entities::{Budget, BudgetStatus, BudgetType};
use crate::domain::services::{charge_for, counter_ttl, crosses_threshold, spent_key};
use crate::error::{BudgetError, BudgetResult};

/// Budget ledger
///
/// The mutex only guards this process's snapshot and is never held across
/// an `.await`. Cross-instance consistency comes from the store.
pub struct BudgetManager<S> {
    store: Arc<S>,
    budgets: Mutex<HashMap<String, Budget>>,
    config: Arc<BudgetConfig>,
}

impl<S> BudgetManager<S>
where
    S: KvStore + Sync,
{
    pub fn new(store: Arc<S>, config: Arc<BudgetConfig>) -> Self {
        Self {
            store,
            budgets: Mutex::new(HashMap::new()),
            config,
        }
    }

    fn ledger(&self) -> MutexGuard<'_, HashMap<String, Budget>> {
        self.budgets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn validate(budget: &Budget) -> BudgetResult<()> {
        if budget.id.trim().is_empty() {
            return Err(BudgetError::InvalidId);
        }
        if !budget.cap.is_positive() {
            return Err(BudgetError::InvalidAmount(budget.cap.to_string()));
        }
        if budget.spent.get() < 0 {
            return Err(BudgetError::InvalidAmount(budget.spent.to_string()));
        }
        if budget.start_time >= budget.end_time {
            return Err(BudgetError::InvalidWindow);
        }
        Ok(())
    }

    /// Register a new ledger entry. Fails if the id exists.
    pub fn add_budget(&self, budget: Budget) -> BudgetResult<()> {
        Self::validate(&budget)?;

        let mut budgets = self.ledger();
        if budgets.contains_key(&budget.id) {
            return Err(BudgetError::AlreadyExists(budget.id));
        }

        tracing::info!(
            budget_id = %budget.id,
            budget_type = %budget.budget_type,
            cap = %budget.cap,
            "Budget added"
        );
        budgets.insert(budget.id.clone(), budget);
        Ok(())
    }

    /// Replace an existing entry. Spend is owned by the ledger, so the
    /// larger of the stored and supplied spend is kept.
    pub fn update_budget(&self, mut budget: Budget) -> BudgetResult<()> {
        Self::validate(&budget)?;

        let mut budgets = self.ledger();
        let Some(existing) = budgets.get_mut(&budget.id) else {
            return Err(BudgetError::NotFound(budget.id));
        };

        budget.spent = budget.spent.max(existing.spent);
        budget.updated_at = Utc::now();
        tracing::info!(
            budget_id = %budget.id,
            cap = %budget.cap,
            state = %budget.state,
            "Budget updated"
        );
        *existing = budget;
        Ok(())
    }

    pub fn get_budget(&self, budget_id: &str) -> BudgetResult<Budget> {
        self.ledger()
            .get(budget_id)
            .cloned()
            .ok_or_else(|| BudgetError::NotFound(budget_id.to_string()))
    }

    /// Snapshot derived from the in-memory entry. No side effects.
    pub fn get_budget_status(&self, budget_id: &str) -> BudgetResult<BudgetStatus> {
        let budgets = self.ledger();
        let budget = budgets
            .get(budget_id)
            .ok_or_else(|| BudgetError::NotFound(budget_id.to_string()))?;
        Ok(BudgetStatus::of(budget, Utc::now()))
    }

    pub fn remove_budget(&self, budget_id: &str) -> BudgetResult<Budget> {
        let removed = self
            .ledger()
            .remove(budget_id)
            .ok_or_else(|| BudgetError::NotFound(budget_id.to_string()))?;
        tracing::info!(budget_id = %budget_id, "Budget removed");
        Ok(removed)
    }

    /// All entries ordered by id
    pub fn list_budgets(&self) -> Vec<Budget> {
        let mut budgets: Vec<Budget> = self.ledger().values().cloned().collect();
        budgets.sort_by(|a, b| a.id.cmp(&b.id));
        budgets
    }

    /// Move an expired daily entry onto the current UTC day with no spend.
    ///
    /// Cap, state and description carry over. Returns `false` when the entry
    /// is not daily or is still inside its window.
    pub fn roll_over_daily(&self, budget_id: &str) -> BudgetResult<bool> {
        let now = Utc::now();
        let mut budgets = self.ledger();
        let budget = budgets
            .get_mut(budget_id)
            .ok_or_else(|| BudgetError::NotFound(budget_id.to_string()))?;
        if budget.budget_type != BudgetType::Daily || !budget.is_expired(now) {
            return Ok(false);
        }

        let day = now.date_naive();
        *budget = Budget::daily(budget.id.clone(), budget.cap, day)
            .with_state(budget.state)
            .with_description(budget.description.clone());
        tracing::info!(budget_id = %budget_id, day = %day, "Daily budget rolled over");
        Ok(true)
    }

    /// Pull the shared spend counter into the local entry.
    ///
    /// Returns the resulting local spend.
    pub async fn hydrate(&self, budget_id: &str) -> BudgetResult<MinorUnits> {
        // Fail fast before the round trip
        self.get_budget(budget_id)?;

        let remote = self.store.get_counter(&spent_key(budget_id)).await?;

        let mut budgets = self.ledger();
        let budget = budgets
            .get_mut(budget_id)
            .ok_or_else(|| BudgetError::NotFound(budget_id.to_string()))?;
        if let Some(remote) = remote {
            budget.spent = budget.spent.max(MinorUnits::new(remote));
            budget.updated_at = Utc::now();
        }
        tracing::debug!(budget_id = %budget_id, spent = %budget.spent, "Budget hydrated");
        Ok(budget.spent)
    }

    /// Atomically deduct `amount` (major units) from the budget.
    ///
    /// - `Ok(true)`: committed
    /// - `Ok(false)`: the cap would be exceeded; nothing committed
    /// - `Err(_)`: unknown, inactive or out-of-window budget, invalid
    ///   amount, or store failure; nothing committed
    pub async fn check_and_deduct(&self, budget_id: &str, amount: f64) -> BudgetResult<bool> {
        let charge =
            charge_for(amount).ok_or_else(|| BudgetError::InvalidAmount(amount.to_string()))?;
        let now = Utc::now();

        // Local fast reject; the lock is released before any await.
        let (cap, ttl) = {
            let budgets = self.ledger();
            let budget = budgets
                .get(budget_id)
                .ok_or_else(|| BudgetError::NotFound(budget_id.to_string()))?;
            if !budget.is_active() {
                return Err(BudgetError::Inactive(budget_id.to_string()));
            }
            if !budget.is_within_window(now) {
                return Err(BudgetError::Expired(budget_id.to_string()));
            }
            if !budget.can_afford(charge) {
                tracing::debug!(
                    budget_id = %budget_id,
                    spent = %budget.spent,
                    charge = %charge,
                    cap = %budget.cap,
                    "Budget exceeded (local snapshot)"
                );
                return Ok(false);
            }
            (budget.cap, counter_ttl(budget, now))
        };

        let key = spent_key(budget_id);
        let committed = if self.config.strict_cap {
            match self
                .store
                .incr_by_capped(&key, charge.get(), cap.get(), ttl)
                .await?
            {
                Some(value) => value,
                None => {
                    tracing::debug!(
                        budget_id = %budget_id,
                        charge = %charge,
                        cap = %cap,
                        "Budget exceeded (shared counter)"
                    );
                    return Ok(false);
                }
            }
        } else {
            self.store.incr_by(&key, charge.get(), ttl).await?
        };

        let after = MinorUnits::new(committed);
        let before = after - charge;

        if let Some(budget) = self.ledger().get_mut(budget_id) {
            budget.spent = budget.spent.max(after);
            budget.updated_at = Utc::now();
        }

        if after > cap {
            tracing::warn!(
                budget_id = %budget_id,
                spent = %after,
                cap = %cap,
                "Budget overshoot from concurrent deductions"
            );
        } else if crosses_threshold(before, after, cap, self.config.warning_threshold) {
            tracing::warn!(
                budget_id = %budget_id,
                spent = %after,
                cap = %cap,
                threshold = self.config.warning_threshold,
                "Budget warning threshold reached"
            );
        }

        Ok(true)
    }
}
