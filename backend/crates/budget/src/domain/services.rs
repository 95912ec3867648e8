//! Pure ledger rules

use std::time::Duration;

use chrono::{DateTime, Utc};
use kernel::money::MinorUnits;

use crate::domain::entities::{Budget, BudgetType};

/// Remote spend counter for a budget
pub fn spent_key(budget_id: &str) -> String {
    format!("budget:spent:{}", budget_id)
}

/// Minor units to deduct for a major-unit price.
///
/// Rounds half up; a positive price below half a minor unit still costs
/// one minor unit. `None` for non-finite or non-positive input.
pub fn charge_for(amount: f64) -> Option<MinorUnits> {
    if !amount.is_finite() || amount <= 0.0 {
        return None;
    }
    Some(MinorUnits::from_major(amount).max(MinorUnits::new(1)))
}

/// Expiry for the remote counter.
///
/// Daily counters live until the end of their window so the next day's
/// entry starts from zero; total counters never expire.
pub fn counter_ttl(budget: &Budget, now: DateTime<Utc>) -> Option<Duration> {
    match budget.budget_type {
        BudgetType::Daily => (budget.end_time - now).to_std().ok(),
        BudgetType::Total => None,
    }
}

/// `true` when moving from `before` to `after` crosses `threshold × cap`
pub fn crosses_threshold(before: MinorUnits, after: MinorUnits, cap: MinorUnits, threshold: f64) -> bool {
    if !(0.0..=1.0).contains(&threshold) || !cap.is_positive() {
        return false;
    }
    let mark = (cap.get() as f64 * threshold).ceil() as i64;
    before.get() < mark && after.get() >= mark
}
