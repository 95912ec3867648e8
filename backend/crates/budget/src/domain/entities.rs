//! Ledger entries

use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, TimeZone, Utc};
use derive_more::Display;
use kernel::money::MinorUnits;
use serde::{Deserialize, Serialize};

/// Budget period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum BudgetType {
    /// Resets with each UTC day; the remote counter expires with the window
    #[display("daily")]
    Daily,
    /// Spans the whole validity window
    #[display("total")]
    Total,
}

impl BudgetType {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "daily" => Some(Self::Daily),
            "total" => Some(Self::Total),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum BudgetState {
    #[default]
    #[display("active")]
    Active,
    #[display("inactive")]
    Inactive,
}

/// One ledger entry
///
/// All amounts are integer minor units; major-unit accessors exist for the
/// HTTP surface only.
#[derive(Debug, Clone, PartialEq)]
pub struct Budget {
    pub id: String,
    pub budget_type: BudgetType,
    pub cap: MinorUnits,
    pub spent: MinorUnits,
    /// Inclusive
    pub start_time: DateTime<Utc>,
    /// Exclusive
    pub end_time: DateTime<Utc>,
    pub state: BudgetState,
    pub updated_at: DateTime<Utc>,
    pub description: String,
}

impl Budget {
    /// Daily entry covering one UTC calendar day
    pub fn daily(id: impl Into<String>, cap: MinorUnits, day: NaiveDate) -> Self {
        let start_time = Utc.from_utc_datetime(&day.and_time(chrono::NaiveTime::MIN));
        Self {
            id: id.into(),
            budget_type: BudgetType::Daily,
            cap,
            spent: MinorUnits::ZERO,
            start_time,
            end_time: start_time + ChronoDuration::days(1),
            state: BudgetState::Active,
            updated_at: Utc::now(),
            description: String::new(),
        }
    }

    pub fn total(
        id: impl Into<String>,
        cap: MinorUnits,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            budget_type: BudgetType::Total,
            cap,
            spent: MinorUnits::ZERO,
            start_time,
            end_time,
            state: BudgetState::Active,
            updated_at: Utc::now(),
            description: String::new(),
        }
    }

    pub fn with_spent(mut self, spent: MinorUnits) -> Self {
        self.spent = spent;
        self
    }

    pub fn with_state(mut self, state: BudgetState) -> Self {
        self.state = state;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.state == BudgetState::Active
    }

    /// `now ∈ [start_time, end_time)`
    #[inline]
    pub fn is_within_window(&self, now: DateTime<Utc>) -> bool {
        self.start_time <= now && now < self.end_time
    }

    #[inline]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.end_time
    }

    #[inline]
    pub fn is_exceeded(&self) -> bool {
        self.spent >= self.cap
    }

    #[inline]
    pub fn remaining(&self) -> MinorUnits {
        self.cap.saturating_sub(self.spent).max(MinorUnits::ZERO)
    }

    #[inline]
    pub fn can_afford(&self, amount: MinorUnits) -> bool {
        self.spent + amount <= self.cap
    }

    pub fn amount(&self) -> f64 {
        self.cap.to_major()
    }

    pub fn spent_amount(&self) -> f64 {
        self.spent.to_major()
    }
}

/// Read-only status snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetStatus {
    pub budget_id: String,
    pub budget_type: BudgetType,
    pub amount: f64,
    pub spent: f64,
    pub remaining: f64,
    pub is_active: bool,
    pub is_exceeded: bool,
    pub is_expired: bool,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BudgetStatus {
    pub fn of(budget: &Budget, now: DateTime<Utc>) -> Self {
        Self {
            budget_id: budget.id.clone(),
            budget_type: budget.budget_type,
            amount: budget.amount(),
            spent: budget.spent_amount(),
            remaining: budget.remaining().to_major(),
            is_active: budget.is_active(),
            is_exceeded: budget.is_exceeded(),
            is_expired: budget.is_expired(now),
            start_time: budget.start_time,
            end_time: budget.end_time,
            updated_at: budget.updated_at,
        }
    }
}
