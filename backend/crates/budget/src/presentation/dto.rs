//! API DTOs (Data Transfer Objects)

use chrono::{DateTime, Utc};
use kernel::money::MinorUnits;
use serde::{Deserialize, Serialize};

use crate::domain::entities::{Budget, BudgetState, BudgetType};
use crate::error::{BudgetError, BudgetResult};

/// Request for POST /api/v1/budgets
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBudgetRequest {
    pub id: String,
    #[serde(rename = "type")]
    pub budget_type: String,
    /// Major units
    pub amount: f64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub status: BudgetState,
    #[serde(default)]
    pub description: String,
}

impl CreateBudgetRequest {
    pub fn into_budget(self) -> BudgetResult<Budget> {
        let budget_type = BudgetType::from_code(&self.budget_type)
            .ok_or_else(|| BudgetError::InvalidType(self.budget_type.clone()))?;
        Ok(Budget {
            id: self.id,
            budget_type,
            cap: MinorUnits::from_major(self.amount),
            spent: MinorUnits::ZERO,
            start_time: self.start_time,
            end_time: self.end_time,
            state: self.status,
            updated_at: Utc::now(),
            description: self.description,
        })
    }
}

/// Request for PUT /api/v1/budgets/{id}
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBudgetRequest {
    #[serde(rename = "type")]
    pub budget_type: String,
    pub amount: f64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: BudgetState,
    #[serde(default)]
    pub description: String,
}

impl UpdateBudgetRequest {
    pub fn into_budget(self, id: String) -> BudgetResult<Budget> {
        CreateBudgetRequest {
            id,
            budget_type: self.budget_type,
            amount: self.amount,
            start_time: self.start_time,
            end_time: self.end_time,
            status: self.status,
            description: self.description,
        }
        .into_budget()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetResponse {
    pub id: String,
    #[serde(rename = "type")]
    pub budget_type: BudgetType,
    pub amount: f64,
    pub spent: f64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: BudgetState,
    pub updated_at: DateTime<Utc>,
    pub description: String,
}

impl From<Budget> for BudgetResponse {
    fn from(budget: Budget) -> Self {
        Self {
            amount: budget.amount(),
            spent: budget.spent_amount(),
            id: budget.id,
            budget_type: budget.budget_type,
            start_time: budget.start_time,
            end_time: budget.end_time,
            status: budget.state,
            updated_at: budget.updated_at,
            description: budget.description,
        }
    }
}
