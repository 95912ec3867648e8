//! HTTP Handlers

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use platform::kv::KvStore;

use crate::application::manager::BudgetManager;
use crate::domain::entities::BudgetStatus;
use crate::error::BudgetResult;
use crate::presentation::dto::{BudgetResponse, CreateBudgetRequest, UpdateBudgetRequest};

/// Shared state for budget handlers
pub struct BudgetAppState<S> {
    pub manager: Arc<BudgetManager<S>>,
}

impl<S> Clone for BudgetAppState<S> {
    fn clone(&self) -> Self {
        Self {
            manager: self.manager.clone(),
        }
    }
}

/// POST /api/v1/budgets
pub async fn create_budget<S>(
    State(state): State<BudgetAppState<S>>,
    Json(req): Json<CreateBudgetRequest>,
) -> BudgetResult<(StatusCode, Json<BudgetResponse>)>
where
    S: KvStore + Sync + 'static,
{
    let budget = req.into_budget()?;
    let id = budget.id.clone();
    state.manager.add_budget(budget)?;
    // Pick up spend already committed by other instances
    state.manager.hydrate(&id).await?;
    let created = state.manager.get_budget(&id)?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

/// GET /api/v1/budgets
pub async fn list_budgets<S>(State(state): State<BudgetAppState<S>>) -> Json<Vec<BudgetResponse>>
where
    S: KvStore + Sync + 'static,
{
    Json(
        state
            .manager
            .list_budgets()
            .into_iter()
            .map(BudgetResponse::from)
            .collect(),
    )
}

/// GET /api/v1/budgets/{id}
pub async fn get_budget<S>(
    State(state): State<BudgetAppState<S>>,
    Path(id): Path<String>,
) -> BudgetResult<Json<BudgetResponse>>
where
    S: KvStore + Sync + 'static,
{
    Ok(Json(state.manager.get_budget(&id)?.into()))
}

/// PUT /api/v1/budgets/{id}
pub async fn update_budget<S>(
    State(state): State<BudgetAppState<S>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateBudgetRequest>,
) -> BudgetResult<Json<BudgetResponse>>
where
    S: KvStore + Sync + 'static,
{
    let budget = req.into_budget(id.clone())?;
    state.manager.update_budget(budget)?;
    Ok(Json(state.manager.get_budget(&id)?.into()))
}

/// DELETE /api/v1/budgets/{id}
pub async fn delete_budget<S>(
    State(state): State<BudgetAppState<S>>,
    Path(id): Path<String>,
) -> BudgetResult<StatusCode>
where
    S: KvStore + Sync + 'static,
{
    state.manager.remove_budget(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/budgets/{id}/status
pub async fn get_budget_status<S>(
    State(state): State<BudgetAppState<S>>,
    Path(id): Path<String>,
) -> BudgetResult<Json<BudgetStatus>>
where
    S: KvStore + Sync + 'static,
{
    Ok(Json(state.manager.get_budget_status(&id)?))
}
