//! Budget Router

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use platform::kv::KvStore;

use crate::application::manager::BudgetManager;
use crate::presentation::handlers::{self, BudgetAppState};

/// Admin routes, to be nested under `/api/v1/budgets`
pub fn budget_router<S>(manager: Arc<BudgetManager<S>>) -> Router
where
    S: KvStore + Sync + 'static,
{
    let state = BudgetAppState { manager };

    Router::new()
        .route(
            "/",
            post(handlers::create_budget::<S>).get(handlers::list_budgets::<S>),
        )
        .route(
            "/{id}",
            get(handlers::get_budget::<S>)
                .put(handlers::update_budget::<S>)
                .delete(handlers::delete_budget::<S>),
        )
        .route("/{id}/status", get(handlers::get_budget_status::<S>))
        .with_state(state)
}
