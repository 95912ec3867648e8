//! Frequency Router

use std::sync::Arc;

use axum::{Router, routing::get};
use platform::kv::KvStore;

use crate::application::controller::FrequencyController;
use crate::presentation::handlers::{self, FrequencyAppState};

/// Admin routes, to be nested under `/api/v1/frequency`
pub fn frequency_router<S>(controller: Arc<FrequencyController<S>>) -> Router
where
    S: KvStore + Sync + 'static,
{
    let state = FrequencyAppState { controller };

    Router::new()
        .route(
            "/{target_id}/config",
            get(handlers::get_config::<S>)
                .put(handlers::update_config::<S>)
                .delete(handlers::reset_config::<S>),
        )
        .route("/{target_id}/stats", get(handlers::get_stats::<S>))
        .with_state(state)
}
