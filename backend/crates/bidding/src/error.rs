//! Bidding Error Types
//!
//! Request-level errors only. Per-candidate failures (budget, frequency,
//! panics) are absorbed inside the engine and never reach this type.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use budget::BudgetError;
use frequency::FrequencyError;
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

pub type BiddingResult<T> = Result<T, BiddingError>;

#[derive(Debug, Error)]
pub enum BiddingError {
    /// Malformed or missing input; nothing was touched
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// No candidate survived evaluation. A normal no-fill outcome.
    #[error("No available ads")]
    NoAvailableAds,

    #[error("Too many requests")]
    RateLimited,

    /// Targeting service failed or timed out
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Strategy not found: {0}")]
    StrategyNotFound(i64),

    #[error("Creative {creative_id} is not linked to strategy {strategy_id}")]
    CreativeNotLinked { strategy_id: i64, creative_id: i64 },

    #[error("Creative {creative_id} is already linked to strategy {strategy_id}")]
    CreativeAlreadyLinked { strategy_id: i64, creative_id: i64 },

    /// Admin input that fails catalog validation
    #[error("Invalid strategy: {0}")]
    InvalidStrategy(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BiddingError {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BiddingError::InvalidRequest(_) | BiddingError::InvalidStrategy(_) => {
                ErrorKind::BadRequest
            }
            // Handlers turn this into a 200 no-fill body before it gets here
            BiddingError::NoAvailableAds => ErrorKind::NotFound,
            BiddingError::RateLimited => ErrorKind::TooManyRequests,
            BiddingError::ServiceUnavailable(_) => ErrorKind::ServiceUnavailable,
            BiddingError::StrategyNotFound(_) | BiddingError::CreativeNotLinked { .. } => {
                ErrorKind::NotFound
            }
            BiddingError::CreativeAlreadyLinked { .. } => ErrorKind::Conflict,
            BiddingError::Database(_) | BiddingError::Internal(_) => ErrorKind::InternalServerError,
        }
    }

    fn log(&self) {
        match self {
            BiddingError::Database(e) => {
                tracing::error!(error = %e, "Bidding database error");
            }
            BiddingError::Internal(msg) => {
                tracing::error!(message = %msg, "Bidding internal error");
            }
            BiddingError::ServiceUnavailable(reason) => {
                tracing::warn!(reason = %reason, "Bidding dependency unavailable");
            }
            BiddingError::RateLimited => {
                tracing::warn!("Inbound bid traffic rate limited");
            }
            _ => {
                tracing::debug!(error = %self, "Bidding error");
            }
        }
    }
}

impl From<BiddingError> for AppError {
    fn from(err: BiddingError) -> Self {
        match err {
            // Connection details and SQL stay in the logs
            BiddingError::Database(source) => AppError::from(source),
            BiddingError::Internal(_) => AppError::internal("Internal error"),
            BiddingError::ServiceUnavailable(_) => {
                AppError::service_unavailable("Targeting service unavailable")
            }
            BiddingError::RateLimited => AppError::too_many_requests("Too many bid requests")
                .with_action("Retry after a short delay"),
            other => AppError::new(other.kind(), other.to_string()),
        }
    }
}

impl IntoResponse for BiddingError {
    fn into_response(self) -> Response {
        self.log();
        AppError::from(self).into_response()
    }
}

/// Failure of a collaborator consulted while evaluating a candidate or
/// gating a request
#[derive(Debug, Error)]
pub enum GateError {
    #[error(transparent)]
    Budget(#[from] BudgetError),

    #[error(transparent)]
    Frequency(#[from] FrequencyError),

    #[error("Targeting error: {0}")]
    Targeting(String),
}
