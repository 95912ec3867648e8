//! Budget Error Types
//!
//! Ledger-specific error variants that integrate with the unified
//! `kernel::error::AppError` system.
//!
//! An exceeded budget is not an error: `check_and_deduct` returns `Ok(false)`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use platform::kv::StoreError;
use thiserror::Error;

/// Budget-specific result type alias
pub type BudgetResult<T> = Result<T, BudgetError>;

#[derive(Debug, Error)]
pub enum BudgetError {
    #[error("Budget not found: {0}")]
    NotFound(String),

    #[error("Budget already exists: {0}")]
    AlreadyExists(String),

    #[error("Budget is inactive: {0}")]
    Inactive(String),

    /// Outside `[start_time, end_time)`
    #[error("Budget is outside its validity window: {0}")]
    Expired(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid validity window: start must be before end")]
    InvalidWindow,

    #[error("Invalid budget type: {0}")]
    InvalidType(String),

    #[error("Budget id must not be empty")]
    InvalidId,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl BudgetError {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BudgetError::NotFound(_) => ErrorKind::NotFound,
            BudgetError::AlreadyExists(_) => ErrorKind::Conflict,
            BudgetError::Inactive(_) | BudgetError::Expired(_) => ErrorKind::UnprocessableEntity,
            BudgetError::InvalidAmount(_)
            | BudgetError::InvalidWindow
            | BudgetError::InvalidType(_)
            | BudgetError::InvalidId => ErrorKind::BadRequest,
            BudgetError::Store(_) => ErrorKind::ServiceUnavailable,
        }
    }

    fn log(&self) {
        match self {
            BudgetError::Store(e) => {
                tracing::error!(error = %e, "Budget store error");
            }
            _ => {
                tracing::debug!(error = %self, "Budget error");
            }
        }
    }
}

impl From<BudgetError> for AppError {
    fn from(err: BudgetError) -> Self {
        let kind = err.kind();
        match err {
            // Store details stay in the logs
            BudgetError::Store(source) => {
                AppError::service_unavailable("Budget store unavailable").with_source(source)
            }
            other => AppError::new(kind, other.to_string()),
        }
    }
}

impl IntoResponse for BudgetError {
    fn into_response(self) -> Response {
        self.log();
        AppError::from(self).into_response()
    }
}
