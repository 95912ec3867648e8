//! Frequency Error Types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use platform::kv::StoreError;
use thiserror::Error;

pub type FrequencyResult<T> = Result<T, FrequencyError>;

#[derive(Debug, Error)]
pub enum FrequencyError {
    /// A limit, window or QPS value is not strictly positive
    #[error("Invalid frequency config: {0}")]
    InvalidConfig(String),

    #[error("User id must not be empty")]
    InvalidUserId,

    #[error("Target id must not be empty")]
    InvalidTargetId,

    #[error("Stored config for {target_id} is unreadable: {source}")]
    CorruptConfig {
        target_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl FrequencyError {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            FrequencyError::InvalidConfig(_)
            | FrequencyError::InvalidUserId
            | FrequencyError::InvalidTargetId => ErrorKind::BadRequest,
            FrequencyError::CorruptConfig { .. } => ErrorKind::InternalServerError,
            FrequencyError::Store(_) => ErrorKind::ServiceUnavailable,
        }
    }

    fn log(&self) {
        match self {
            FrequencyError::Store(e) => {
                tracing::error!(error = %e, "Frequency store error");
            }
            FrequencyError::CorruptConfig { target_id, source } => {
                tracing::error!(target_id = %target_id, error = %source, "Corrupt frequency config");
            }
            _ => {
                tracing::debug!(error = %self, "Frequency error");
            }
        }
    }
}

impl From<FrequencyError> for AppError {
    fn from(err: FrequencyError) -> Self {
        match err {
            FrequencyError::Store(source) => {
                AppError::service_unavailable("Frequency store unavailable").with_source(source)
            }
            FrequencyError::CorruptConfig { source, .. } => {
                AppError::internal("Frequency config unreadable").with_source(source)
            }
            other => AppError::new(other.kind(), other.to_string()),
        }
    }
}

impl IntoResponse for FrequencyError {
    fn into_response(self) -> Response {
        self.log();
        AppError::from(self).into_response()
    }
}
