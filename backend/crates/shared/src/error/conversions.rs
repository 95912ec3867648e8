//! Feature-gated integrations: sqlx error classification and axum rendering

#[cfg(any(feature = "sqlx", feature = "axum"))]
use super::app_error::AppError;

/// Pool and connectivity failures are 503; constraint violations map onto
/// caller errors; everything else is a terse 500.
#[cfg(feature = "sqlx")]
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        let classified = match &err {
            sqlx::Error::RowNotFound => AppError::not_found("Record not found"),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                AppError::service_unavailable("Database unavailable")
            }
            // https://www.postgresql.org/docs/current/errcodes-appendix.html
            sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
                Some("23505") => AppError::conflict("Duplicate entry"),
                Some("23503") => AppError::bad_request("Referenced entry does not exist"),
                Some("23514") => AppError::bad_request("Value out of range"),
                Some(code) if code.starts_with("53") || code.starts_with("57") => {
                    AppError::service_unavailable("Database unavailable")
                }
                _ => AppError::internal("Database error"),
            },
            _ => AppError::internal("Database error"),
        };
        classified.with_source(err)
    }
}

/// RFC 7807 problem body
#[cfg(feature = "axum")]
impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::Json;
        use axum::http::StatusCode;

        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let body = serde_json::json!({
            "type": format!("https://httpstatuses.io/{}", self.status_code()),
            "title": self.kind().reason(),
            "status": self.status_code(),
            "detail": self.message(),
            "action": self.action(),
        });

        (status, Json(body)).into_response()
    }
}
