//! Runtime config routes
//!
//! `GET/PUT/DELETE /api/v1/configs/{key}` and
//! `GET /api/v1/configs/{key}/history/{version}`.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use kernel::error::app_error::AppError;
use platform::config::{ConfigError, ConfigItem, ConfigService, ConfigValue};
use platform::kv::KvStore;
use serde::Deserialize;

/// HTTP face of [`ConfigError`]
pub struct ConfigApiError(ConfigError);

impl From<ConfigError> for ConfigApiError {
    fn from(err: ConfigError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ConfigApiError {
    fn into_response(self) -> Response {
        let message = self.0.to_string();
        let err = match self.0 {
            ConfigError::NotFound(_) | ConfigError::VersionNotFound { .. } => {
                AppError::not_found(message)
            }
            ConfigError::EmptyKey | ConfigError::InvalidEnv { .. } => {
                AppError::bad_request(message)
            }
            corrupt @ ConfigError::Corrupt { .. } => {
                tracing::error!(error = %message, "Corrupt config entry");
                AppError::internal("Internal error").with_source(corrupt)
            }
            ConfigError::Store(source) => {
                tracing::error!(error = %source, "Config store error");
                AppError::service_unavailable("Config store unavailable").with_source(source)
            }
        };
        err.into_response()
    }
}

type ConfigApiResult<T> = Result<T, ConfigApiError>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetConfigRequest {
    pub value: ConfigValue,
    #[serde(default = "default_updated_by")]
    pub updated_by: String,
}

fn default_updated_by() -> String {
    "api".to_string()
}

struct ConfigAppState<S> {
    service: Arc<ConfigService<S>>,
}

impl<S> Clone for ConfigAppState<S> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
        }
    }
}

async fn get_config<S>(
    State(state): State<ConfigAppState<S>>,
    Path(key): Path<String>,
) -> ConfigApiResult<Json<ConfigItem>>
where
    S: KvStore + Send + Sync + 'static,
{
    Ok(Json(state.service.get_config(&key).await?))
}

async fn set_config<S>(
    State(state): State<ConfigAppState<S>>,
    Path(key): Path<String>,
    Json(req): Json<SetConfigRequest>,
) -> ConfigApiResult<Json<ConfigItem>>
where
    S: KvStore + Send + Sync + 'static,
{
    let item = state
        .service
        .set_config(&key, req.value, &req.updated_by)
        .await?;
    Ok(Json(item))
}

async fn delete_config<S>(
    State(state): State<ConfigAppState<S>>,
    Path(key): Path<String>,
) -> ConfigApiResult<StatusCode>
where
    S: KvStore + Send + Sync + 'static,
{
    state.service.delete_config(&key).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_config_history<S>(
    State(state): State<ConfigAppState<S>>,
    Path((key, version)): Path<(String, i64)>,
) -> ConfigApiResult<Json<ConfigItem>>
where
    S: KvStore + Send + Sync + 'static,
{
    Ok(Json(state.service.get_config_history(&key, version).await?))
}

pub fn config_router<S>(service: Arc<ConfigService<S>>) -> Router
where
    S: KvStore + Send + Sync + 'static,
{
    let state = ConfigAppState { service };

    Router::new()
        .route(
            "/{key}",
            get(get_config::<S>)
                .put(set_config::<S>)
                .delete(delete_config::<S>),
        )
        .route("/{key}/history/{version}", get(get_config_history::<S>))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use platform::memory::MemoryKvStore;
    use tower::ServiceExt;

    use super::*;

    fn app() -> Router {
        config_router(Arc::new(ConfigService::new(MemoryKvStore::new())))
    }

    fn put(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::put(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_put_then_read_versions() {
        let app = app();

        let response = app
            .clone()
            .oneshot(put(
                "/bid.floor",
                serde_json::json!({"value": {"type": "number", "value": 0.1}, "updatedBy": "ops"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        app.clone()
            .oneshot(put(
                "/bid.floor",
                serde_json::json!({"value": {"type": "number", "value": 0.2}}),
            ))
            .await
            .unwrap();

        let response = app
            .clone()
            .oneshot(Request::get("/bid.floor").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let current: ConfigItem = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(current.version, 2);
        assert_eq!(current.value, ConfigValue::Number(0.2));
        assert_eq!(current.updated_by, "api");

        let response = app
            .oneshot(
                Request::get("/bid.floor/history/1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let first: ConfigItem = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(first.updated_by, "ops");
    }

    #[tokio::test]
    async fn test_missing_key_is_404_and_delete_is_204() {
        let app = app();

        let response = app
            .clone()
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        app.clone()
            .oneshot(put("/flag", serde_json::json!({"value": {"type": "bool", "value": true}})))
            .await
            .unwrap();
        let response = app
            .clone()
            .oneshot(Request::delete("/flag").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(Request::delete("/flag").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_store_outage_is_503() {
        let store = MemoryKvStore::new();
        store.set_offline(true);
        let app = config_router(Arc::new(ConfigService::new(store)));

        let response = app
            .oneshot(Request::get("/bid.floor").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
