//! Audience targeting clients

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::repository::TargetingService;
use crate::error::GateError;

/// Envelope returned by the targeting service
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: i64,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct CheckData {
    is_targeted: bool,
}

#[derive(Debug, Deserialize)]
struct BatchData {
    #[serde(default)]
    results: HashMap<String, bool>,
}

#[derive(Debug, Serialize)]
struct BatchRequest<'a> {
    user_ids: &'a [String],
}

/// HTTP client for the external targeting service
///
/// - `GET {base}/api/v1/rta/check?user_id=...`
/// - `POST {base}/api/v1/rta/batch_check`
///
/// A non-success status or a non-zero `code` is an error.
#[derive(Debug, Clone)]
pub struct HttpTargetingClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpTargetingClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, GateError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GateError::Targeting(format!("client setup failed: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read<T>(response: reqwest::Response) -> Result<T, GateError>
    where
        T: for<'de> Deserialize<'de>,
    {
        if !response.status().is_success() {
            return Err(GateError::Targeting(format!(
                "unexpected status {}",
                response.status()
            )));
        }

        let envelope = response
            .json::<Envelope<T>>()
            .await
            .map_err(|e| GateError::Targeting(format!("invalid response: {}", e)))?;

        if envelope.code != 0 {
            return Err(GateError::Targeting(format!(
                "code {}: {}",
                envelope.code, envelope.message
            )));
        }
        envelope
            .data
            .ok_or_else(|| GateError::Targeting("response without data".to_string()))
    }
}

impl TargetingService for HttpTargetingClient {
    async fn check_targeting(&self, user_id: &str) -> Result<bool, GateError> {
        let response = self
            .http
            .get(self.url("/api/v1/rta/check"))
            .query(&[("user_id", user_id)])
            .send()
            .await
            .map_err(|e| GateError::Targeting(format!("request failed: {}", e)))?;

        let data: CheckData = Self::read(response).await?;
        Ok(data.is_targeted)
    }

    async fn batch_check_targeting(
        &self,
        user_ids: &[String],
    ) -> Result<HashMap<String, bool>, GateError> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let response = self
            .http
            .post(self.url("/api/v1/rta/batch_check"))
            .json(&BatchRequest { user_ids })
            .send()
            .await
            .map_err(|e| GateError::Targeting(format!("request failed: {}", e)))?;

        let data: BatchData = Self::read(response).await?;
        Ok(data.results)
    }
}

/// Fixed answer for every user; stands in when no targeting service is
/// configured
#[derive(Debug, Clone, Copy)]
pub struct StaticTargeting(pub bool);

impl TargetingService for StaticTargeting {
    async fn check_targeting(&self, _user_id: &str) -> Result<bool, GateError> {
        Ok(self.0)
    }

    async fn batch_check_targeting(
        &self,
        user_ids: &[String],
    ) -> Result<HashMap<String, bool>, GateError> {
        Ok(user_ids.iter().map(|id| (id.clone(), self.0)).collect())
    }
}
