//! Traffic Handler
//!
//! Boundary in front of the engine: validation, inbound QPS shaping, the
//! targeting gate and the end-to-end deadline.
//!
//! Failure policy:
//! - limiter store errors fail open (shaping is not worth dropping traffic)
//! - targeting errors and timeouts fail closed with `ServiceUnavailable`
//! - an engine no-fill is an outcome, not an error

use std::sync::Arc;

use platform::rate_limit::RateLimitStore;
use tokio::time::{Instant, timeout_at};

use crate::application::config::TrafficConfig;
use crate::application::engine::BidProcessor;
use crate::domain::entities::{BidRequest, BidResponse};
use crate::domain::repository::TargetingService;
use crate::domain::services::validate_traffic_request;
use crate::error::{BiddingError, BiddingResult};

/// Limiter key shared by all inbound bid traffic
const INBOUND_KEY: &str = "inbound";

/// Result of a handled bid request
#[derive(Debug, Clone, PartialEq)]
pub enum TrafficOutcome {
    Filled(BidResponse),
    /// Completed normally without an ad
    NoFill(&'static str),
}

pub struct TrafficService<E, T, L> {
    engine: Arc<E>,
    targeting: Arc<T>,
    limiter: Arc<L>,
    config: Arc<TrafficConfig>,
}

impl<E, T, L> TrafficService<E, T, L>
where
    E: BidProcessor + Send + Sync,
    T: TargetingService + Send + Sync,
    L: RateLimitStore + Send + Sync,
{
    pub fn new(engine: Arc<E>, targeting: Arc<T>, limiter: Arc<L>, config: Arc<TrafficConfig>) -> Self {
        Self {
            engine,
            targeting,
            limiter,
            config,
        }
    }

    pub fn config(&self) -> &TrafficConfig {
        &self.config
    }

    pub async fn handle(&self, request: &BidRequest) -> BiddingResult<TrafficOutcome> {
        validate_traffic_request(request, self.config.max_ad_slots)?;

        match self
            .limiter
            .check_and_increment(INBOUND_KEY, &self.config.rate_limit)
            .await
        {
            Ok(result) if !result.allowed => return Err(BiddingError::RateLimited),
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(request_id = %request.request_id, error = %e, "Rate limiter unavailable, admitting request");
            }
        }

        let deadline = Instant::now() + self.config.bid_timeout;

        let targeted = match timeout_at(deadline, self.targeting.check_targeting(&request.user_id)).await {
            Ok(Ok(targeted)) => targeted,
            Ok(Err(e)) => {
                tracing::warn!(
                    request_id = %request.request_id,
                    user_id = %request.user_id,
                    error = %e,
                    "Targeting check failed"
                );
                return Err(BiddingError::ServiceUnavailable(e.to_string()));
            }
            Err(_) => {
                tracing::warn!(request_id = %request.request_id, "Targeting check timed out");
                return Err(BiddingError::ServiceUnavailable("targeting check timed out".to_string()));
            }
        };
        if !targeted {
            tracing::debug!(request_id = %request.request_id, user_id = %request.user_id, "User not targeted");
            return Ok(TrafficOutcome::NoFill("user not targeted"));
        }

        match self.engine.process_bid_until(request, deadline).await {
            Ok(response) => Ok(TrafficOutcome::Filled(response)),
            Err(BiddingError::NoAvailableAds) => Ok(TrafficOutcome::NoFill("no available ads")),
            Err(e) => Err(e),
        }
    }
}
