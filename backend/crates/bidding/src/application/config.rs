//! Application Configuration

use std::time::Duration;

use platform::rate_limit::RateLimitConfig;

/// Bidding engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Candidates fetched per request
    pub page_size: u32,
    /// Evaluations in flight per request
    pub max_concurrent_bids: usize,
    /// Path the win notice URL points at
    pub win_notice_path: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            page_size: 1000,
            max_concurrent_bids: 64,
            win_notice_path: "/api/v1/win-notice".to_string(),
        }
    }
}

/// Inbound traffic configuration
#[derive(Debug, Clone)]
pub struct TrafficConfig {
    /// End-to-end budget for targeting plus bidding
    pub bid_timeout: Duration,
    pub max_ad_slots: usize,
    /// Inbound shaping, shared by every caller
    pub rate_limit: RateLimitConfig,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            bid_timeout: Duration::from_millis(200), // 200ms
            max_ad_slots: 10,
            rate_limit: RateLimitConfig::per_second(1000.0),
        }
    }
}
