//! Domain Entities

use chrono::{DateTime, NaiveDate, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};

// ============================================================================
// BillingType
// ============================================================================

/// How a strategy is charged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum BillingType {
    /// Cost per click; strategy price in major units per click
    #[serde(rename = "CPC")]
    #[display("CPC")]
    Cpc,
    /// Cost per mille; strategy price per thousand impressions
    #[serde(rename = "CPM")]
    #[display("CPM")]
    Cpm,
}

impl BillingType {
    #[inline]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Cpc => "CPC",
            Self::Cpm => "CPM",
        }
    }

    /// Case-insensitive
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "CPC" => Some(Self::Cpc),
            "CPM" => Some(Self::Cpm),
            _ => None,
        }
    }

    /// Parse a comma separated list such as `"CPC,CPM"`.
    /// `None` if any entry is unknown; duplicates are collapsed.
    pub fn parse_list(codes: &str) -> Option<Vec<Self>> {
        let mut types = Vec::new();
        for code in codes.split(',').filter(|c| !c.trim().is_empty()) {
            let billing = Self::from_code(code)?;
            if !types.contains(&billing) {
                types.push(billing);
            }
        }
        Some(types)
    }
}

// ============================================================================
// StrategyStatus
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(i16)]
pub enum StrategyStatus {
    #[default]
    Disabled = 0,
    Enabled = 1,
}

impl StrategyStatus {
    /// Numeric id for database storage
    #[inline]
    pub const fn id(&self) -> i16 {
        *self as i16
    }

    #[inline]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Enabled => "enabled",
        }
    }

    #[inline]
    pub const fn is_enabled(&self) -> bool {
        matches!(self, Self::Enabled)
    }

    #[inline]
    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            0 => Some(Self::Disabled),
            1 => Some(Self::Enabled),
            _ => None,
        }
    }
}

impl std::fmt::Display for StrategyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

// ============================================================================
// BidStrategy and its satellites
// ============================================================================

/// An advertiser's standing bid
#[derive(Debug, Clone, PartialEq)]
pub struct BidStrategy {
    pub id: i64,
    pub name: String,
    pub bid_type: BillingType,
    pub price: f64,
    /// Major units per UTC day
    pub daily_budget: f64,
    pub status: StrategyStatus,
    /// When set, `price` can no longer change
    pub is_price_locked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when creating a strategy
#[derive(Debug, Clone, PartialEq)]
pub struct NewStrategy {
    pub name: String,
    pub bid_type: BillingType,
    pub price: f64,
    pub daily_budget: f64,
    pub status: StrategyStatus,
    pub is_price_locked: bool,
}

/// Mutable fields; `price` is ignored for price-locked strategies
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyUpdate {
    pub name: String,
    pub price: f64,
    pub daily_budget: f64,
    pub status: StrategyStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyCreative {
    pub id: i64,
    pub strategy_id: i64,
    pub creative_id: i64,
    pub status: StrategyStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Catalog query
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyFilter {
    pub bid_type: Option<BillingType>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub enabled_only: bool,
    /// 1-based
    pub page: u32,
    pub page_size: u32,
}

impl StrategyFilter {
    pub const MAX_PAGE_SIZE: u32 = 1000;

    /// Every enabled strategy, first page of the maximum size
    pub fn active(page_size: u32) -> Self {
        Self {
            bid_type: None,
            min_price: None,
            max_price: None,
            enabled_only: true,
            page: 1,
            page_size,
        }
    }

    /// Page clamped to ≥ 1, size to `1..=MAX_PAGE_SIZE`
    pub fn normalized(mut self) -> Self {
        self.page = self.page.max(1);
        self.page_size = self.page_size.clamp(1, Self::MAX_PAGE_SIZE);
        self
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }

    pub fn matches(&self, strategy: &BidStrategy) -> bool {
        self.bid_type.is_none_or(|t| t == strategy.bid_type)
            && self.min_price.is_none_or(|min| strategy.price >= min)
            && self.max_price.is_none_or(|max| strategy.price <= max)
            && (!self.enabled_only || strategy.status.is_enabled())
    }
}

impl Default for StrategyFilter {
    fn default() -> Self {
        Self {
            bid_type: None,
            min_price: None,
            max_price: None,
            enabled_only: false,
            page: 1,
            page_size: 20,
        }
    }
}

/// One day of delivery for a strategy, summed over its creatives
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyStats {
    pub strategy_id: i64,
    pub impressions: i64,
    pub clicks: i64,
    pub spend: f64,
    pub date: NaiveDate,
}

// ============================================================================
// Bid flow
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct AdSlot {
    pub slot_id: String,
    pub width: u32,
    pub height: u32,
    pub min_price: f64,
    pub max_price: f64,
    pub position: String,
    pub ad_type: String,
    /// Billing types the slot accepts
    pub bid_types: Vec<BillingType>,
}

impl AdSlot {
    #[inline]
    pub fn accepts(&self, billing: BillingType) -> bool {
        self.bid_types.contains(&billing)
    }

    #[inline]
    pub fn price_in_range(&self, price: f64) -> bool {
        price >= self.min_price && price <= self.max_price
    }
}

/// One inbound ad opportunity
#[derive(Debug, Clone, PartialEq)]
pub struct BidRequest {
    pub request_id: String,
    pub user_id: String,
    pub device_id: String,
    pub ip: String,
    pub ad_slots: Vec<AdSlot>,
}

/// A strategy that survived evaluation for one request
#[derive(Debug, Clone, PartialEq)]
pub struct BidCandidate {
    pub strategy: BidStrategy,
    pub bid_price: f64,
    pub ctr: f64,
    /// Completion order within the request; ranking tie-break
    pub arrival: usize,
}

impl BidCandidate {
    /// price × predicted CTR
    #[inline]
    pub fn effective_value(&self) -> f64 {
        self.bid_price * self.ctr
    }
}

/// Winning bid for one slot
#[derive(Debug, Clone, PartialEq)]
pub struct BidResponse {
    pub request_id: String,
    pub slot_id: String,
    pub ad_id: String,
    pub bid_price: f64,
    pub bid_type: BillingType,
    pub ad_markup: String,
    pub win_notice_url: String,
}
