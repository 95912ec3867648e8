//! Data Transfer Objects
//!
//! The bid exchange uses snake_case on the wire; the strategy admin API uses
//! camelCase like the other admin surfaces.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::{
    AdSlot, BidRequest, BidResponse, BidStrategy, BillingType, NewStrategy, StrategyCreative,
    StrategyFilter, StrategyStats, StrategyStatus, StrategyUpdate,
};
use crate::error::{BiddingError, BiddingResult};

// ============================================================================
// Bid exchange
// ============================================================================

/// Missing fields default to empty so they fail validation with a 400
#[derive(Debug, Deserialize)]
pub struct BidRequestBody {
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub device_id: String,
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub ad_slots: Vec<AdSlotBody>,
}

#[derive(Debug, Deserialize)]
pub struct AdSlotBody {
    #[serde(default)]
    pub slot_id: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub min_price: f64,
    #[serde(default)]
    pub max_price: f64,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub ad_type: String,
    /// `"CPC"`, `"CPM"` or `"CPC,CPM"`
    #[serde(default)]
    pub bid_type: String,
}

impl BidRequestBody {
    /// `request_id` and `ip` are resolved by the handler from headers and
    /// the connection
    pub fn into_request(self, request_id: String, ip: String) -> BiddingResult<BidRequest> {
        let ad_slots = self
            .ad_slots
            .into_iter()
            .map(AdSlotBody::into_slot)
            .collect::<BiddingResult<Vec<_>>>()?;

        Ok(BidRequest {
            request_id,
            user_id: self.user_id,
            device_id: self.device_id,
            ip,
            ad_slots,
        })
    }
}

impl AdSlotBody {
    fn into_slot(self) -> BiddingResult<AdSlot> {
        let bid_types = BillingType::parse_list(&self.bid_type).ok_or_else(|| {
            BiddingError::InvalidRequest(format!(
                "slot '{}': unknown bid_type '{}'",
                self.slot_id, self.bid_type
            ))
        })?;

        Ok(AdSlot {
            slot_id: self.slot_id,
            width: self.width,
            height: self.height,
            min_price: self.min_price,
            max_price: self.max_price,
            position: self.position,
            ad_type: self.ad_type,
            bid_types,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BidResponseBody {
    pub request_id: String,
    /// 0 on every 200 response, filled or not
    pub code: i32,
    pub message: String,
    pub data: Vec<BidResult>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BidResult {
    pub slot_id: String,
    pub ad_id: String,
    pub bid_price: f64,
    pub bid_type: BillingType,
    pub ad_markup: String,
    pub win_notice: String,
}

impl BidResponseBody {
    pub fn filled(response: BidResponse) -> Self {
        Self {
            request_id: response.request_id,
            code: 0,
            message: "success".to_string(),
            data: vec![BidResult {
                slot_id: response.slot_id,
                ad_id: response.ad_id,
                bid_price: response.bid_price,
                bid_type: response.bid_type,
                ad_markup: response.ad_markup,
                win_notice: response.win_notice_url,
            }],
        }
    }

    pub fn no_fill(request_id: String, message: &str) -> Self {
        Self {
            request_id,
            code: 0,
            message: message.to_string(),
            data: Vec::new(),
        }
    }
}

// ============================================================================
// Strategy admin
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStrategyRequest {
    pub name: String,
    pub bid_type: BillingType,
    pub price: f64,
    pub daily_budget: f64,
    #[serde(default)]
    pub status: StrategyStatus,
    #[serde(default)]
    pub is_price_locked: bool,
}

impl From<CreateStrategyRequest> for NewStrategy {
    fn from(req: CreateStrategyRequest) -> Self {
        Self {
            name: req.name,
            bid_type: req.bid_type,
            price: req.price,
            daily_budget: req.daily_budget,
            status: req.status,
            is_price_locked: req.is_price_locked,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStrategyRequest {
    pub name: String,
    pub price: f64,
    pub daily_budget: f64,
    pub status: StrategyStatus,
}

impl From<UpdateStrategyRequest> for StrategyUpdate {
    fn from(req: UpdateStrategyRequest) -> Self {
        Self {
            name: req.name,
            price: req.price,
            daily_budget: req.daily_budget,
            status: req.status,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: StrategyStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListStrategiesQuery {
    pub bid_type: Option<BillingType>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub enabled_only: Option<bool>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl From<ListStrategiesQuery> for StrategyFilter {
    fn from(query: ListStrategiesQuery) -> Self {
        let defaults = StrategyFilter::default();
        StrategyFilter {
            bid_type: query.bid_type,
            min_price: query.min_price,
            max_price: query.max_price,
            enabled_only: query.enabled_only.unwrap_or(false),
            page: query.page.unwrap_or(defaults.page),
            page_size: query.page_size.unwrap_or(defaults.page_size),
        }
        .normalized()
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyResponse {
    pub id: i64,
    pub name: String,
    pub bid_type: BillingType,
    pub price: f64,
    pub daily_budget: f64,
    pub status: StrategyStatus,
    pub is_price_locked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<BidStrategy> for StrategyResponse {
    fn from(s: BidStrategy) -> Self {
        Self {
            id: s.id,
            name: s.name,
            bid_type: s.bid_type,
            price: s.price,
            daily_budget: s.daily_budget,
            status: s.status,
            is_price_locked: s.is_price_locked,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyListResponse {
    pub items: Vec<StrategyResponse>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreativeResponse {
    pub id: i64,
    pub strategy_id: i64,
    pub creative_id: i64,
    pub status: StrategyStatus,
    pub created_at: DateTime<Utc>,
}

impl From<StrategyCreative> for CreativeResponse {
    fn from(c: StrategyCreative) -> Self {
        Self {
            id: c.id,
            strategy_id: c.strategy_id,
            creative_id: c.creative_id,
            status: c.status,
            created_at: c.created_at,
        }
    }
}

/// `?start_date=YYYY-MM-DD&end_date=YYYY-MM-DD`, both inclusive.
/// Defaults to the last seven days.
#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl StatsQuery {
    pub fn range(&self, today: NaiveDate) -> BiddingResult<(NaiveDate, NaiveDate)> {
        let end = self.end_date.unwrap_or(today);
        let start = self
            .start_date
            .unwrap_or_else(|| end - chrono::Duration::days(6));
        if start > end {
            return Err(BiddingError::InvalidRequest(
                "start_date must not be after end_date".to_string(),
            ));
        }
        Ok((start, end))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub date: NaiveDate,
    pub impressions: i64,
    pub clicks: i64,
    pub spend: f64,
}

impl From<StrategyStats> for StatsResponse {
    fn from(s: StrategyStats) -> Self {
        Self {
            date: s.date,
            impressions: s.impressions,
            clicks: s.clicks,
            spend: s.spend,
        }
    }
}
