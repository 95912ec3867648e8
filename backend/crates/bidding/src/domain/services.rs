//! Domain Services
//!
//! Pure pricing, ranking, rendering and validation rules.

use std::cmp::Ordering;

use crate::domain::entities::{
    AdSlot, BidCandidate, BidRequest, BidStrategy, BillingType, NewStrategy, StrategyUpdate,
};
use crate::error::{BiddingError, BiddingResult};

/// CTR used when a prediction is unusable
const FALLBACK_CTR: f64 = 0.0;

/// Clamp a predicted CTR into `[0, 1]`
pub fn normalize_ctr(ctr: f64) -> f64 {
    if ctr.is_nan() {
        FALLBACK_CTR
    } else {
        ctr.clamp(0.0, 1.0)
    }
}

/// Per-impression price
///
/// - CPC: expected value, `price × ctr`
/// - CPM: `price / 1000`
pub fn compute_bid_price(billing: BillingType, base_price: f64, ctr: f64) -> f64 {
    match billing {
        BillingType::Cpc => base_price * ctr,
        BillingType::Cpm => base_price / 1000.0,
    }
}

/// Order by effective value descending. The sort is stable and keyed on
/// arrival for equal values, so the outcome never depends on task timing
/// beyond the arrival index itself.
pub fn rank_candidates(candidates: &mut [BidCandidate]) {
    candidates.sort_by(|a, b| {
        b.effective_value()
            .partial_cmp(&a.effective_value())
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.arrival.cmp(&b.arrival))
    });
}

/// Minimal HTML creative
pub fn render_markup(strategy: &BidStrategy, slot: &AdSlot) -> String {
    format!(
        r#"<div class="ad" data-strategy="{}" style="width:{}px;height:{}px">{}</div>"#,
        strategy.id,
        slot.width,
        slot.height,
        escape_html(&strategy.name)
    )
}

/// Relative win notice URL under `base_path`
pub fn win_notice_url(base_path: &str, strategy: &BidStrategy, bid_price: f64) -> String {
    format!(
        "{}?strategy_id={}&price={:.4}&type={}",
        base_path.trim_end_matches('/'),
        strategy.id,
        bid_price,
        strategy.bid_type.code()
    )
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Engine preconditions: a user and at least one slot
pub fn validate_bid_request(request: &BidRequest) -> BiddingResult<()> {
    if request.user_id.trim().is_empty() {
        return Err(BiddingError::InvalidRequest("user_id is required".to_string()));
    }
    if request.ad_slots.is_empty() {
        return Err(BiddingError::InvalidRequest(
            "at least one ad slot is required".to_string(),
        ));
    }
    Ok(())
}

/// Full inbound validation done at the traffic boundary
pub fn validate_traffic_request(request: &BidRequest, max_ad_slots: usize) -> BiddingResult<()> {
    validate_bid_request(request)?;

    if request.device_id.trim().is_empty() {
        return Err(BiddingError::InvalidRequest("device_id is required".to_string()));
    }
    if request.ip.trim().is_empty() {
        return Err(BiddingError::InvalidRequest("ip is required".to_string()));
    }
    if request.ad_slots.len() > max_ad_slots {
        return Err(BiddingError::InvalidRequest(format!(
            "at most {} ad slots are allowed",
            max_ad_slots
        )));
    }
    for slot in &request.ad_slots {
        validate_slot(slot)?;
    }
    Ok(())
}

fn validate_slot(slot: &AdSlot) -> BiddingResult<()> {
    let invalid = |reason: &str| {
        Err(BiddingError::InvalidRequest(format!(
            "slot '{}': {}",
            slot.slot_id, reason
        )))
    };

    if slot.slot_id.trim().is_empty() {
        return Err(BiddingError::InvalidRequest("slot_id is required".to_string()));
    }
    if slot.width == 0 || slot.height == 0 {
        return invalid("width and height must be positive");
    }
    if !(slot.min_price.is_finite() && slot.max_price.is_finite()) {
        return invalid("prices must be finite");
    }
    if slot.min_price < 0.0 || slot.min_price > slot.max_price {
        return invalid("expected 0 <= min_price <= max_price");
    }
    if slot.position.trim().is_empty() {
        return invalid("position is required");
    }
    if slot.ad_type.trim().is_empty() {
        return invalid("ad_type is required");
    }
    if slot.bid_types.is_empty() {
        return invalid("bid_type is required");
    }
    Ok(())
}

pub fn validate_new_strategy(strategy: &NewStrategy) -> BiddingResult<()> {
    validate_fields(&strategy.name, strategy.price, strategy.daily_budget)
}

pub fn validate_update(update: &StrategyUpdate) -> BiddingResult<()> {
    validate_fields(&update.name, update.price, update.daily_budget)
}

fn validate_fields(name: &str, price: f64, daily_budget: f64) -> BiddingResult<()> {
    if name.trim().is_empty() {
        return Err(BiddingError::InvalidStrategy("name is required".to_string()));
    }
    if !(price.is_finite() && price > 0.0) {
        return Err(BiddingError::InvalidStrategy("price must be > 0".to_string()));
    }
    if !(daily_budget.is_finite() && daily_budget > 0.0) {
        return Err(BiddingError::InvalidStrategy(
            "daily_budget must be > 0".to_string(),
        ));
    }
    Ok(())
}
