//! Shared Kernel - vocabulary every bidding context agrees on
//!
//! - Unified error type ([`error::app_error::AppError`]) and its HTTP classification
//! - Money in integer minor units ([`money::MinorUnits`])
//!
//! Only things whose meaning is identical in the ledger, the frequency
//! controller and the engine belong here.

pub mod error {
    pub mod app_error;
    pub mod conversions;
    pub mod kind;
}
pub mod money;
