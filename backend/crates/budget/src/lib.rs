//! Budget Ledger
//!
//! Per-budget cumulative spend against a cap with an atomic check-and-deduct.
//!
//! - `domain/` - ledger entries and their validity rules
//! - `application/` - [`BudgetManager`], the ledger itself
//! - `presentation/` - admin HTTP surface
//!
//! ## Consistency Model
//! - The remote [`platform::kv::KvStore`] counter `budget:spent:{id}` is the
//!   only spend shared between process instances
//! - Each manager keeps an in-memory snapshot guarded by one mutex; it is a
//!   fast-reject cache, never the source of truth
//! - Strict mode commits with a single conditional increment, so the remote
//!   counter never passes the cap; optimistic mode may overshoot by the sum
//!   of in-flight deductions that passed their local check together

pub mod application;
pub mod domain;
pub mod error;
pub mod presentation;

pub use application::config::BudgetConfig;
pub use application::manager::BudgetManager;
pub use domain::entities::{Budget, BudgetState, BudgetStatus, BudgetType};
pub use error::{BudgetError, BudgetResult};
pub use presentation::router::budget_router;

#[cfg(test)]
mod tests;
