//! Frequency Controller
//!
//! Per (user, target) impression and click caps over a time window.
//!
//! - `domain/` - limits, event kinds and key layout
//! - `application/` - [`FrequencyController`]
//! - `presentation/` - per-target config routes
//!
//! Counters live in the shared [`platform::kv::KvStore`] under
//! `freq:{imp|click}:{user}:{target}:{YYYYMMDD}` and expire with the
//! configured window. The controller keeps no mutable state of its own, so
//! one instance can be shared by any number of concurrent callers.
//!
//! Concurrent check-then-record pairs can let one extra event through per
//! racing caller; that ±1 is accepted.

pub mod application;
pub mod domain;
pub mod error;
pub mod presentation;

pub use application::controller::FrequencyController;
pub use domain::entities::{EventKind, FrequencyConfig, FrequencyStats};
pub use error::{FrequencyError, FrequencyResult};
pub use presentation::router::frequency_router;

#[cfg(test)]
mod tests;
