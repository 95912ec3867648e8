//! Application Layer - Use cases
//!
//! - [`engine::BiddingEngine`]: one bid decision per call
//! - [`traffic::TrafficService`]: validation, shaping and targeting in front of the engine

pub mod config;
pub mod engine;
pub mod traffic;
