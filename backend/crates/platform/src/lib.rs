//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Remote key-value store port ([`kv::KvStore`]) with in-memory and PostgreSQL adapters
//! - Sliding-window rate limiting on top of the store
//! - Client identification (IP, request id)
//! - Typed runtime configuration values and the versioned config service

pub mod client;
pub mod config;
pub mod kv;
pub mod memory;
pub mod postgres;
pub mod rate_limit;
