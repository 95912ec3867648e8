//! Application Layer - the ledger use cases

pub mod config;
pub mod manager;
