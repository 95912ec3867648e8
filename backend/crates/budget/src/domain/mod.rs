//! Domain Layer - ledger entries and pure rules

pub mod entities;
pub mod services;
