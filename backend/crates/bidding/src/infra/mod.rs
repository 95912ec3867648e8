//! Infrastructure Layer - adapters for the domain ports

pub mod gates;
pub mod memory;
pub mod postgres;
pub mod targeting;
