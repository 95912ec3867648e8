//! Domain Layer - Business logic, entities, ports
//!
//! This layer has no dependencies on infrastructure.

pub mod entities;
pub mod repository;
pub mod services;
