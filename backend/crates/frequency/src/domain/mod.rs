//! Domain Layer

pub mod entities;
pub mod services;
