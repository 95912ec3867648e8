//! Presentation Layer - admin HTTP surface

pub mod dto;
pub mod handlers;
pub mod router;
