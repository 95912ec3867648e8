//! Presentation Layer - HTTP handlers

pub mod dto;
pub mod handlers;
pub mod router;
