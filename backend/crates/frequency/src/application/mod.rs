//! Application Layer

pub mod controller;
