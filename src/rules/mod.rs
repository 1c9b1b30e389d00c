//! Data-driven clearing rules and the four-pass rule engine.

pub mod config;
pub mod engine;
