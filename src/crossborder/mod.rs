//! Cross-border capital flows: transfer strategies, tiered retention and
//! batch netting.

pub mod config;
pub mod processor;
