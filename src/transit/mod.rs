//! Borrowed-name transit entities: receivable and payable relays with
//! configurable fee retention.

pub mod config;
pub mod processor;
