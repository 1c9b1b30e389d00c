//! # freight-clearing
//!
//! Multi-entity financial clearing pipeline for a freight-forwarding group.
//!
//! Given one commercial order, the pipeline decomposes its revenue and cost
//! into per-entity money-movement legs, applies configurable business rules
//! (transit retention, cross-border relay, netting, reporting splits), and
//! turns the finalized legs into balanced double-entry ledger postings.
//!
//! ## Architecture
//!
//! - **core** — Foundational types: orders, clearing results, entities,
//!   currencies, applicability predicates, errors
//! - **engine** — STAR/CHAIN clearing algorithms and balance validation
//! - **rules** — Typed clearing rules and the four-pass rule engine
//! - **transit** — "Borrowed name" relay configuration and processing
//! - **crossborder** — Multi-region relay flows and batch netting
//! - **accounting** — Double-entry generation, chart of accounts, vouchers
//! - **service** — Pipeline facade over a pluggable store
//! - **simulation** — Random order batches for testing and benchmarks

pub mod accounting;
pub mod core;
pub mod crossborder;
pub mod engine;
pub mod rules;
pub mod service;
pub mod simulation;
pub mod transit;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::accounting::entry::{AccountingEntry, EntryType, ReportingBasis};
    pub use crate::core::currency::CurrencyCode;
    pub use crate::core::entity::EntityId;
    pub use crate::core::error::ClearingError;
    pub use crate::core::order::{ClearingMode, ClearingStatus, Order};
    pub use crate::core::result::{AccountType, ClearingResult, TransactionType};
    pub use crate::engine::clearing::ClearingEngine;
    pub use crate::rules::engine::RuleEngine;
    pub use crate::service::{ClearingService, MemoryStore, ReferenceData};
}
