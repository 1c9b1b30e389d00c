//! Pipeline facade: clearing execution, voucher lifecycle and balance
//! queries over a pluggable store.

use crate::accounting::entry::{AccountingEntry, AccountingGenerator, ReportingBasis};
use crate::accounting::voucher::Voucher;
use crate::accounting::chart;
use crate::core::currency::CurrencyCode;
use crate::core::entity::EntityId;
use crate::core::error::ClearingError;
use crate::core::order::{ClearingStatus, Order};
use crate::core::result::ClearingResult;
use crate::crossborder::config::CrossBorderFlow;
use crate::engine::clearing::ClearingEngine;
use crate::rules::config::ClearingRule;
use crate::transit::config::TransitEntity;
use log::{info, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Pre-fetched configuration the pipeline consults during a run.
///
/// Loaded once per batch by the caller; the pipeline itself never reaches
/// out to a configuration source mid-run.
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    pub rules: Vec<ClearingRule>,
    pub transits: Vec<TransitEntity>,
    pub flows: Vec<CrossBorderFlow>,
}

impl ReferenceData {
    pub fn new(
        rules: Vec<ClearingRule>,
        transits: Vec<TransitEntity>,
        flows: Vec<CrossBorderFlow>,
    ) -> Self {
        Self {
            rules,
            transits,
            flows,
        }
    }
}

/// Outcome of one clearing run, shaped for callers that want a verdict
/// rather than a `Result`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearingResponse {
    pub success: bool,
    pub order_id: Uuid,
    pub results: Vec<ClearingResult>,
    pub message: String,
}

/// Persistence boundary of the pipeline.
///
/// The in-memory implementation backs tests and the CLI; a database-backed
/// implementation slots in behind the same trait.
pub trait ClearingStore {
    fn order(&self, order_id: Uuid) -> Option<Order>;
    fn put_order(&mut self, order: Order);
    fn set_order_status(&mut self, order_id: Uuid, status: ClearingStatus);

    fn results(&self, order_id: Uuid) -> Vec<ClearingResult>;
    fn put_results(&mut self, order_id: Uuid, results: Vec<ClearingResult>);

    fn entries(&self, order_id: Uuid) -> Vec<AccountingEntry>;
    fn put_entries(&mut self, order_id: Uuid, entries: Vec<AccountingEntry>);
    fn entries_for_voucher(&self, voucher_id: Uuid) -> Vec<AccountingEntry>;
    fn mark_entries_posted(&mut self, voucher_id: Uuid);
    fn all_entries(&self) -> Vec<AccountingEntry>;

    fn voucher(&self, voucher_id: Uuid) -> Option<Voucher>;
    fn put_voucher(&mut self, voucher: Voucher);
    fn mark_voucher_posted(&mut self, voucher_id: Uuid);
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    orders: HashMap<Uuid, Order>,
    results: HashMap<Uuid, Vec<ClearingResult>>,
    entries: HashMap<Uuid, Vec<AccountingEntry>>,
    vouchers: HashMap<Uuid, Voucher>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClearingStore for MemoryStore {
    fn order(&self, order_id: Uuid) -> Option<Order> {
        self.orders.get(&order_id).cloned()
    }

    fn put_order(&mut self, order: Order) {
        self.orders.insert(order.id(), order);
    }

    fn set_order_status(&mut self, order_id: Uuid, status: ClearingStatus) {
        if let Some(order) = self.orders.get_mut(&order_id) {
            order.set_clearing_status(status);
        }
    }

    fn results(&self, order_id: Uuid) -> Vec<ClearingResult> {
        self.results.get(&order_id).cloned().unwrap_or_default()
    }

    fn put_results(&mut self, order_id: Uuid, results: Vec<ClearingResult>) {
        self.results.insert(order_id, results);
    }

    fn entries(&self, order_id: Uuid) -> Vec<AccountingEntry> {
        self.entries.get(&order_id).cloned().unwrap_or_default()
    }

    fn put_entries(&mut self, order_id: Uuid, entries: Vec<AccountingEntry>) {
        self.entries.insert(order_id, entries);
    }

    fn entries_for_voucher(&self, voucher_id: Uuid) -> Vec<AccountingEntry> {
        self.entries
            .values()
            .flatten()
            .filter(|e| e.voucher_id() == Some(voucher_id))
            .cloned()
            .collect()
    }

    fn mark_entries_posted(&mut self, voucher_id: Uuid) {
        for entries in self.entries.values_mut() {
            for entry in entries
                .iter_mut()
                .filter(|e| e.voucher_id() == Some(voucher_id))
            {
                entry.mark_posted();
            }
        }
    }

    fn all_entries(&self) -> Vec<AccountingEntry> {
        self.entries.values().flatten().cloned().collect()
    }

    fn voucher(&self, voucher_id: Uuid) -> Option<Voucher> {
        self.vouchers.get(&voucher_id).cloned()
    }

    fn put_voucher(&mut self, voucher: Voucher) {
        self.vouchers.insert(voucher.voucher_id(), voucher);
    }

    fn mark_voucher_posted(&mut self, voucher_id: Uuid) {
        if let Some(voucher) = self.vouchers.get_mut(&voucher_id) {
            voucher.mark_posted();
        }
    }
}

/// The clearing service: the one entry point callers integrate against.
pub struct ClearingService<S: ClearingStore> {
    store: S,
    reference: ReferenceData,
}

impl<S: ClearingStore> ClearingService<S> {
    pub fn new(store: S, reference: ReferenceData) -> Self {
        Self { store, reference }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn reference(&self) -> &ReferenceData {
        &self.reference
    }

    /// Run the full pipeline for one order, persist the legs and mark the
    /// order cleared.
    ///
    /// On failure nothing is persisted and the order status is left
    /// untouched, so the run can be retried after the configuration is
    /// fixed.
    pub fn execute_clearing(&mut self, order_id: Uuid) -> ClearingResponse {
        let Some(order) = self.store.order(order_id) else {
            warn!("clearing requested for unknown order {}", order_id);
            return ClearingResponse {
                success: false,
                order_id,
                results: Vec::new(),
                message: ClearingError::OrderNotFound(order_id).to_string(),
            };
        };

        match ClearingEngine::calculate(&order, &self.reference.rules) {
            Ok(results) => {
                self.store.put_results(order_id, results.clone());
                self.store
                    .set_order_status(order_id, ClearingStatus::Cleared);
                info!(
                    "order {} cleared with {} legs",
                    order.order_no(),
                    results.len()
                );
                ClearingResponse {
                    success: true,
                    order_id,
                    results,
                    message: format!("order {} cleared", order.order_no()),
                }
            }
            Err(err) => {
                warn!("clearing failed for order {}: {}", order.order_no(), err);
                ClearingResponse {
                    success: false,
                    order_id,
                    results: Vec::new(),
                    message: err.to_string(),
                }
            }
        }
    }

    /// Dry run: compute the legs without touching the store or the order.
    pub fn calculate_clearing(&self, order_id: Uuid) -> Result<Vec<ClearingResult>, ClearingError> {
        let order = self
            .store
            .order(order_id)
            .ok_or(ClearingError::OrderNotFound(order_id))?;
        ClearingEngine::calculate(&order, &self.reference.rules)
    }

    /// Build a voucher from an order's persisted clearing results.
    ///
    /// Generates the accounting entries, validates their balance per basis
    /// and currency, and persists entries and voucher together. Nothing is
    /// stored when validation fails.
    pub fn create_voucher(
        &mut self,
        order_id: Uuid,
        operator: &str,
    ) -> Result<Voucher, ClearingError> {
        if self.store.order(order_id).is_none() {
            return Err(ClearingError::OrderNotFound(order_id));
        }
        let results = self.store.results(order_id);
        if results.is_empty() {
            return Err(ClearingError::NoResults(order_id));
        }

        let mut entries = AccountingGenerator::generate_entries(&results);
        AccountingGenerator::validate_entry_balance(&entries)?;

        let voucher = Voucher::new(
            order_id,
            entries.iter().map(AccountingEntry::entry_id).collect(),
            operator,
        );
        for entry in &mut entries {
            entry.assign_voucher(voucher.voucher_id());
        }
        self.store.put_entries(order_id, entries);
        self.store.put_voucher(voucher.clone());
        info!(
            "voucher {} created for order {} by {}",
            voucher.voucher_id(),
            order_id,
            operator
        );
        Ok(voucher)
    }

    /// Post a voucher to the ledger. Re-validates the entry balance and
    /// refuses already-posted vouchers without mutating anything.
    pub fn post_voucher(&mut self, voucher_id: Uuid) -> Result<(), ClearingError> {
        let voucher = self
            .store
            .voucher(voucher_id)
            .ok_or(ClearingError::VoucherNotFound(voucher_id))?;
        if voucher.posted() {
            return Err(ClearingError::VoucherAlreadyPosted(voucher_id));
        }

        let entries = self.store.entries_for_voucher(voucher_id);
        AccountingGenerator::validate_entry_balance(&entries)?;

        self.store.mark_entries_posted(voucher_id);
        self.store.mark_voucher_posted(voucher_id);
        info!("voucher {} posted", voucher_id);
        Ok(())
    }

    /// Post a batch of vouchers. One failure does not stop the batch; each
    /// voucher gets its own verdict.
    pub fn post_vouchers(
        &mut self,
        voucher_ids: &[Uuid],
    ) -> Vec<(Uuid, Result<(), ClearingError>)> {
        voucher_ids
            .iter()
            .map(|&id| (id, self.post_voucher(id)))
            .collect()
    }

    /// Ledger balance of one account for one entity and currency, over
    /// posted entries on the legal basis.
    ///
    /// Debit-normal accounts report debits minus credits; credit-normal
    /// accounts the reverse.
    pub fn account_balance(
        &self,
        entity: &EntityId,
        account_code: &str,
        currency: &CurrencyCode,
    ) -> Decimal {
        let debit_normal = chart::lookup(account_code).map_or(true, |a| a.debit_normal);
        let net: Decimal = self
            .store
            .all_entries()
            .iter()
            .filter(|e| {
                e.posted()
                    && e.basis() == ReportingBasis::Legal
                    && e.entity() == entity
                    && e.account_code() == account_code
                    && e.currency() == currency
            })
            .map(|e| e.debit() - e.credit())
            .sum();
        if debit_normal {
            net
        } else {
            -net
        }
    }
}
