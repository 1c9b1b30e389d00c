use crate::accounting::chart;
use crate::core::currency::CurrencyCode;
use crate::core::entity::EntityId;
use crate::core::error::ClearingError;
use crate::core::result::{ClearingResult, TransactionType};
use log::error;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Classification of an accounting entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryType {
    Receivable,
    Payable,
    Revenue,
    Cost,
    Expense,
    Profit,
    Transit,
}

/// Which parallel book an entry belongs to.
///
/// The management basis reflects internal steering figures, the legal
/// basis what the statutory books must show. Both are generated for every
/// leg; they only differ after a reporting-split rule has diverged the
/// leg's reporting amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportingBasis {
    Management,
    Legal,
}

impl ReportingBasis {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportingBasis::Management => "management",
            ReportingBasis::Legal => "legal",
        }
    }
}

/// One single-sided ledger entry derived from a clearing leg.
///
/// Exactly one of `debit` and `credit` is non-zero. Positive leg amounts
/// post as debits, negative as credits of the absolute value; set-level
/// balance then follows from the zero-sum of the clearing legs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountingEntry {
    entry_id: Uuid,
    /// Set once the entry is bound into a voucher.
    voucher_id: Option<Uuid>,
    result_id: Uuid,
    order_id: Uuid,
    entity: EntityId,
    account_code: String,
    account_name: String,
    debit: Decimal,
    credit: Decimal,
    currency: CurrencyCode,
    entry_type: EntryType,
    basis: ReportingBasis,
    summary: String,
    posted: bool,
}

impl AccountingEntry {
    pub fn entry_id(&self) -> Uuid {
        self.entry_id
    }

    pub fn voucher_id(&self) -> Option<Uuid> {
        self.voucher_id
    }

    pub fn result_id(&self) -> Uuid {
        self.result_id
    }

    pub fn order_id(&self) -> Uuid {
        self.order_id
    }

    pub fn entity(&self) -> &EntityId {
        &self.entity
    }

    pub fn account_code(&self) -> &str {
        &self.account_code
    }

    pub fn account_name(&self) -> &str {
        &self.account_name
    }

    pub fn debit(&self) -> Decimal {
        self.debit
    }

    pub fn credit(&self) -> Decimal {
        self.credit
    }

    pub fn currency(&self) -> &CurrencyCode {
        &self.currency
    }

    pub fn entry_type(&self) -> EntryType {
        self.entry_type
    }

    pub fn basis(&self) -> ReportingBasis {
        self.basis
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn posted(&self) -> bool {
        self.posted
    }

    pub(crate) fn assign_voucher(&mut self, voucher_id: Uuid) {
        self.voucher_id = Some(voucher_id);
    }

    pub(crate) fn mark_posted(&mut self) {
        self.posted = true;
    }
}

/// Stateless generator turning clearing legs into ledger entries.
pub struct AccountingGenerator;

impl AccountingGenerator {
    /// Generate entries for a set of clearing legs, one per reporting
    /// basis per leg.
    ///
    /// Skipped: netting summary legs (they restate gross legs), zero-amount
    /// audit legs, and any basis whose reporting amount is zero. The
    /// management entry uses the leg's management amount, the legal entry
    /// its legal amount.
    pub fn generate_entries(results: &[ClearingResult]) -> Vec<AccountingEntry> {
        let mut entries = Vec::with_capacity(results.len() * 2);
        for result in results {
            let Some(account) = chart::account_for(result) else {
                continue;
            };
            if result.amount() == Decimal::ZERO {
                continue;
            }
            for basis in [ReportingBasis::Management, ReportingBasis::Legal] {
                let amount = match basis {
                    ReportingBasis::Management => result.management_amount(),
                    ReportingBasis::Legal => result.legal_amount(),
                };
                if amount == Decimal::ZERO {
                    continue;
                }
                let (debit, credit) = if amount > Decimal::ZERO {
                    (amount, Decimal::ZERO)
                } else {
                    (Decimal::ZERO, amount.abs())
                };
                entries.push(AccountingEntry {
                    entry_id: Uuid::new_v4(),
                    voucher_id: None,
                    result_id: result.id(),
                    order_id: result.order_id(),
                    entity: result.entity().clone(),
                    account_code: account.code.to_string(),
                    account_name: account.name.to_string(),
                    debit,
                    credit,
                    currency: result.currency().clone(),
                    entry_type: Self::entry_type(result),
                    basis,
                    summary: result
                        .description()
                        .unwrap_or("clearing entry")
                        .to_string(),
                    posted: false,
                });
            }
        }
        entries
    }

    /// Check that debits equal credits per reporting basis and currency.
    pub fn validate_entry_balance(entries: &[AccountingEntry]) -> Result<(), ClearingError> {
        let mut nets: HashMap<(ReportingBasis, CurrencyCode), Decimal> = HashMap::new();
        for entry in entries {
            *nets
                .entry((entry.basis, entry.currency.clone()))
                .or_insert(Decimal::ZERO) += entry.debit - entry.credit;
        }

        let mut keys: Vec<_> = nets.keys().cloned().collect();
        keys.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()).then(a.1.cmp(&b.1)));
        for key in keys {
            let net = nets[&key];
            if net != Decimal::ZERO {
                error!(
                    "entries unbalanced in {} on the {} basis: net {}",
                    key.1,
                    key.0.as_str(),
                    net
                );
                return Err(ClearingError::UnbalancedEntries {
                    currency: key.1,
                    basis: key.0.as_str(),
                    net,
                });
            }
        }
        Ok(())
    }

    fn entry_type(result: &ClearingResult) -> EntryType {
        match result.transaction_type() {
            TransactionType::Receivable => EntryType::Receivable,
            TransactionType::Payable => EntryType::Payable,
            TransactionType::ProfitSharing => EntryType::Revenue,
            TransactionType::TransitFee => {
                if result.amount() >= Decimal::ZERO {
                    EntryType::Transit
                } else {
                    EntryType::Expense
                }
            }
            TransactionType::Netting => EntryType::Transit,
        }
    }
}
