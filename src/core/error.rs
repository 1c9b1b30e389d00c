use crate::core::currency::CurrencyCode;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by the clearing pipeline.
///
/// Every failure is scoped to one order or voucher and returned to the
/// caller; nothing here aborts the process. Validation failures are
/// recoverable: the order's clearing status is left untouched so a caller
/// may retry the full pipeline. Malformed rule configuration is not an
/// error variant at all — bad rules are logged and skipped so the run can
/// continue with the remaining rules.
#[derive(Debug, Error)]
pub enum ClearingError {
    /// Debits and credits of a clearing result set do not match.
    #[error("clearing results unbalanced in {currency}: debit {debit} vs credit {credit}")]
    UnbalancedResults {
        currency: CurrencyCode,
        debit: Decimal,
        credit: Decimal,
    },

    /// An accounting entry set does not sum to zero for a currency on one
    /// reporting basis.
    #[error("accounting entries unbalanced in {currency} ({basis} basis): net {net}")]
    UnbalancedEntries {
        currency: CurrencyCode,
        basis: &'static str,
        net: Decimal,
    },

    /// The requested order does not exist in the store.
    #[error("order not found: {0}")]
    OrderNotFound(Uuid),

    /// The requested voucher does not exist in the store.
    #[error("voucher not found: {0}")]
    VoucherNotFound(Uuid),

    /// The voucher is already posted; posting performs no mutation.
    #[error("voucher already posted: {0}")]
    VoucherAlreadyPosted(Uuid),

    /// The order has no clearing results to build a voucher from.
    #[error("no clearing results for order: {0}")]
    NoResults(Uuid),
}
