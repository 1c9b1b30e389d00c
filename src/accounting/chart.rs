use crate::core::result::{AccountType, ClearingResult, TransactionType};
use rust_decimal::Decimal;

/// One row of the static chart of accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Account {
    pub code: &'static str,
    pub name: &'static str,
    /// Accounts with a debit-normal balance grow with debits.
    pub debit_normal: bool,
}

/// The group's chart of accounts. Static by design: account codes are a
/// contract with the downstream general ledger and never vary per tenant.
pub const CHART: &[Account] = &[
    Account { code: "1122", name: "Accounts receivable", debit_normal: true },
    Account { code: "1221", name: "Other receivables, intercompany", debit_normal: true },
    Account { code: "1231", name: "Transit fee clearing", debit_normal: true },
    Account { code: "1241", name: "Net settlement clearing", debit_normal: true },
    Account { code: "2202", name: "Accounts payable", debit_normal: false },
    Account { code: "2241", name: "Other payables, intercompany", debit_normal: false },
    Account { code: "4103", name: "Retained profit", debit_normal: false },
    Account { code: "5001", name: "Cost of services", debit_normal: true },
    Account { code: "5101", name: "Handling fee expense", debit_normal: true },
    Account { code: "6001", name: "Operating revenue", debit_normal: false },
];

/// Look up a chart row by code.
pub fn lookup(code: &str) -> Option<&'static Account> {
    CHART.iter().find(|account| account.code == code)
}

/// The ledger account a clearing leg posts against, or `None` for legs
/// that carry no money movement of their own (netting summaries).
pub fn account_for(result: &ClearingResult) -> Option<&'static Account> {
    let code = match result.transaction_type() {
        // Summaries restate gross legs that post on their own.
        TransactionType::Netting => return None,
        TransactionType::ProfitSharing => "6001",
        TransactionType::TransitFee => {
            if result.amount() >= Decimal::ZERO {
                "1231"
            } else {
                "5101"
            }
        }
        TransactionType::Receivable => match result.account_type() {
            AccountType::ExternalReceivable => "1122",
            _ => "1221",
        },
        TransactionType::Payable => match result.account_type() {
            AccountType::ExternalPayable => "2202",
            _ => "2241",
        },
    };
    lookup(code)
}
