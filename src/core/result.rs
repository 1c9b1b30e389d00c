use crate::core::currency::CurrencyCode;
use crate::core::entity::EntityId;
use crate::core::order::ClearingMode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Business meaning of one clearing leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    /// Money owed to the owning entity.
    Receivable,
    /// Money the owning entity owes.
    Payable,
    /// Revenue attribution of the order's margin to an entity.
    ProfitSharing,
    /// Fee retained by a transit entity for relaying a payment.
    TransitFee,
    /// Summary of offset gross legs.
    Netting,
}

/// Ledger account family the leg posts against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountType {
    /// Receivable from a customer outside the group.
    ExternalReceivable,
    /// Payable to a supplier outside the group.
    ExternalPayable,
    /// Receivable from another group entity.
    InternalReceivable,
    /// Payable to another group entity.
    InternalPayable,
    /// Receivable leg of a cross-border relay.
    CrossBorderReceivable,
    /// Payable leg of a cross-border relay.
    CrossBorderPayable,
    /// Zero-amount audit record of a retained fee.
    Retention,
    /// Summary record restating offset gross legs.
    Netting,
}

impl AccountType {
    /// Whether this account family posts on the debit side for positive
    /// amounts. Receivable-style accounts are debit-normal; payable-style
    /// accounts are credit-normal.
    pub fn is_debit_normal(self) -> bool {
        matches!(
            self,
            AccountType::ExternalReceivable
                | AccountType::InternalReceivable
                | AccountType::CrossBorderReceivable
                | AccountType::Retention
        )
    }
}

/// One money-movement leg produced by the clearing pipeline.
///
/// Positive amounts are receivable legs, negative amounts payable legs.
/// Results are immutable values: rule passes never edit a leg in place,
/// they derive a new leg through the consuming `with_*`/`shrunk_*` methods
/// and build a fresh list, preserving the original for audit.
///
/// Two parallel reporting amounts ride along with the signed amount: the
/// management and legal bases both default to `amount` and only diverge
/// when a reporting-split rule applies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClearingResult {
    /// Unique identifier for this leg.
    id: Uuid,
    /// The order this leg belongs to.
    order_id: Uuid,
    /// The entity the money concerns.
    entity: EntityId,
    /// Signed amount: positive = receivable, negative = payable.
    amount: Decimal,
    currency: CurrencyCode,
    transaction_type: TransactionType,
    account_type: AccountType,
    clearing_mode: ClearingMode,
    /// True for zero-amount retention audit legs.
    is_transit_retention: bool,
    /// Fee amount retained, recorded on audit legs.
    retention_amount: Option<Decimal>,
    /// Rate applied when the leg was shrunk by a retention rule.
    retention_rate: Option<Decimal>,
    /// Pre-retention amount of a shrunk leg.
    original_amount: Option<Decimal>,
    /// Transit configuration that produced this leg, if any.
    transit_id: Option<String>,
    /// Cross-border flow that produced this leg, if any.
    flow_id: Option<String>,
    /// Rule that produced or modified this leg, if any.
    rule_id: Option<String>,
    /// Human-readable audit summary.
    description: Option<String>,
    /// Management-basis reporting amount (defaults to `amount`).
    management_amount: Decimal,
    /// Legal-basis reporting amount (defaults to `amount`).
    legal_amount: Decimal,
}

impl ClearingResult {
    /// Create a new leg. Both reporting amounts default to `amount`.
    pub fn new(
        order_id: Uuid,
        entity: EntityId,
        amount: Decimal,
        currency: CurrencyCode,
        transaction_type: TransactionType,
        account_type: AccountType,
        clearing_mode: ClearingMode,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            entity,
            amount,
            currency,
            transaction_type,
            account_type,
            clearing_mode,
            is_transit_retention: false,
            retention_amount: None,
            retention_rate: None,
            original_amount: None,
            transit_id: None,
            flow_id: None,
            rule_id: None,
            description: None,
            management_amount: amount,
            legal_amount: amount,
        }
    }

    /// Tag the leg with the transit configuration that produced it.
    pub fn with_transit_id(mut self, transit_id: impl Into<String>) -> Self {
        self.transit_id = Some(transit_id.into());
        self
    }

    /// Tag the leg with the cross-border flow that produced it.
    pub fn with_flow_id(mut self, flow_id: impl Into<String>) -> Self {
        self.flow_id = Some(flow_id.into());
        self
    }

    /// Tag the leg with the rule that produced or modified it.
    pub fn with_rule_id(mut self, rule_id: impl Into<String>) -> Self {
        self.rule_id = Some(rule_id.into());
        self
    }

    /// Attach a human-readable audit summary.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Mark the leg as a retention audit record carrying `retention`.
    /// Audit legs have a zero signed amount and never perturb balance.
    pub fn as_retention_audit(mut self, retention: Decimal) -> Self {
        self.is_transit_retention = true;
        self.retention_amount = Some(retention);
        self
    }

    /// Derive a copy of this leg shrunk by a retention fee.
    ///
    /// Records the pre-retention amount and the applied rate for audit.
    /// Reporting amounts follow the shrunk amount since the reporting-split
    /// pass runs after retention.
    pub fn shrunk_by_retention(mut self, retention: Decimal, rate: Decimal) -> Self {
        self.original_amount = Some(self.amount);
        self.amount -= retention;
        self.retention_rate = Some(rate);
        self.management_amount = self.amount;
        self.legal_amount = self.amount;
        self
    }

    /// Derive a copy with diverged reporting amounts. The signed amount is
    /// untouched; only the two reporting bases change.
    pub fn with_reporting_amounts(mut self, management: Decimal, legal: Decimal) -> Self {
        self.management_amount = management;
        self.legal_amount = legal;
        self
    }

    // --- Accessors ---

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn order_id(&self) -> Uuid {
        self.order_id
    }

    pub fn entity(&self) -> &EntityId {
        &self.entity
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> &CurrencyCode {
        &self.currency
    }

    pub fn transaction_type(&self) -> TransactionType {
        self.transaction_type
    }

    pub fn account_type(&self) -> AccountType {
        self.account_type
    }

    pub fn clearing_mode(&self) -> ClearingMode {
        self.clearing_mode
    }

    pub fn is_transit_retention(&self) -> bool {
        self.is_transit_retention
    }

    pub fn retention_amount(&self) -> Option<Decimal> {
        self.retention_amount
    }

    pub fn retention_rate(&self) -> Option<Decimal> {
        self.retention_rate
    }

    pub fn original_amount(&self) -> Option<Decimal> {
        self.original_amount
    }

    pub fn transit_id(&self) -> Option<&str> {
        self.transit_id.as_deref()
    }

    pub fn flow_id(&self) -> Option<&str> {
        self.flow_id.as_deref()
    }

    pub fn rule_id(&self) -> Option<&str> {
        self.rule_id.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn management_amount(&self) -> Decimal {
        self.management_amount
    }

    pub fn legal_amount(&self) -> Decimal {
        self.legal_amount
    }

    /// Whether this leg participates in balance validation.
    ///
    /// Netting summary legs restate gross legs that remain in the set, so
    /// counting them would double-count the movement. Retention audit legs
    /// carry a zero signed amount and are harmless either way.
    pub fn counts_toward_balance(&self) -> bool {
        self.account_type != AccountType::Netting
    }
}

/// Sum the signed amounts of the balance-relevant legs per currency.
pub fn balance_by_currency(results: &[ClearingResult]) -> HashMap<CurrencyCode, Decimal> {
    let mut sums: HashMap<CurrencyCode, Decimal> = HashMap::new();
    for result in results.iter().filter(|r| r.counts_toward_balance()) {
        *sums.entry(result.currency.clone()).or_insert(Decimal::ZERO) += result.amount;
    }
    sums
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn leg(amount: Decimal) -> ClearingResult {
        ClearingResult::new(
            Uuid::new_v4(),
            EntityId::new("CN-SHA-SALES"),
            amount,
            CurrencyCode::new("USD"),
            TransactionType::Receivable,
            AccountType::ExternalReceivable,
            ClearingMode::Star,
        )
    }

    #[test]
    fn test_reporting_amounts_default_to_amount() {
        let result = leg(dec!(1000));
        assert_eq!(result.management_amount(), dec!(1000));
        assert_eq!(result.legal_amount(), dec!(1000));
    }

    #[test]
    fn test_shrunk_by_retention_records_original() {
        let result = leg(dec!(1000)).shrunk_by_retention(dec!(30), dec!(0.03));
        assert_eq!(result.amount(), dec!(970));
        assert_eq!(result.original_amount(), Some(dec!(1000)));
        assert_eq!(result.retention_rate(), Some(dec!(0.03)));
        assert_eq!(result.management_amount(), dec!(970));
    }

    #[test]
    fn test_balance_sum_skips_netting_summary() {
        let a = leg(dec!(100));
        let b = ClearingResult::new(
            a.order_id(),
            EntityId::new("CN-SHA-SALES"),
            dec!(-100),
            CurrencyCode::new("USD"),
            TransactionType::Payable,
            AccountType::ExternalPayable,
            ClearingMode::Star,
        );
        let summary = ClearingResult::new(
            a.order_id(),
            EntityId::new("CN-SHA-SALES"),
            dec!(42),
            CurrencyCode::new("USD"),
            TransactionType::Netting,
            AccountType::Netting,
            ClearingMode::Star,
        );
        let sums = balance_by_currency(&[a, b, summary]);
        assert_eq!(sums[&CurrencyCode::new("USD")], Decimal::ZERO);
    }

    #[test]
    fn test_debit_normal_accounts() {
        assert!(AccountType::ExternalReceivable.is_debit_normal());
        assert!(!AccountType::InternalPayable.is_debit_normal());
    }
}
