use crate::core::currency::CurrencyCode;
use crate::core::entity::EntityId;
use crate::core::error::ClearingError;
use crate::core::order::{ClearingMode, Order};
use crate::core::result::{AccountType, ClearingResult, TransactionType};
use crate::core::round_money;
use crate::rules::config::ClearingRule;
use crate::rules::engine::RuleEngine;
use log::{debug, error};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// The clearing engine.
///
/// Decomposes one order into its base money-movement legs under one of two
/// topologies, delegates to the rule engine, and validates that the final
/// set balances per currency.
///
/// The base decomposition books the order margin as profit-sharing revenue
/// credits (negative legs), so every base set is zero-sum: receivables and
/// payables net exactly against the margin attributed to the participating
/// entities.
pub struct ClearingEngine;

impl ClearingEngine {
    /// Decompose an order into a finalized, validated set of legs.
    ///
    /// The clearing mode comes from the order unless a mode-override rule
    /// forces one; the profit split ratio comes from the rule set
    /// (default 50/50). After rule application the whole set is balance
    /// checked: an imbalance is returned as an error, never persisted,
    /// and the order's clearing status is left for the caller to manage.
    pub fn calculate(
        order: &Order,
        rules: &[ClearingRule],
    ) -> Result<Vec<ClearingResult>, ClearingError> {
        let mode = RuleEngine::mode_override(order, rules).unwrap_or(order.clearing_mode());
        debug!("clearing order {} in {:?} mode", order.order_no(), mode);

        let sales_ratio = RuleEngine::profit_ratio(order, rules);
        let base = match mode {
            ClearingMode::Star => Self::star_clearing(order, sales_ratio),
            ClearingMode::Chain => Self::chain_clearing(order, sales_ratio),
        };

        let results = RuleEngine::apply_rules(order, base, rules);
        Self::validate_clearing_results(&results)?;
        Ok(results)
    }

    /// STAR topology: one collection entity receives and pays for all
    /// parties. The collector is the payment entity if configured,
    /// otherwise the sales entity.
    pub fn star_clearing(order: &Order, sales_ratio: Decimal) -> Vec<ClearingResult> {
        let collector = order.collection_entity().clone();
        let mut results = Vec::new();

        results.push(Self::leg(
            order,
            collector.clone(),
            order.total_amount(),
            TransactionType::Receivable,
            AccountType::ExternalReceivable,
            ClearingMode::Star,
            "customer receivable (collection entity)",
        ));

        for (entity, share) in Self::profit_shares(order, sales_ratio) {
            results.push(Self::profit_leg(order, entity, share, ClearingMode::Star));
        }

        if order.total_cost() > Decimal::ZERO {
            results.push(Self::leg(
                order,
                collector,
                -order.total_cost(),
                TransactionType::Payable,
                AccountType::ExternalPayable,
                ClearingMode::Star,
                "supplier payable (collection entity)",
            ));
        }

        debug!("star clearing produced {} legs", results.len());
        results
    }

    /// CHAIN topology: money conceptually flows customer → sales entity →
    /// delivery entity → supplier. The sales entity keeps its profit share
    /// and forwards the remainder to the delivery entity, which pays the
    /// supplier.
    pub fn chain_clearing(order: &Order, sales_ratio: Decimal) -> Vec<ClearingResult> {
        let sales = order.sales_entity().clone();
        let mut results = Vec::new();

        results.push(Self::leg(
            order,
            sales.clone(),
            order.total_amount(),
            TransactionType::Receivable,
            AccountType::ExternalReceivable,
            ClearingMode::Chain,
            "customer receivable (sales entity)",
        ));

        let shares = Self::profit_shares(order, sales_ratio);
        let sales_share = shares
            .iter()
            .find(|(entity, _)| entity == &sales)
            .map(|(_, share)| *share)
            .unwrap_or(Decimal::ZERO);

        if let Some(delivery) = order.delivery_entity() {
            let transfer = order.total_amount() - sales_share;
            if transfer != Decimal::ZERO {
                results.push(Self::leg(
                    order,
                    delivery.clone(),
                    transfer,
                    TransactionType::Receivable,
                    AccountType::InternalReceivable,
                    ClearingMode::Chain,
                    "forwarded from sales entity",
                ));
                results.push(Self::leg(
                    order,
                    sales.clone(),
                    -transfer,
                    TransactionType::Payable,
                    AccountType::InternalPayable,
                    ClearingMode::Chain,
                    "forwarded to delivery entity",
                ));
            }
        }

        if order.total_cost() > Decimal::ZERO {
            let payer = order.delivery_entity().unwrap_or(&sales).clone();
            results.push(Self::leg(
                order,
                payer,
                -order.total_cost(),
                TransactionType::Payable,
                AccountType::ExternalPayable,
                ClearingMode::Chain,
                "supplier payable",
            ));
        }

        for (entity, share) in shares {
            results.push(Self::profit_leg(order, entity, share, ClearingMode::Chain));
        }

        debug!("chain clearing produced {} legs", results.len());
        results
    }

    /// Check debit/credit equality per currency over the balance-relevant
    /// legs. Returns an error describing the first unbalanced currency.
    pub fn validate_clearing_results(results: &[ClearingResult]) -> Result<(), ClearingError> {
        let mut debits: HashMap<CurrencyCode, Decimal> = HashMap::new();
        let mut credits: HashMap<CurrencyCode, Decimal> = HashMap::new();

        for result in results.iter().filter(|r| r.counts_toward_balance()) {
            let amount = result.amount();
            if amount > Decimal::ZERO {
                *debits.entry(result.currency().clone()).or_insert(Decimal::ZERO) += amount;
            } else if amount < Decimal::ZERO {
                *credits.entry(result.currency().clone()).or_insert(Decimal::ZERO) +=
                    amount.abs();
            }
        }

        let mut currencies: Vec<&CurrencyCode> = debits.keys().chain(credits.keys()).collect();
        currencies.sort();
        currencies.dedup();

        for currency in currencies {
            let debit = debits.get(currency).copied().unwrap_or(Decimal::ZERO);
            let credit = credits.get(currency).copied().unwrap_or(Decimal::ZERO);
            if debit != credit {
                error!(
                    "clearing results unbalanced in {}: debit {} vs credit {}",
                    currency, debit, credit
                );
                return Err(ClearingError::UnbalancedResults {
                    currency: currency.clone(),
                    debit,
                    credit,
                });
            }
        }
        Ok(())
    }

    /// Margin shares per participating entity.
    ///
    /// With a delivery entity the margin splits between sales and delivery
    /// at the configured ratio; otherwise the sales entity keeps it all.
    /// The delivery share is the remainder after rounding the sales share,
    /// so the shares always sum exactly to the margin.
    fn profit_shares(order: &Order, sales_ratio: Decimal) -> Vec<(EntityId, Decimal)> {
        let profit = order.total_profit();
        match order.delivery_entity() {
            Some(delivery) => {
                let sales_share = round_money(profit * sales_ratio);
                let delivery_share = profit - sales_share;
                let mut shares = Vec::new();
                if sales_share != Decimal::ZERO {
                    shares.push((order.sales_entity().clone(), sales_share));
                }
                if delivery_share != Decimal::ZERO {
                    shares.push((delivery.clone(), delivery_share));
                }
                shares
            }
            None if profit != Decimal::ZERO => vec![(order.sales_entity().clone(), profit)],
            None => Vec::new(),
        }
    }

    /// A profit share booked as a revenue credit: the leg's signed amount
    /// is the negated share, which is what keeps the base set zero-sum.
    fn profit_leg(
        order: &Order,
        entity: EntityId,
        share: Decimal,
        mode: ClearingMode,
    ) -> ClearingResult {
        let account = if share > Decimal::ZERO {
            AccountType::InternalPayable
        } else {
            AccountType::InternalReceivable
        };
        Self::leg(
            order,
            entity,
            -share,
            TransactionType::ProfitSharing,
            account,
            mode,
            "margin share",
        )
    }

    fn leg(
        order: &Order,
        entity: EntityId,
        amount: Decimal,
        transaction: TransactionType,
        account: AccountType,
        mode: ClearingMode,
        description: &str,
    ) -> ClearingResult {
        ClearingResult::new(
            order.id(),
            entity,
            amount,
            order.currency().clone(),
            transaction,
            account,
            mode,
        )
        .with_description(format!("{} {}", description, order.order_no()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::result::balance_by_currency;
    use rust_decimal_macros::dec;

    fn usd() -> CurrencyCode {
        CurrencyCode::new("USD")
    }

    fn star_order() -> Order {
        Order::new(
            "FF-2024-0001",
            "CUST-ACME",
            EntityId::new("S"),
            dec!(10000),
            dec!(6000),
            usd(),
            ClearingMode::Star,
        )
        .with_delivery_entity(EntityId::new("D"))
    }

    fn entity_net(results: &[ClearingResult], entity: &str) -> Decimal {
        results
            .iter()
            .filter(|r| r.entity().as_str() == entity && r.counts_toward_balance())
            .map(|r| r.amount())
            .sum()
    }

    #[test]
    fn test_star_clearing_balances() {
        let order = star_order();
        let results = ClearingEngine::star_clearing(&order, dec!(0.5));

        // +10000 receivable, -2000/-2000 margin credits, -6000 payable.
        assert_eq!(results.len(), 4);
        assert_eq!(results[0].amount(), dec!(10000));
        assert_eq!(results[0].entity().as_str(), "S");
        assert_eq!(results[3].amount(), dec!(-6000));

        let shares: Vec<_> = results
            .iter()
            .filter(|r| r.transaction_type() == TransactionType::ProfitSharing)
            .collect();
        assert_eq!(shares.len(), 2);
        assert!(shares.iter().all(|r| r.amount() == dec!(-2000)));

        let sums = balance_by_currency(&results);
        assert_eq!(sums[&usd()], Decimal::ZERO);
    }

    #[test]
    fn test_star_collector_prefers_payment_entity() {
        let order = star_order().with_payment_entity(EntityId::new("HK-COLLECT"));
        let results = ClearingEngine::star_clearing(&order, dec!(0.5));
        assert_eq!(results[0].entity().as_str(), "HK-COLLECT");
        assert_eq!(results.last().unwrap().entity().as_str(), "HK-COLLECT");
    }

    #[test]
    fn test_chain_clearing_balances_and_forwards() {
        let order = Order::new(
            "FF-2024-0002",
            "CUST-ACME",
            EntityId::new("S"),
            dec!(10000),
            dec!(6000),
            usd(),
            ClearingMode::Chain,
        )
        .with_delivery_entity(EntityId::new("D"));

        let results = ClearingEngine::chain_clearing(&order, dec!(0.5));

        // +10000 (S), +8000 (D), -8000 (S), -6000 (D), -2000 (S), -2000 (D).
        assert_eq!(results.len(), 6);
        let forwarded = results
            .iter()
            .find(|r| r.account_type() == AccountType::InternalReceivable)
            .unwrap();
        assert_eq!(forwarded.amount(), dec!(8000));
        assert_eq!(forwarded.entity().as_str(), "D");

        let sums = balance_by_currency(&results);
        assert_eq!(sums[&usd()], Decimal::ZERO);

        // Each entity's position nets to zero: margin is fully attributed.
        assert_eq!(entity_net(&results, "S"), Decimal::ZERO);
        assert_eq!(entity_net(&results, "D"), Decimal::ZERO);
    }

    #[test]
    fn test_chain_without_delivery_entity() {
        let order = Order::new(
            "FF-2024-0003",
            "CUST-ACME",
            EntityId::new("S"),
            dec!(5000),
            dec!(3000),
            usd(),
            ClearingMode::Chain,
        );
        let results = ClearingEngine::chain_clearing(&order, dec!(0.5));

        // No internal transfer pair; sales pays the supplier and keeps the
        // whole margin.
        assert_eq!(results.len(), 3);
        assert!(results
            .iter()
            .all(|r| r.entity().as_str() == "S"));
        let sums = balance_by_currency(&results);
        assert_eq!(sums[&usd()], Decimal::ZERO);
    }

    #[test]
    fn test_zero_cost_omits_payable_leg() {
        let order = Order::new(
            "FF-2024-0004",
            "CUST-ACME",
            EntityId::new("S"),
            dec!(1000),
            Decimal::ZERO,
            usd(),
            ClearingMode::Star,
        );
        let results = ClearingEngine::star_clearing(&order, dec!(0.5));
        assert!(results
            .iter()
            .all(|r| r.account_type() != AccountType::ExternalPayable));
        let sums = balance_by_currency(&results);
        assert_eq!(sums[&usd()], Decimal::ZERO);
    }

    #[test]
    fn test_negative_margin_still_balances() {
        let order = Order::new(
            "FF-2024-0005",
            "CUST-ACME",
            EntityId::new("S"),
            dec!(5000),
            dec!(7000),
            usd(),
            ClearingMode::Star,
        )
        .with_delivery_entity(EntityId::new("D"));
        let results = ClearingEngine::star_clearing(&order, dec!(0.5));

        // Loss shares are positive legs (the entities absorb the loss).
        let shares: Vec<_> = results
            .iter()
            .filter(|r| r.transaction_type() == TransactionType::ProfitSharing)
            .collect();
        assert!(shares.iter().all(|r| r.amount() > Decimal::ZERO));
        let sums = balance_by_currency(&results);
        assert_eq!(sums[&usd()], Decimal::ZERO);
    }

    #[test]
    fn test_calculate_applies_mode_override_and_validates() {
        let order = star_order();
        let results = ClearingEngine::calculate(&order, &[]).unwrap();
        assert!(results
            .iter()
            .all(|r| r.clearing_mode() == ClearingMode::Star));
        assert!(ClearingEngine::validate_clearing_results(&results).is_ok());
    }

    #[test]
    fn test_validate_rejects_perturbed_set() {
        let order = star_order();
        let mut results = ClearingEngine::star_clearing(&order, dec!(0.5));
        // Replace one leg with a perturbed copy.
        let bad = ClearingResult::new(
            order.id(),
            EntityId::new("S"),
            dec!(10001),
            usd(),
            TransactionType::Receivable,
            AccountType::ExternalReceivable,
            ClearingMode::Star,
        );
        results[0] = bad;

        let err = ClearingEngine::validate_clearing_results(&results).unwrap_err();
        match err {
            ClearingError::UnbalancedResults { debit, credit, .. } => {
                assert_eq!(debit, dec!(10001));
                assert_eq!(credit, dec!(10000));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
