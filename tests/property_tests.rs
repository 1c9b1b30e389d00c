use freight_clearing::accounting::entry::AccountingGenerator;
use freight_clearing::core::currency::CurrencyCode;
use freight_clearing::core::entity::EntityId;
use freight_clearing::core::order::{ClearingMode, Order};
use freight_clearing::core::result::balance_by_currency;
use freight_clearing::engine::clearing::ClearingEngine;
use freight_clearing::rules::config::{ClearingRule, LegFilter, RuleKind};
use freight_clearing::transit::config::Retention;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Generate a random currency from a small pool.
fn arb_currency() -> impl Strategy<Value = CurrencyCode> {
    prop::sample::select(vec![
        CurrencyCode::new("USD"),
        CurrencyCode::new("CNY"),
        CurrencyCode::new("HKD"),
    ])
}

/// Generate a random money amount in cents (0 to 1,000,000.00).
fn arb_amount() -> impl Strategy<Value = Decimal> {
    (0i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Generate a random order: amounts, mode, and an optional delivery
/// entity. Cost is independent of revenue, so negative margins occur.
fn arb_order() -> impl Strategy<Value = Order> {
    (
        arb_amount(),
        arb_amount(),
        arb_currency(),
        prop::bool::ANY,
        prop::bool::ANY,
    )
        .prop_map(|(amount, cost, currency, chain, with_delivery)| {
            let mode = if chain {
                ClearingMode::Chain
            } else {
                ClearingMode::Star
            };
            let order = Order::new(
                "FF-PROP-0001",
                "CUST-PROP",
                EntityId::new("S"),
                amount,
                cost,
                currency,
                mode,
            );
            if with_delivery {
                order.with_delivery_entity(EntityId::new("D"))
            } else {
                order
            }
        })
}

/// Generate a random rule drawn from every balance-preserving rule type.
/// ReportingSplit is exercised in the integration tests instead: a
/// one-sided split legitimately unbalances the management basis, which
/// the entry-balance invariant below forbids.
fn arb_rule() -> impl Strategy<Value = ClearingRule> {
    prop_oneof![
        prop::sample::select(vec![dec!(0.01), dec!(0.03), dec!(0.05)]).prop_map(|rate| {
            ClearingRule::new(
                "RULE-TR",
                "transit",
                RuleKind::TransitRetention {
                    transit_entity: EntityId::new("HK-TRANSIT"),
                    retention_rate: rate,
                    applies_to: LegFilter::Receivable,
                },
            )
        }),
        (1u64..500u64).prop_map(|fee| {
            ClearingRule::new(
                "RULE-CB",
                "fee",
                RuleKind::CrossBorderFee {
                    transit_entity: EntityId::new("HK-TRANSIT"),
                    handling_fee: Decimal::from(fee),
                },
            )
        }),
        (1u64..100_000u64).prop_map(|threshold| {
            ClearingRule::new(
                "RULE-NET",
                "netting",
                RuleKind::NettingThreshold {
                    threshold: Decimal::from(threshold),
                },
            )
        }),
        prop::sample::select(vec![dec!(0.3), dec!(0.5), dec!(0.7)]).prop_map(|ratio| {
            ClearingRule::new(
                "RULE-PS",
                "split",
                RuleKind::ProfitSplit { sales_ratio: ratio },
            )
        }),
        prop::sample::select(vec![ClearingMode::Star, ClearingMode::Chain]).prop_map(|mode| {
            ClearingRule::new("RULE-MODE", "mode", RuleKind::ModeOverride { mode })
        }),
    ]
}

fn arb_rules() -> impl Strategy<Value = Vec<ClearingRule>> {
    prop::collection::vec(arb_rule(), 0..4)
}

proptest! {
    // ===================================================================
    // INVARIANT 1: Clearing results balance to zero per currency, under
    // every combination of order shape and rule configuration.
    // ===================================================================
    #[test]
    fn results_always_balance(order in arb_order(), rules in arb_rules()) {
        let results = ClearingEngine::calculate(&order, &rules).unwrap();
        for (currency, sum) in balance_by_currency(&results) {
            prop_assert_eq!(
                sum,
                Decimal::ZERO,
                "unbalanced in {}",
                currency
            );
        }
    }

    // ===================================================================
    // INVARIANT 2: Retention never exceeds the relayed amount, and the
    // forwarded transfer plus the retention reconstructs it exactly.
    // ===================================================================
    #[test]
    fn retention_conserves_the_amount(
        amount in arb_amount(),
        rate in prop::sample::select(vec![dec!(0.01), dec!(0.02), dec!(0.03), dec!(0.05)]),
        fixed in (0i64..5_000_00i64).prop_map(|cents| Decimal::new(cents, 2)),
    ) {
        for retention_policy in [Retention::Percentage(rate), Retention::Fixed(fixed)] {
            let retention = retention_policy.calculate(amount);
            let transfer = amount - retention;
            prop_assert!(retention >= Decimal::ZERO);
            prop_assert!(retention <= amount);
            prop_assert_eq!(transfer + retention, amount);
        }
    }

    // ===================================================================
    // INVARIANT 3: Generated entries are single-sided and balance per
    // reporting basis and currency.
    // ===================================================================
    #[test]
    fn entries_balance_per_basis(order in arb_order(), rules in arb_rules()) {
        let results = ClearingEngine::calculate(&order, &rules).unwrap();
        let entries = AccountingGenerator::generate_entries(&results);

        for entry in &entries {
            let debit_set = entry.debit() != Decimal::ZERO;
            let credit_set = entry.credit() != Decimal::ZERO;
            prop_assert!(debit_set != credit_set, "entry must be single-sided");
        }
        prop_assert!(AccountingGenerator::validate_entry_balance(&entries).is_ok());
    }

    // ===================================================================
    // INVARIANT 4: Recomputation is deterministic up to generated ids:
    // the same order and rules always produce the same legs.
    // ===================================================================
    #[test]
    fn recomputation_is_deterministic(order in arb_order(), rules in arb_rules()) {
        let fingerprint = |results: &[freight_clearing::core::result::ClearingResult]| {
            let mut legs: Vec<_> = results
                .iter()
                .map(|r| {
                    (
                        r.entity().to_string(),
                        r.amount(),
                        r.management_amount(),
                        r.legal_amount(),
                        format!("{:?}", r.transaction_type()),
                        format!("{:?}", r.account_type()),
                    )
                })
                .collect();
            legs.sort();
            legs
        };

        let first = ClearingEngine::calculate(&order, &rules).unwrap();
        let second = ClearingEngine::calculate(&order, &rules).unwrap();
        prop_assert_eq!(fingerprint(&first), fingerprint(&second));
    }
}
