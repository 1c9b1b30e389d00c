use crate::core::entity::EntityId;
use crate::core::order::{ClearingMode, Order};
use crate::core::result::{AccountType, ClearingResult, TransactionType};
use crate::rules::config::{ClearingRule, LegFilter, RuleKind};
use log::debug;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;

use crate::core::round_money;

/// The four-pass rule engine.
///
/// Takes the base legs from the clearing engine and an order's applicable
/// rules, and runs the passes in a fixed order: transit retention, then
/// cross-border fees, then netting, then reporting splits. Each pass
/// consumes the previous pass's output and returns a fresh list — legs are
/// never edited in place, which keeps the base decomposition auditable.
pub struct RuleEngine;

impl RuleEngine {
    /// Apply all four passes. Rules execute in ascending priority order
    /// within each pass; a pass with no applicable rules is a no-op.
    pub fn apply_rules(
        order: &Order,
        results: Vec<ClearingResult>,
        rules: &[ClearingRule],
    ) -> Vec<ClearingResult> {
        debug!(
            "applying rules to order {} ({} base legs)",
            order.order_no(),
            results.len()
        );
        let results = Self::apply_transit_retention(order, results, rules);
        let results = Self::apply_cross_border_fees(order, results, rules);
        let results = Self::apply_netting(order, results, rules);
        let results = Self::apply_reporting_splits(order, results, rules);
        debug!(
            "rule passes complete for order {} ({} legs)",
            order.order_no(),
            results.len()
        );
        results
    }

    /// Pass 1: route selected legs through a transit entity.
    ///
    /// For each matched leg the transit entity keeps
    /// `retention = amount × rate` as a new transit-fee leg and the
    /// original leg shrinks by the same amount, so the set's balance is
    /// preserved. The pre-retention amount and the rate are recorded on
    /// the shrunk leg for audit.
    pub fn apply_transit_retention(
        order: &Order,
        results: Vec<ClearingResult>,
        rules: &[ClearingRule],
    ) -> Vec<ClearingResult> {
        let mut current = results;
        for rule in Self::applicable(order, rules, |k| {
            matches!(k, RuleKind::TransitRetention { .. })
        }) {
            let RuleKind::TransitRetention {
                transit_entity,
                retention_rate,
                applies_to,
            } = &rule.kind
            else {
                continue;
            };

            let mut next = Vec::with_capacity(current.len());
            let mut fees = Vec::new();
            for leg in current {
                if !Self::leg_matches_filter(&leg, *applies_to) {
                    next.push(leg);
                    continue;
                }
                let retention = round_money(leg.amount() * retention_rate);
                if retention == Decimal::ZERO {
                    next.push(leg);
                    continue;
                }

                let fee_account = if retention >= Decimal::ZERO {
                    AccountType::InternalReceivable
                } else {
                    AccountType::InternalPayable
                };
                fees.push(
                    ClearingResult::new(
                        order.id(),
                        transit_entity.clone(),
                        retention,
                        order.currency().clone(),
                        TransactionType::TransitFee,
                        fee_account,
                        leg.clearing_mode(),
                    )
                    .with_rule_id(&rule.rule_id)
                    .with_description(format!(
                        "transit retention {} on {}",
                        retention_rate,
                        leg.entity()
                    )),
                );
                next.push(
                    leg.shrunk_by_retention(retention, *retention_rate)
                        .with_rule_id(&rule.rule_id),
                );
            }
            next.append(&mut fees);
            current = next;
        }
        current
    }

    /// Pass 2: charge configured cross-border handling fees.
    ///
    /// The fee is booked as a balanced pair: fee income on the transit
    /// entity, fee expense on the order's sales entity. Legs untouched by
    /// earlier passes are tagged with the rule id.
    pub fn apply_cross_border_fees(
        order: &Order,
        results: Vec<ClearingResult>,
        rules: &[ClearingRule],
    ) -> Vec<ClearingResult> {
        let mut current = results;
        for rule in Self::applicable(order, rules, |k| {
            matches!(k, RuleKind::CrossBorderFee { .. })
        }) {
            let RuleKind::CrossBorderFee {
                transit_entity,
                handling_fee,
            } = &rule.kind
            else {
                continue;
            };

            current = current
                .into_iter()
                .map(|leg| {
                    if leg.rule_id().is_none() {
                        leg.with_rule_id(&rule.rule_id)
                    } else {
                        leg
                    }
                })
                .collect();

            if *handling_fee > Decimal::ZERO {
                let description = format!("cross-border handling fee via {}", transit_entity);
                current.push(
                    ClearingResult::new(
                        order.id(),
                        transit_entity.clone(),
                        *handling_fee,
                        order.currency().clone(),
                        TransactionType::TransitFee,
                        AccountType::InternalReceivable,
                        order.clearing_mode(),
                    )
                    .with_rule_id(&rule.rule_id)
                    .with_description(description.clone()),
                );
                current.push(
                    ClearingResult::new(
                        order.id(),
                        order.sales_entity().clone(),
                        -*handling_fee,
                        order.currency().clone(),
                        TransactionType::TransitFee,
                        AccountType::InternalPayable,
                        order.clearing_mode(),
                    )
                    .with_rule_id(&rule.rule_id)
                    .with_description(description),
                );
            }
        }
        current
    }

    /// Pass 3: summarize entities whose net position exceeds a threshold.
    ///
    /// The summary leg restates gross legs that remain in the set, so it
    /// is excluded from balance validation (see
    /// [`ClearingResult::counts_toward_balance`]).
    pub fn apply_netting(
        order: &Order,
        results: Vec<ClearingResult>,
        rules: &[ClearingRule],
    ) -> Vec<ClearingResult> {
        let mut current = results;
        for rule in Self::applicable(order, rules, |k| {
            matches!(k, RuleKind::NettingThreshold { .. })
        }) {
            let RuleKind::NettingThreshold { threshold } = &rule.kind else {
                continue;
            };

            let mut nets: HashMap<EntityId, Decimal> = HashMap::new();
            for leg in current.iter().filter(|l| l.counts_toward_balance()) {
                *nets.entry(leg.entity().clone()).or_insert(Decimal::ZERO) += leg.amount();
            }

            let mut entities: Vec<_> = nets.into_iter().collect();
            entities.sort_by(|a, b| a.0.cmp(&b.0));
            for (entity, net) in entities {
                if net.abs() < *threshold || net == Decimal::ZERO {
                    continue;
                }
                current.push(
                    ClearingResult::new(
                        order.id(),
                        entity.clone(),
                        net,
                        order.currency().clone(),
                        TransactionType::Netting,
                        AccountType::Netting,
                        order.clearing_mode(),
                    )
                    .with_rule_id(&rule.rule_id)
                    .with_description(format!("net position summary for {}", entity)),
                );
            }
        }
        current
    }

    /// Pass 4: diverge the management and legal reporting bases for the
    /// target entity's legs. The signed amounts are untouched.
    pub fn apply_reporting_splits(
        order: &Order,
        results: Vec<ClearingResult>,
        rules: &[ClearingRule],
    ) -> Vec<ClearingResult> {
        let mut current = results;
        for rule in Self::applicable(order, rules, |k| {
            matches!(k, RuleKind::ReportingSplit { .. })
        }) {
            let RuleKind::ReportingSplit {
                target_entity,
                management_rate,
                legal_rate,
            } = &rule.kind
            else {
                continue;
            };

            current = current
                .into_iter()
                .map(|leg| {
                    if leg.entity() != target_entity {
                        return leg;
                    }
                    let management = round_money(leg.amount() * management_rate);
                    let legal = round_money(leg.amount() * legal_rate);
                    leg.with_reporting_amounts(management, legal)
                        .with_rule_id(&rule.rule_id)
                })
                .collect();
        }
        current
    }

    /// The sales share of the order margin: taken from the
    /// highest-priority applicable profit-split rule, defaulting to 50/50.
    pub fn profit_ratio(order: &Order, rules: &[ClearingRule]) -> Decimal {
        Self::applicable(order, rules, |k| matches!(k, RuleKind::ProfitSplit { .. }))
            .first()
            .and_then(|rule| match rule.kind {
                RuleKind::ProfitSplit { sales_ratio } => Some(sales_ratio),
                _ => None,
            })
            .unwrap_or(dec!(0.5))
    }

    /// The clearing mode forced by the highest-priority applicable
    /// mode-override rule, if any.
    pub fn mode_override(order: &Order, rules: &[ClearingRule]) -> Option<ClearingMode> {
        Self::applicable(order, rules, |k| matches!(k, RuleKind::ModeOverride { .. }))
            .first()
            .and_then(|rule| match rule.kind {
                RuleKind::ModeOverride { mode } => Some(mode),
                _ => None,
            })
    }

    /// Active rules of one kind that match the order, priority-sorted.
    fn applicable<'a>(
        order: &Order,
        rules: &'a [ClearingRule],
        kind_filter: impl Fn(&RuleKind) -> bool,
    ) -> Vec<&'a ClearingRule> {
        let mut matched: Vec<&ClearingRule> = rules
            .iter()
            .filter(|rule| kind_filter(&rule.kind) && rule.applies_to(order))
            .collect();
        matched.sort_by_key(|rule| rule.priority);
        matched
    }

    fn leg_matches_filter(leg: &ClearingResult, filter: LegFilter) -> bool {
        match filter {
            LegFilter::Receivable => leg.transaction_type() == TransactionType::Receivable,
            LegFilter::Payable => leg.transaction_type() == TransactionType::Payable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::currency::CurrencyCode;
    use crate::core::result::balance_by_currency;

    fn sample_order() -> Order {
        Order::new(
            "FF-2024-0001",
            "CUST-ACME",
            EntityId::new("CN-SHA-SALES"),
            dec!(10000),
            dec!(6000),
            CurrencyCode::new("USD"),
            ClearingMode::Star,
        )
    }

    fn base_legs(order: &Order) -> Vec<ClearingResult> {
        vec![
            ClearingResult::new(
                order.id(),
                EntityId::new("CN-SHA-SALES"),
                dec!(1000),
                CurrencyCode::new("USD"),
                TransactionType::Receivable,
                AccountType::ExternalReceivable,
                ClearingMode::Star,
            ),
            ClearingResult::new(
                order.id(),
                EntityId::new("SG-DELIVERY"),
                dec!(-1000),
                CurrencyCode::new("USD"),
                TransactionType::Payable,
                AccountType::ExternalPayable,
                ClearingMode::Star,
            ),
        ]
    }

    fn transit_rule(rate: Decimal) -> ClearingRule {
        ClearingRule::new(
            "RULE-TR-1",
            "HK transit",
            RuleKind::TransitRetention {
                transit_entity: EntityId::new("HK-TRANSIT"),
                retention_rate: rate,
                applies_to: LegFilter::Receivable,
            },
        )
    }

    #[test]
    fn test_transit_retention_shrinks_leg_and_appends_fee() {
        let order = sample_order();
        let rules = vec![transit_rule(dec!(0.03))];
        let results = RuleEngine::apply_transit_retention(&order, base_legs(&order), &rules);

        assert_eq!(results.len(), 3);
        let shrunk = &results[0];
        assert_eq!(shrunk.amount(), dec!(970));
        assert_eq!(shrunk.original_amount(), Some(dec!(1000)));
        assert_eq!(shrunk.retention_rate(), Some(dec!(0.03)));
        assert_eq!(shrunk.rule_id(), Some("RULE-TR-1"));

        let fee = results.last().unwrap();
        assert_eq!(fee.amount(), dec!(30));
        assert_eq!(fee.entity().as_str(), "HK-TRANSIT");
        assert_eq!(fee.transaction_type(), TransactionType::TransitFee);

        let sums = balance_by_currency(&results);
        assert_eq!(sums[&CurrencyCode::new("USD")], Decimal::ZERO);
    }

    #[test]
    fn test_transit_retention_skips_payable_legs_with_receivable_filter() {
        let order = sample_order();
        let rules = vec![transit_rule(dec!(0.03))];
        let results = RuleEngine::apply_transit_retention(&order, base_legs(&order), &rules);
        // The payable leg is untouched.
        assert_eq!(results[1].amount(), dec!(-1000));
        assert_eq!(results[1].original_amount(), None);
    }

    #[test]
    fn test_cross_border_fee_is_a_balanced_pair() {
        let order = sample_order();
        let rules = vec![ClearingRule::new(
            "RULE-CB-1",
            "HK relay fee",
            RuleKind::CrossBorderFee {
                transit_entity: EntityId::new("HK-TRANSIT"),
                handling_fee: dec!(25),
            },
        )];
        let results = RuleEngine::apply_cross_border_fees(&order, base_legs(&order), &rules);

        assert_eq!(results.len(), 4);
        let sums = balance_by_currency(&results);
        assert_eq!(sums[&CurrencyCode::new("USD")], Decimal::ZERO);
        // Untouched base legs pick up the rule tag.
        assert_eq!(results[0].rule_id(), Some("RULE-CB-1"));
    }

    #[test]
    fn test_netting_summarizes_entities_above_threshold() {
        let order = sample_order();
        let rules = vec![ClearingRule::new(
            "RULE-NET-1",
            "Net above 500",
            RuleKind::NettingThreshold {
                threshold: dec!(500),
            },
        )];
        let results = RuleEngine::apply_netting(&order, base_legs(&order), &rules);

        // Both entities net to ±1000, above the threshold.
        assert_eq!(results.len(), 4);
        let summaries: Vec<_> = results
            .iter()
            .filter(|r| r.account_type() == AccountType::Netting)
            .collect();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].amount(), dec!(1000));
        assert_eq!(summaries[1].amount(), dec!(-1000));
        assert!(summaries
            .iter()
            .all(|s| s.transaction_type() == TransactionType::Netting));

        // Summary legs do not perturb balance validation.
        let sums = balance_by_currency(&results);
        assert_eq!(sums[&CurrencyCode::new("USD")], Decimal::ZERO);
    }

    #[test]
    fn test_netting_below_threshold_is_noop() {
        let order = sample_order();
        let rules = vec![ClearingRule::new(
            "RULE-NET-1",
            "Net above 5000",
            RuleKind::NettingThreshold {
                threshold: dec!(5000),
            },
        )];
        let results = RuleEngine::apply_netting(&order, base_legs(&order), &rules);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_reporting_split_diverges_bases_only() {
        let order = sample_order();
        let rules = vec![ClearingRule::new(
            "RULE-RPT-1",
            "Sales management haircut",
            RuleKind::ReportingSplit {
                target_entity: EntityId::new("CN-SHA-SALES"),
                management_rate: dec!(0.8),
                legal_rate: dec!(1.0),
            },
        )];
        let results = RuleEngine::apply_reporting_splits(&order, base_legs(&order), &rules);

        let target = &results[0];
        assert_eq!(target.amount(), dec!(1000));
        assert_eq!(target.management_amount(), dec!(800));
        assert_eq!(target.legal_amount(), dec!(1000));

        // The other entity's leg is untouched.
        assert_eq!(results[1].management_amount(), dec!(-1000));
    }

    #[test]
    fn test_profit_ratio_defaults_to_even_split() {
        let order = sample_order();
        assert_eq!(RuleEngine::profit_ratio(&order, &[]), dec!(0.5));

        let rules = vec![ClearingRule::new(
            "RULE-PS-1",
            "Sales 70%",
            RuleKind::ProfitSplit {
                sales_ratio: dec!(0.7),
            },
        )];
        assert_eq!(RuleEngine::profit_ratio(&order, &rules), dec!(0.7));
    }

    #[test]
    fn test_priority_orders_rules_within_a_pass() {
        let order = sample_order();
        let rules = vec![
            ClearingRule::new(
                "RULE-PS-LOW",
                "Sales 70%",
                RuleKind::ProfitSplit {
                    sales_ratio: dec!(0.7),
                },
            )
            .with_priority(200),
            ClearingRule::new(
                "RULE-PS-HIGH",
                "Sales 60%",
                RuleKind::ProfitSplit {
                    sales_ratio: dec!(0.6),
                },
            )
            .with_priority(10),
        ];
        assert_eq!(RuleEngine::profit_ratio(&order, &rules), dec!(0.6));
    }

    #[test]
    fn test_mode_override() {
        let order = sample_order();
        assert_eq!(RuleEngine::mode_override(&order, &[]), None);

        let rules = vec![ClearingRule::new(
            "RULE-MODE-1",
            "Force chain",
            RuleKind::ModeOverride {
                mode: ClearingMode::Chain,
            },
        )];
        assert_eq!(
            RuleEngine::mode_override(&order, &rules),
            Some(ClearingMode::Chain)
        );
    }
}
