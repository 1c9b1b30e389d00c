use crate::core::condition::Applicability;
use crate::core::entity::EntityId;
use crate::core::order::{ClearingMode, Order};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Which base legs a transit-retention rule selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LegFilter {
    Receivable,
    Payable,
}

/// Typed payload of a clearing rule.
///
/// Each rule type is a tagged variant with its own validated parameters,
/// deserialized once at load time. The pipeline never inspects free-form
/// key/value maps at run time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RuleKind {
    /// Route selected legs through a transit entity, which retains a fee.
    TransitRetention {
        transit_entity: EntityId,
        /// Fraction of the leg amount the transit entity keeps.
        retention_rate: Decimal,
        applies_to: LegFilter,
    },
    /// Charge a handling fee for relaying a payment across borders.
    CrossBorderFee {
        transit_entity: EntityId,
        handling_fee: Decimal,
    },
    /// Offset an entity's gross legs into one net summary leg once its
    /// absolute net position exceeds the threshold.
    NettingThreshold { threshold: Decimal },
    /// Diverge the management and legal reporting bases for one entity's
    /// legs without touching the underlying signed amounts.
    ReportingSplit {
        target_entity: EntityId,
        management_rate: Decimal,
        legal_rate: Decimal,
    },
    /// Configure the sales share of the order margin. Replaces the
    /// hard-coded 50/50 split of the base algorithms.
    ProfitSplit { sales_ratio: Decimal },
    /// Force a clearing mode regardless of what the order carries.
    ModeOverride { mode: ClearingMode },
}

/// A stored, prioritized, data-driven transformation of clearing results.
///
/// Rules are pure configuration: the engines carry no business thresholds
/// of their own. Rules execute in ascending priority order within each
/// rule type; inactive rules and rules whose condition does not match the
/// order are skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClearingRule {
    /// Operator-assigned identifier, recorded on the legs a rule touches.
    pub rule_id: String,
    pub name: String,
    pub kind: RuleKind,
    /// Lower runs first.
    pub priority: i32,
    pub active: bool,
    /// Optional predicate over order fields; absent means always applicable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Applicability>,
}

impl ClearingRule {
    pub fn new(rule_id: impl Into<String>, name: impl Into<String>, kind: RuleKind) -> Self {
        Self {
            rule_id: rule_id.into(),
            name: name.into(),
            kind,
            priority: 100,
            active: true,
            condition: None,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_condition(mut self, condition: Applicability) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn deactivated(mut self) -> Self {
        self.active = false;
        self
    }

    /// Whether this rule applies to the given order: the rule must be
    /// active and its condition (if any) must match.
    pub fn applies_to(&self, order: &Order) -> bool {
        if !self.active {
            return false;
        }
        match &self.condition {
            Some(condition) => condition.matches(order),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::currency::CurrencyCode;
    use rust_decimal_macros::dec;

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

    fn sample_rule() -> ClearingRule {
        ClearingRule::new(
            "RULE-NET-1",
            "Net positions above 5k",
            RuleKind::NettingThreshold {
                threshold: dec!(5000),
            },
        )
    }

    #[test]
    fn test_rule_without_condition_applies() {
        assert!(sample_rule().applies_to(&sample_order()));
    }

    #[test]
    fn test_inactive_rule_never_applies() {
        assert!(!sample_rule().deactivated().applies_to(&sample_order()));
    }

    #[test]
    fn test_condition_gates_rule() {
        let rule = sample_rule().with_condition(
            Applicability::new().with_currencies(vec![CurrencyCode::new("CNY")]),
        );
        assert!(!rule.applies_to(&sample_order()));
    }

    #[test]
    fn test_rule_kind_round_trips_as_tagged_json() {
        let rule = ClearingRule::new(
            "RULE-TR-1",
            "HK transit 3%",
            RuleKind::TransitRetention {
                transit_entity: EntityId::new("HK-TRANSIT"),
                retention_rate: dec!(0.03),
                applies_to: LegFilter::Receivable,
            },
        );
        let json = serde_json::to_string(&rule).unwrap();
        assert!(json.contains("\"TransitRetention\""));
        let parsed: ClearingRule = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, rule);
    }
}
