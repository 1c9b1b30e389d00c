use crate::core::currency::CurrencyCode;
use crate::core::entity::EntityId;
use crate::core::order::Order;
use crate::core::result::{AccountType, ClearingResult, TransactionType};
use crate::core::round_money;
use crate::crossborder::config::{CrossBorderFlow, ProcessingType};
use chrono::NaiveDate;
use log::debug;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// A transfer deferred to a later settlement window by a segmented flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingTransfer {
    pub flow_id: String,
    pub order_id: Uuid,
    pub amount: Decimal,
    pub currency: CurrencyCode,
}

/// Legs produced by a flow plus any deferred remainder.
#[derive(Debug, Clone, Default)]
pub struct FlowOutcome {
    pub legs: Vec<ClearingResult>,
    pub pending: Vec<PendingTransfer>,
}

/// Stateless processor for cross-border flows.
pub struct CrossBorderProcessor;

impl CrossBorderProcessor {
    /// Whether any applicable flow genuinely crosses a region boundary.
    pub fn requires_cross_border_flow(order: &Order, flows: &[CrossBorderFlow]) -> bool {
        flows
            .iter()
            .any(|f| f.applies_to(order) && f.is_cross_border())
    }

    /// Active flows applicable to the order, in configuration order.
    pub fn applicable_flows<'a>(
        order: &Order,
        flows: &'a [CrossBorderFlow],
    ) -> Vec<&'a CrossBorderFlow> {
        flows.iter().filter(|f| f.applies_to(order)).collect()
    }

    /// Fee a flow retains on a transferred amount.
    pub fn calculate_retention(flow: &CrossBorderFlow, amount: Decimal) -> Decimal {
        flow.retention.calculate(amount)
    }

    /// Run an order's full amount through a flow's transfer strategy.
    pub fn process_order(order: &Order, flow: &CrossBorderFlow) -> FlowOutcome {
        Self::process_flow(order, flow, order.total_amount())
    }

    /// Run an amount through a flow's transfer strategy. The order supplies
    /// identity, currency, and clearing mode; the amount may be the full
    /// order amount or a partial relay such as a deferred remainder.
    pub fn process_flow(order: &Order, flow: &CrossBorderFlow, amount: Decimal) -> FlowOutcome {
        match flow.processing {
            ProcessingType::FlatTransfer => FlowOutcome {
                legs: Self::flat_transfer(order, flow, amount),
                pending: Vec::new(),
            },
            ProcessingType::NetTransfer => FlowOutcome {
                legs: Self::net_transfer(order, flow, amount),
                pending: Vec::new(),
            },
            ProcessingType::SegmentedTransfer => Self::segmented_transfer(order, flow, amount),
        }
    }

    /// Complete a deferred remainder as a flat transfer. The follow-up
    /// moves the full pending amount and never re-segments.
    pub fn settle_pending(
        order: &Order,
        flow: &CrossBorderFlow,
        pending: &PendingTransfer,
    ) -> Vec<ClearingResult> {
        Self::flat_transfer(order, flow, pending.amount)
    }

    /// Full amount travels payer → transit → receiver; the transit entity
    /// keeps the retention.
    fn flat_transfer(
        order: &Order,
        flow: &CrossBorderFlow,
        amount: Decimal,
    ) -> Vec<ClearingResult> {
        let retention = flow.retention.calculate(amount);
        let transfer = amount - retention;
        debug!(
            "flat transfer over {} for {}: amount {}, retained {}",
            flow.flow_id,
            order.order_no(),
            amount,
            retention
        );

        let mut legs = vec![
            Self::leg(
                order,
                flow,
                flow.transit_entity.clone(),
                amount,
                AccountType::CrossBorderReceivable,
                "inbound from payer",
            ),
            Self::leg(
                order,
                flow,
                flow.payer_entity.clone(),
                -amount,
                AccountType::CrossBorderPayable,
                "outbound to transit",
            ),
        ];
        if transfer != Decimal::ZERO {
            legs.push(Self::leg(
                order,
                flow,
                flow.receiver_entity.clone(),
                transfer,
                AccountType::CrossBorderReceivable,
                "inbound from transit",
            ));
            legs.push(Self::leg(
                order,
                flow,
                flow.transit_entity.clone(),
                -transfer,
                AccountType::CrossBorderPayable,
                "outbound to receiver",
            ));
        }
        if retention > Decimal::ZERO {
            legs.push(Self::retention_audit(order, flow, retention));
        }
        legs
    }

    /// Only the post-retention net moves, directly payer → receiver. The
    /// fee is recorded on the transit entity as an audit leg.
    fn net_transfer(order: &Order, flow: &CrossBorderFlow, amount: Decimal) -> Vec<ClearingResult> {
        let retention = flow.retention.calculate(amount);
        let transfer = amount - retention;
        debug!(
            "net transfer over {} for {}: moving {}",
            flow.flow_id,
            order.order_no(),
            transfer
        );

        let mut legs = Vec::new();
        if transfer != Decimal::ZERO {
            legs.push(Self::leg(
                order,
                flow,
                flow.receiver_entity.clone(),
                transfer,
                AccountType::CrossBorderReceivable,
                "net inbound from payer",
            ));
            legs.push(Self::leg(
                order,
                flow,
                flow.payer_entity.clone(),
                -transfer,
                AccountType::CrossBorderPayable,
                "net outbound to receiver",
            ));
        }
        if retention > Decimal::ZERO {
            legs.push(Self::retention_audit(order, flow, retention));
        }
        legs
    }

    /// Half the amount moves now as a flat transfer; the remainder is
    /// surfaced as a pending transfer instead of silently completing.
    fn segmented_transfer(order: &Order, flow: &CrossBorderFlow, amount: Decimal) -> FlowOutcome {
        let first_leg = round_money(amount / Decimal::TWO);
        let remainder = amount - first_leg;
        debug!(
            "segmented transfer over {} for {}: moving {}, deferring {}",
            flow.flow_id,
            order.order_no(),
            first_leg,
            remainder
        );

        let mut outcome = FlowOutcome {
            legs: Self::flat_transfer(order, flow, first_leg),
            pending: Vec::new(),
        };
        if remainder > Decimal::ZERO {
            outcome.pending.push(PendingTransfer {
                flow_id: flow.flow_id.clone(),
                order_id: order.id(),
                amount: remainder,
                currency: order.currency().clone(),
            });
        }
        outcome
    }

    /// Offset same-day orders over netting-enabled flows into one summary
    /// leg per flow and day.
    ///
    /// Each order joins the group of every netting-enabled flow that
    /// applies to it, keyed by calendar date. A group needs at least two
    /// orders to net; singletons settle individually and produce nothing
    /// here. The summary leg lands on the receiver entity for a positive
    /// net and the payer entity for a negative one, tagged with the flow
    /// and a representative order.
    pub fn process_netting(
        orders: &[Order],
        flows: &[CrossBorderFlow],
    ) -> HashMap<String, Vec<ClearingResult>> {
        let mut nettable: Vec<&CrossBorderFlow> =
            flows.iter().filter(|f| f.netting_enabled).collect();
        nettable.sort_by_key(|f| f.netting_priority);

        let mut groups: HashMap<(String, NaiveDate), Vec<&Order>> = HashMap::new();
        for order in orders {
            for flow in nettable.iter().filter(|f| f.applies_to(order)) {
                groups
                    .entry((flow.flow_id.clone(), order.order_date().date_naive()))
                    .or_default()
                    .push(order);
            }
        }

        let mut results: HashMap<String, Vec<ClearingResult>> = HashMap::new();
        for ((flow_id, date), group) in groups {
            if group.len() < 2 {
                continue;
            }
            // Defensive lookup; the flow was present when the group formed.
            let Some(flow) = nettable.iter().find(|f| f.flow_id == flow_id) else {
                continue;
            };

            let net: Decimal = group
                .iter()
                .map(|o| {
                    if o.total_amount() > Decimal::ZERO {
                        o.total_amount()
                    } else {
                        -o.total_amount().abs()
                    }
                })
                .sum();
            if net == Decimal::ZERO {
                continue;
            }

            let representative = group[0];
            let entity = if net > Decimal::ZERO {
                flow.receiver_entity.clone()
            } else {
                flow.payer_entity.clone()
            };
            debug!(
                "netting {} orders over {} on {}: net {}",
                group.len(),
                flow_id,
                date,
                net
            );

            let leg = ClearingResult::new(
                representative.id(),
                entity,
                net,
                representative.currency().clone(),
                TransactionType::Netting,
                AccountType::Netting,
                representative.clearing_mode(),
            )
            .with_flow_id(flow_id.clone())
            .with_description(format!("net settlement of {} orders on {}", group.len(), date));

            results.entry(flow_id).or_default().push(leg);
        }
        results
    }

    fn retention_audit(
        order: &Order,
        flow: &CrossBorderFlow,
        retention: Decimal,
    ) -> ClearingResult {
        ClearingResult::new(
            order.id(),
            flow.transit_entity.clone(),
            Decimal::ZERO,
            order.currency().clone(),
            TransactionType::TransitFee,
            AccountType::Retention,
            order.clearing_mode(),
        )
        .as_retention_audit(retention)
        .with_flow_id(flow.flow_id.clone())
        .with_description(format!("cross-border retention for {}", order.order_no()))
    }

    fn leg(
        order: &Order,
        flow: &CrossBorderFlow,
        entity: EntityId,
        amount: Decimal,
        account: AccountType,
        description: &str,
    ) -> ClearingResult {
        let transaction = if amount > Decimal::ZERO {
            TransactionType::Receivable
        } else {
            TransactionType::Payable
        };
        ClearingResult::new(
            order.id(),
            entity,
            amount,
            order.currency().clone(),
            transaction,
            account,
            order.clearing_mode(),
        )
        .with_flow_id(flow.flow_id.clone())
        .with_description(format!("{} {}", description, order.order_no()))
    }
}
