use crate::core::condition::Applicability;
use crate::core::entity::{EntityId, Region};
use crate::core::order::Order;
use crate::core::round_money;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// How money crosses the border for a flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessingType {
    /// Full amount relayed through the transit entity in one movement.
    FlatTransfer,
    /// Only the net amount moves between payer and receiver.
    NetTransfer,
    /// Half moves now; the remainder is surfaced as a pending transfer
    /// for a later window.
    SegmentedTransfer,
}

/// One bracket of a tiered retention schedule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tier {
    /// Inclusive upper bound; `None` means the open-ended top bracket.
    pub up_to: Option<Decimal>,
    pub rate: Decimal,
}

/// Amount-dependent retention brackets, evaluated lowest bracket first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierSchedule {
    pub tiers: Vec<Tier>,
}

impl Default for TierSchedule {
    /// Standard schedule: 1% up to 10,000, 2% up to 100,000, 3% above.
    fn default() -> Self {
        Self {
            tiers: vec![
                Tier {
                    up_to: Some(dec!(10000)),
                    rate: dec!(0.01),
                },
                Tier {
                    up_to: Some(dec!(100000)),
                    rate: dec!(0.02),
                },
                Tier {
                    up_to: None,
                    rate: dec!(0.03),
                },
            ],
        }
    }
}

impl TierSchedule {
    /// Rate for `amount`: the first bracket whose bound covers it. An
    /// amount above every bounded bracket falls into the open-ended one;
    /// a schedule with no matching bracket retains nothing.
    pub fn rate_for(&self, amount: Decimal) -> Decimal {
        self.tiers
            .iter()
            .find(|tier| tier.up_to.map_or(true, |bound| amount <= bound))
            .map(|tier| tier.rate)
            .unwrap_or(Decimal::ZERO)
    }
}

/// Retention policy of a cross-border flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value")]
pub enum FlowRetention {
    None,
    /// Flat fraction of the transferred amount.
    Percentage(Decimal),
    /// Fixed fee, capped at the transferred amount.
    Fixed(Decimal),
    /// Bracketed rate depending on the transferred amount.
    Tiered(TierSchedule),
}

impl FlowRetention {
    /// Fee retained on a transferred `amount` (non-negative input
    /// expected), rounded to cents.
    pub fn calculate(&self, amount: Decimal) -> Decimal {
        match self {
            FlowRetention::None => Decimal::ZERO,
            FlowRetention::Percentage(rate) => round_money(amount * rate),
            FlowRetention::Fixed(fee) => (*fee).min(amount),
            FlowRetention::Tiered(schedule) => round_money(amount * schedule.rate_for(amount)),
        }
    }
}

/// Configuration of one cross-border capital flow.
///
/// A flow routes money from a payer entity in one region to a receiver
/// entity in another, through a transit entity that absorbs the
/// regulatory friction and keeps the retention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossBorderFlow {
    pub flow_id: String,
    pub name: String,
    pub payer_entity: EntityId,
    pub payer_region: Region,
    pub transit_entity: EntityId,
    pub transit_region: Region,
    pub receiver_entity: EntityId,
    pub receiver_region: Region,
    pub processing: ProcessingType,
    pub retention: FlowRetention,
    /// Whether same-day orders over this flow may be offset into one
    /// net movement.
    pub netting_enabled: bool,
    /// Lower wins when several netting-enabled flows match an order.
    pub netting_priority: i32,
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Applicability>,
}

impl CrossBorderFlow {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        flow_id: impl Into<String>,
        name: impl Into<String>,
        payer: (EntityId, Region),
        transit: (EntityId, Region),
        receiver: (EntityId, Region),
        processing: ProcessingType,
        retention: FlowRetention,
    ) -> Self {
        Self {
            flow_id: flow_id.into(),
            name: name.into(),
            payer_entity: payer.0,
            payer_region: payer.1,
            transit_entity: transit.0,
            transit_region: transit.1,
            receiver_entity: receiver.0,
            receiver_region: receiver.1,
            processing,
            retention,
            netting_enabled: false,
            netting_priority: 100,
            active: true,
            condition: None,
        }
    }

    pub fn with_netting(mut self, priority: i32) -> Self {
        self.netting_enabled = true;
        self.netting_priority = priority;
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

    /// Whether the money genuinely changes region on this flow.
    pub fn is_cross_border(&self) -> bool {
        self.payer_region != self.receiver_region
    }

    /// Whether this flow applies to the given order. The region clause of
    /// the condition is checked against the payer region, since orders
    /// carry no region of their own.
    pub fn applies_to(&self, order: &Order) -> bool {
        if !self.active {
            return false;
        }
        match &self.condition {
            Some(condition) => {
                condition.matches(order) && condition.region_applies(&self.payer_region)
            }
            None => true,
        }
    }
}
