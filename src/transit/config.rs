use crate::core::condition::Applicability;
use crate::core::entity::EntityId;
use crate::core::order::Order;
use crate::core::round_money;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Direction of a borrowed-name relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitType {
    /// Customer pays the transit entity, which forwards to the target.
    ReceivableTransit,
    /// Source pays the transit entity, which settles with the supplier.
    PayableTransit,
}

/// How a relay entity's fee is computed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value")]
pub enum Retention {
    /// Relay keeps nothing.
    None,
    /// Fraction of the relayed amount, rounded to cents.
    Percentage(Decimal),
    /// Fixed fee, capped at the relayed amount.
    Fixed(Decimal),
}

impl Retention {
    /// Fee retained on a relayed `amount` (non-negative input expected).
    ///
    /// Percentage fees round half-away-from-zero to two decimals; fixed
    /// fees never exceed the amount itself.
    pub fn calculate(&self, amount: Decimal) -> Decimal {
        match *self {
            Retention::None => Decimal::ZERO,
            Retention::Percentage(rate) => round_money(amount * rate),
            Retention::Fixed(fee) => fee.min(amount),
        }
    }
}

/// Configuration of one borrowed-name transit route.
///
/// The transit entity lends its name (and bank account) to a payment
/// between the source and target entities, keeping a retention fee for
/// the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitEntity {
    pub transit_id: String,
    pub name: String,
    pub transit_type: TransitType,
    /// Entity the money economically originates from.
    pub source_entity: EntityId,
    /// Entity whose name the payment travels under.
    pub transit_entity: EntityId,
    /// Entity the money is economically destined for.
    pub target_entity: EntityId,
    /// Bank account the relay collects or pays through.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transit_account: Option<String>,
    pub retention: Retention,
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Applicability>,
}

impl TransitEntity {
    pub fn new(
        transit_id: impl Into<String>,
        name: impl Into<String>,
        transit_type: TransitType,
        source_entity: EntityId,
        transit_entity: EntityId,
        target_entity: EntityId,
        retention: Retention,
    ) -> Self {
        Self {
            transit_id: transit_id.into(),
            name: name.into(),
            transit_type,
            source_entity,
            transit_entity,
            target_entity,
            transit_account: None,
            retention,
            active: true,
            condition: None,
        }
    }

    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.transit_account = Some(account.into());
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

    /// Whether this route applies to the given order.
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
