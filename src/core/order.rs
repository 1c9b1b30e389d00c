use crate::core::currency::CurrencyCode;
use crate::core::entity::EntityId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Topology of the clearing decomposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClearingMode {
    /// One designated collection entity receives and pays for all parties.
    Star,
    /// Money conceptually passes customer → sales → delivery → supplier.
    Chain,
}

/// Lifecycle of an order with respect to clearing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClearingStatus {
    Pending,
    Clearing,
    Cleared,
    Failed,
}

/// One commercial shipment transaction.
///
/// Orders are created by order management and consumed read-only by the
/// pipeline; the only mutation the pipeline performs is flipping the
/// clearing status after a successful run.
///
/// # Examples
///
/// ```
/// use freight_clearing::core::order::{ClearingMode, Order};
/// use freight_clearing::core::entity::EntityId;
/// use freight_clearing::core::currency::CurrencyCode;
/// use rust_decimal_macros::dec;
///
/// let order = Order::new(
///     "FF-2024-0001",
///     "CUST-ACME",
///     EntityId::new("CN-SHA-SALES"),
///     dec!(10000),
///     dec!(6000),
///     CurrencyCode::new("USD"),
///     ClearingMode::Star,
/// )
/// .with_delivery_entity(EntityId::new("SG-DELIVERY"));
///
/// assert_eq!(order.total_amount(), dec!(10000));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Unique identifier for this order.
    id: Uuid,
    /// Human-readable business number.
    order_no: String,
    /// The customer the revenue is collected from.
    customer_id: String,
    /// Entity that sold the shipment.
    sales_entity: EntityId,
    /// Entity that performs the delivery, if different from sales.
    delivery_entity: Option<EntityId>,
    /// Designated collection entity for STAR mode, if configured.
    payment_entity: Option<EntityId>,
    /// Account the customer pays into; drives transit substitution.
    payment_account: Option<String>,
    /// Total revenue of the order. Must not be negative.
    total_amount: Decimal,
    /// Total cost of the order. Must not be negative.
    total_cost: Decimal,
    /// Currency of denomination.
    currency: CurrencyCode,
    clearing_mode: ClearingMode,
    clearing_status: ClearingStatus,
    /// Business line (e.g. "OCEAN_FREIGHT", "AIR_FREIGHT").
    business_type: Option<String>,
    port_of_loading: Option<String>,
    port_of_discharge: Option<String>,
    /// When the order was placed. Batch netting groups by calendar day.
    order_date: DateTime<Utc>,
}

impl Order {
    /// Create a new order.
    ///
    /// # Panics
    ///
    /// Panics if `total_amount` or `total_cost` is negative.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        order_no: impl Into<String>,
        customer_id: impl Into<String>,
        sales_entity: EntityId,
        total_amount: Decimal,
        total_cost: Decimal,
        currency: CurrencyCode,
        clearing_mode: ClearingMode,
    ) -> Self {
        assert!(
            total_amount >= Decimal::ZERO,
            "Order amount must not be negative, got {}",
            total_amount
        );
        assert!(
            total_cost >= Decimal::ZERO,
            "Order cost must not be negative, got {}",
            total_cost
        );
        Self {
            id: Uuid::new_v4(),
            order_no: order_no.into(),
            customer_id: customer_id.into(),
            sales_entity,
            delivery_entity: None,
            payment_entity: None,
            payment_account: None,
            total_amount,
            total_cost,
            currency,
            clearing_mode,
            clearing_status: ClearingStatus::Pending,
            business_type: None,
            port_of_loading: None,
            port_of_discharge: None,
            order_date: Utc::now(),
        }
    }

    /// Set the delivery entity.
    pub fn with_delivery_entity(mut self, entity: EntityId) -> Self {
        self.delivery_entity = Some(entity);
        self
    }

    /// Set the designated collection entity for STAR mode.
    pub fn with_payment_entity(mut self, entity: EntityId) -> Self {
        self.payment_entity = Some(entity);
        self
    }

    /// Set the account the customer pays into.
    pub fn with_payment_account(mut self, account: impl Into<String>) -> Self {
        self.payment_account = Some(account.into());
        self
    }

    /// Set the business line.
    pub fn with_business_type(mut self, business_type: impl Into<String>) -> Self {
        self.business_type = Some(business_type.into());
        self
    }

    /// Set the port pair.
    pub fn with_ports(mut self, loading: impl Into<String>, discharge: impl Into<String>) -> Self {
        self.port_of_loading = Some(loading.into());
        self.port_of_discharge = Some(discharge.into());
        self
    }

    /// Set the order date (defaults to now).
    pub fn with_order_date(mut self, date: DateTime<Utc>) -> Self {
        self.order_date = date;
        self
    }

    // --- Accessors ---

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn order_no(&self) -> &str {
        &self.order_no
    }

    pub fn customer_id(&self) -> &str {
        &self.customer_id
    }

    pub fn sales_entity(&self) -> &EntityId {
        &self.sales_entity
    }

    pub fn delivery_entity(&self) -> Option<&EntityId> {
        self.delivery_entity.as_ref()
    }

    pub fn payment_entity(&self) -> Option<&EntityId> {
        self.payment_entity.as_ref()
    }

    pub fn payment_account(&self) -> Option<&str> {
        self.payment_account.as_deref()
    }

    pub fn total_amount(&self) -> Decimal {
        self.total_amount
    }

    pub fn total_cost(&self) -> Decimal {
        self.total_cost
    }

    /// Gross margin of the order: amount minus cost. May be negative.
    pub fn total_profit(&self) -> Decimal {
        self.total_amount - self.total_cost
    }

    pub fn currency(&self) -> &CurrencyCode {
        &self.currency
    }

    pub fn clearing_mode(&self) -> ClearingMode {
        self.clearing_mode
    }

    pub fn clearing_status(&self) -> ClearingStatus {
        self.clearing_status
    }

    pub fn business_type(&self) -> Option<&str> {
        self.business_type.as_deref()
    }

    pub fn port_of_loading(&self) -> Option<&str> {
        self.port_of_loading.as_deref()
    }

    pub fn port_of_discharge(&self) -> Option<&str> {
        self.port_of_discharge.as_deref()
    }

    pub fn order_date(&self) -> DateTime<Utc> {
        self.order_date
    }

    /// The entity that collects from the customer in STAR mode:
    /// the payment entity if configured, otherwise the sales entity.
    pub fn collection_entity(&self) -> &EntityId {
        self.payment_entity.as_ref().unwrap_or(&self.sales_entity)
    }

    /// Flip the clearing status. The only mutation the pipeline performs.
    pub fn set_clearing_status(&mut self, status: ClearingStatus) {
        self.clearing_status = status;
    }
}
