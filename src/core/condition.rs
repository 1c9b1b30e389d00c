use crate::core::currency::CurrencyCode;
use crate::core::entity::Region;
use crate::core::order::Order;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Structured applicability predicate evaluated against order fields.
///
/// A closed set of clauses replaces the free-form condition strings of
/// older rule systems so every clause is exhaustively testable. All
/// clauses that are present must match; a predicate with no clauses
/// matches unconditionally.
///
/// # Examples
///
/// ```
/// use freight_clearing::core::condition::Applicability;
/// use freight_clearing::core::currency::CurrencyCode;
///
/// let pred = Applicability::new().with_currencies(vec![CurrencyCode::new("USD")]);
/// assert!(!pred.is_unconditional());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Applicability {
    /// Business types the predicate accepts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_types: Option<Vec<String>>,
    /// Currencies the predicate accepts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currencies: Option<Vec<CurrencyCode>>,
    /// Inclusive lower bound on the order's total amount.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_amount: Option<Decimal>,
    /// Inclusive upper bound on the order's total amount.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_amount: Option<Decimal>,
    /// Customers the predicate accepts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customers: Option<Vec<String>>,
    /// Regions the predicate accepts (checked against a flow's payer
    /// region by the cross-border processor; orders carry no region).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regions: Option<Vec<Region>>,
}

impl Applicability {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_business_types(mut self, business_types: Vec<String>) -> Self {
        self.business_types = Some(business_types);
        self
    }

    pub fn with_currencies(mut self, currencies: Vec<CurrencyCode>) -> Self {
        self.currencies = Some(currencies);
        self
    }

    pub fn with_amount_range(mut self, min: Option<Decimal>, max: Option<Decimal>) -> Self {
        self.min_amount = min;
        self.max_amount = max;
        self
    }

    pub fn with_customers(mut self, customers: Vec<String>) -> Self {
        self.customers = Some(customers);
        self
    }

    pub fn with_regions(mut self, regions: Vec<Region>) -> Self {
        self.regions = Some(regions);
        self
    }

    /// True when no clause is present.
    pub fn is_unconditional(&self) -> bool {
        self.business_types.is_none()
            && self.currencies.is_none()
            && self.min_amount.is_none()
            && self.max_amount.is_none()
            && self.customers.is_none()
            && self.regions.is_none()
    }

    /// Evaluate the order-level clauses against an order.
    ///
    /// The region clause is not an order property and is evaluated
    /// separately via [`Applicability::region_applies`].
    pub fn matches(&self, order: &Order) -> bool {
        if let Some(business_types) = &self.business_types {
            match order.business_type() {
                Some(bt) if business_types.iter().any(|b| b == bt) => {}
                _ => return false,
            }
        }
        if let Some(currencies) = &self.currencies {
            if !currencies.contains(order.currency()) {
                return false;
            }
        }
        if let Some(min) = self.min_amount {
            if order.total_amount() < min {
                return false;
            }
        }
        if let Some(max) = self.max_amount {
            if order.total_amount() > max {
                return false;
            }
        }
        if let Some(customers) = &self.customers {
            if !customers.iter().any(|c| c == order.customer_id()) {
                return false;
            }
        }
        true
    }

    /// Evaluate the region clause against a concrete region.
    pub fn region_applies(&self, region: &Region) -> bool {
        match &self.regions {
            Some(regions) => regions.contains(region),
            None => true,
        }
    }

    /// Parse a serialized predicate. Callers are expected to log and skip
    /// the owning configuration on error (fail-closed for malformed
    /// payloads), while an absent predicate means unconditional match.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}
