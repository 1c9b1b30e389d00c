//! Batch generation utilities for the clearing pipeline.
//!
//! Generates random order batches to exercise clearing throughput and
//! netting behavior under various conditions.

use crate::core::currency::CurrencyCode;
use crate::core::entity::EntityId;
use crate::core::order::{ClearingMode, Order};
use rand::Rng;
use rust_decimal::Decimal;

/// Configuration for generating a random order batch.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Number of orders to generate.
    pub order_count: usize,
    /// Number of group entities orders are spread across.
    pub entity_count: usize,
    /// Number of distinct customers.
    pub customer_count: usize,
    /// Currencies to use.
    pub currencies: Vec<CurrencyCode>,
    /// Minimum order amount.
    pub min_amount: Decimal,
    /// Maximum order amount.
    pub max_amount: Decimal,
    /// Fraction of orders cleared in CHAIN mode (the rest are STAR).
    pub chain_ratio: f64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            order_count: 100,
            entity_count: 8,
            customer_count: 20,
            currencies: vec![CurrencyCode::new("USD")],
            min_amount: Decimal::from(1_000),
            max_amount: Decimal::from(500_000),
            chain_ratio: 0.4,
        }
    }
}

/// Generate a random order batch for testing.
pub fn generate_order_batch(config: &BatchConfig) -> Vec<Order> {
    let mut rng = rand::thread_rng();

    let entities: Vec<EntityId> = (0..config.entity_count)
        .map(|i| EntityId::new(format!("ENTITY-{:03}", i)))
        .collect();

    let min_f64: f64 = config.min_amount.to_string().parse().unwrap_or(1_000.0);
    let max_f64: f64 = config.max_amount.to_string().parse().unwrap_or(500_000.0);

    let mut orders = Vec::with_capacity(config.order_count);
    for i in 0..config.order_count {
        let amount_f64 = rng.gen_range(min_f64..max_f64);
        let amount = Decimal::from_f64_retain(amount_f64)
            .unwrap_or(Decimal::from(1_000))
            .round_dp(2);
        // Cost between 50% and 95% of revenue keeps the margin positive.
        let cost = (amount * Decimal::from_f64_retain(rng.gen_range(0.5..0.95)).unwrap_or_default())
            .round_dp(2);

        let sales_idx = rng.gen_range(0..entities.len());
        let mut delivery_idx = rng.gen_range(0..entities.len());
        while delivery_idx == sales_idx {
            delivery_idx = rng.gen_range(0..entities.len());
        }

        let mode = if rng.gen_bool(config.chain_ratio) {
            ClearingMode::Chain
        } else {
            ClearingMode::Star
        };
        let currency_idx = rng.gen_range(0..config.currencies.len());

        let order = Order::new(
            format!("FF-SIM-{:05}", i),
            format!("CUST-{:03}", rng.gen_range(0..config.customer_count)),
            entities[sales_idx].clone(),
            amount,
            cost,
            config.currencies[currency_idx].clone(),
            mode,
        )
        .with_delivery_entity(entities[delivery_idx].clone());
        let order = if rng.gen_bool(0.5) {
            order
                .with_business_type("OCEAN_FREIGHT")
                .with_ports("CNSHA", "SGSIN")
        } else {
            order.with_business_type("AIR_FREIGHT")
        };
        orders.push(order);
    }
    orders
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::clearing::ClearingEngine;

    #[test]
    fn test_batch_generation() {
        let config = BatchConfig {
            order_count: 25,
            currencies: vec![CurrencyCode::new("USD"), CurrencyCode::new("CNY")],
            ..Default::default()
        };
        let orders = generate_order_batch(&config);
        assert_eq!(orders.len(), 25);
        assert!(orders.iter().all(|o| o.total_cost() <= o.total_amount()));
    }

    #[test]
    fn test_generated_batch_clears() {
        let orders = generate_order_batch(&BatchConfig {
            order_count: 50,
            ..Default::default()
        });
        for order in &orders {
            let results = ClearingEngine::calculate(order, &[]).unwrap();
            assert!(!results.is_empty());
        }
    }
}
