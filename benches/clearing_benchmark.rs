use criterion::{black_box, criterion_group, criterion_main, Criterion};
use freight_clearing::core::entity::EntityId;
use freight_clearing::engine::clearing::ClearingEngine;
use freight_clearing::rules::config::{ClearingRule, LegFilter, RuleKind};
use freight_clearing::simulation::order_gen::{generate_order_batch, BatchConfig};
use rust_decimal_macros::dec;

fn rule_set() -> Vec<ClearingRule> {
    vec![
        ClearingRule::new(
            "RULE-TR-3PCT",
            "HK transit 3%",
            RuleKind::TransitRetention {
                transit_entity: EntityId::new("HK-TRANSIT"),
                retention_rate: dec!(0.03),
                applies_to: LegFilter::Receivable,
            },
        ),
        ClearingRule::new(
            "RULE-CB-FEE",
            "HK relay fee",
            RuleKind::CrossBorderFee {
                transit_entity: EntityId::new("HK-TRANSIT"),
                handling_fee: dec!(25),
            },
        ),
        ClearingRule::new(
            "RULE-NET-10K",
            "Net above 10k",
            RuleKind::NettingThreshold {
                threshold: dec!(10000),
            },
        ),
    ]
}

fn bench_clearing_100_orders(c: &mut Criterion) {
    let orders = generate_order_batch(&BatchConfig {
        order_count: 100,
        ..Default::default()
    });

    c.bench_function("clearing_100_orders_no_rules", |b| {
        b.iter(|| {
            for order in &orders {
                ClearingEngine::calculate(black_box(order), &[]).unwrap();
            }
        })
    });
}

fn bench_clearing_100_orders_with_rules(c: &mut Criterion) {
    let orders = generate_order_batch(&BatchConfig {
        order_count: 100,
        ..Default::default()
    });
    let rules = rule_set();

    c.bench_function("clearing_100_orders_with_rules", |b| {
        b.iter(|| {
            for order in &orders {
                ClearingEngine::calculate(black_box(order), &rules).unwrap();
            }
        })
    });
}

fn bench_clearing_1000_orders_with_rules(c: &mut Criterion) {
    let orders = generate_order_batch(&BatchConfig {
        order_count: 1000,
        ..Default::default()
    });
    let rules = rule_set();

    c.bench_function("clearing_1000_orders_with_rules", |b| {
        b.iter(|| {
            for order in &orders {
                ClearingEngine::calculate(black_box(order), &rules).unwrap();
            }
        })
    });
}

criterion_group!(
    benches,
    bench_clearing_100_orders,
    bench_clearing_100_orders_with_rules,
    bench_clearing_1000_orders_with_rules
);
criterion_main!(benches);
