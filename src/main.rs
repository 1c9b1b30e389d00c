//! freight-clearing CLI
//!
//! Run the clearing pipeline from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Clear orders from a JSON file
//! freight-clearing clear --input orders.json
//!
//! # With a rule configuration, emitting JSON
//! freight-clearing clear --input orders.json --rules rules.json --format json
//!
//! # Batch netting over cross-border flows
//! freight-clearing netting --input orders.json --flows flows.json
//!
//! # Generate a random order batch for testing
//! freight-clearing generate --orders 50 --entities 6
//! ```

use chrono::{DateTime, Utc};
use freight_clearing::core::currency::CurrencyCode;
use freight_clearing::core::entity::EntityId;
use freight_clearing::core::order::{ClearingMode, Order};
use freight_clearing::core::result::ClearingResult;
use freight_clearing::crossborder::config::CrossBorderFlow;
use freight_clearing::crossborder::processor::CrossBorderProcessor;
use freight_clearing::engine::clearing::ClearingEngine;
use freight_clearing::rules::config::ClearingRule;
use freight_clearing::simulation::order_gen::{generate_order_batch, BatchConfig};
use rust_decimal::Decimal;
use std::fs;
use std::process;

fn print_usage() {
    eprintln!(
        r#"freight-clearing — multi-entity clearing for a freight-forwarding group

USAGE:
    freight-clearing <COMMAND> [OPTIONS]

COMMANDS:
    clear       Run the clearing pipeline on a batch of orders
    netting     Offset same-day orders over netting-enabled flows
    generate    Generate a random order batch (for testing)
    help        Show this message

OPTIONS (clear):
    --input <FILE>      Path to JSON orders file
    --rules <FILE>      Path to JSON clearing rules file
    --format <FORMAT>   Output format: text (default) or json

OPTIONS (netting):
    --input <FILE>      Path to JSON orders file
    --flows <FILE>      Path to JSON cross-border flows file

OPTIONS (generate):
    --orders <N>        Number of orders (default: 100)
    --entities <N>      Number of group entities (default: 8)
    --currencies <LIST> Comma-separated currency codes (default: USD)
    --output <FILE>     Write to file instead of stdout

EXAMPLES:
    freight-clearing clear --input orders.json
    freight-clearing clear --input orders.json --rules rules.json --format json
    freight-clearing netting --input orders.json --flows flows.json
    freight-clearing generate --orders 50 --currencies USD,CNY --output batch.json"#
    );
}

/// JSON schema for input orders.
#[derive(serde::Deserialize, serde::Serialize)]
struct OrderInput {
    order_no: String,
    customer_id: String,
    sales_entity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    delivery_entity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payment_entity: Option<String>,
    amount: String,
    cost: String,
    #[serde(default = "default_currency")]
    currency: String,
    #[serde(default = "default_mode")]
    mode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    business_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    order_date: Option<DateTime<Utc>>,
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_mode() -> String {
    "star".to_string()
}

#[derive(serde::Deserialize, serde::Serialize)]
struct OrdersFile {
    orders: Vec<OrderInput>,
}

/// JSON output schema for one cleared order.
#[derive(serde::Serialize)]
struct ClearedOrderOutput {
    order_no: String,
    legs: Vec<LegOutput>,
}

#[derive(serde::Serialize)]
struct LegOutput {
    entity: String,
    amount: String,
    currency: String,
    transaction_type: String,
    account_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    rule_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

fn parse_amount(raw: &str, field: &str) -> Decimal {
    raw.parse().unwrap_or_else(|e| {
        eprintln!("Invalid {} '{}': {}", field, raw, e);
        process::exit(1);
    })
}

fn load_orders(path: &str) -> Vec<Order> {
    let content = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading file '{}': {}", path, e);
        process::exit(1);
    });

    let file: OrdersFile = serde_json::from_str(&content).unwrap_or_else(|e| {
        eprintln!("Error parsing JSON: {}", e);
        eprintln!("Expected format:");
        eprintln!(
            r#"{{
  "orders": [
    {{ "order_no": "FF-2024-0001", "customer_id": "CUST-ACME",
      "sales_entity": "CN-SHA-SALES", "delivery_entity": "SG-DELIVERY",
      "amount": "10000", "cost": "6000", "currency": "USD", "mode": "star" }}
  ]
}}"#
        );
        process::exit(1);
    });

    file.orders
        .into_iter()
        .map(|input| {
            let mode = match input.mode.to_ascii_lowercase().as_str() {
                "star" => ClearingMode::Star,
                "chain" => ClearingMode::Chain,
                other => {
                    eprintln!("Invalid mode '{}': expected 'star' or 'chain'", other);
                    process::exit(1);
                }
            };
            let mut order = Order::new(
                input.order_no,
                input.customer_id,
                EntityId::new(&input.sales_entity),
                parse_amount(&input.amount, "amount"),
                parse_amount(&input.cost, "cost"),
                CurrencyCode::new(&input.currency),
                mode,
            );
            if let Some(delivery) = input.delivery_entity {
                order = order.with_delivery_entity(EntityId::new(&delivery));
            }
            if let Some(payment) = input.payment_entity {
                order = order.with_payment_entity(EntityId::new(&payment));
            }
            if let Some(business_type) = input.business_type {
                order = order.with_business_type(business_type);
            }
            if let Some(date) = input.order_date {
                order = order.with_order_date(date);
            }
            order
        })
        .collect()
}

fn load_rules(path: &str) -> Vec<ClearingRule> {
    let content = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading file '{}': {}", path, e);
        process::exit(1);
    });
    serde_json::from_str(&content).unwrap_or_else(|e| {
        eprintln!("Error parsing rules JSON: {}", e);
        process::exit(1);
    })
}

fn load_flows(path: &str) -> Vec<CrossBorderFlow> {
    let content = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading file '{}': {}", path, e);
        process::exit(1);
    });
    serde_json::from_str(&content).unwrap_or_else(|e| {
        eprintln!("Error parsing flows JSON: {}", e);
        process::exit(1);
    })
}

fn leg_output(leg: &ClearingResult) -> LegOutput {
    LegOutput {
        entity: leg.entity().to_string(),
        amount: leg.amount().to_string(),
        currency: leg.currency().to_string(),
        transaction_type: format!("{:?}", leg.transaction_type()),
        account_type: format!("{:?}", leg.account_type()),
        rule_id: leg.rule_id().map(str::to_string),
        description: leg.description().map(str::to_string),
    }
}

fn cmd_clear(args: &[String]) {
    let mut input_path = None;
    let mut rules_path = None;
    let mut format = "text".to_string();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--input" => {
                i += 1;
                input_path = Some(args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--input requires a file path");
                    process::exit(1);
                }));
            }
            "--rules" => {
                i += 1;
                rules_path = Some(args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--rules requires a file path");
                    process::exit(1);
                }));
            }
            "--format" => {
                i += 1;
                format = args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--format requires 'text' or 'json'");
                    process::exit(1);
                });
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    let path = input_path.unwrap_or_else(|| {
        eprintln!("Error: --input <FILE> is required");
        process::exit(1);
    });

    let orders = load_orders(&path);
    let rules = rules_path.map(|p| load_rules(&p)).unwrap_or_default();

    let mut cleared = Vec::new();
    for order in &orders {
        match ClearingEngine::calculate(order, &rules) {
            Ok(results) => cleared.push(ClearedOrderOutput {
                order_no: order.order_no().to_string(),
                legs: results.iter().map(leg_output).collect(),
            }),
            Err(e) => {
                eprintln!("Order {} failed: {}", order.order_no(), e);
                process::exit(1);
            }
        }
    }

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&cleared).unwrap());
    } else {
        for order in &cleared {
            println!("Order {}", order.order_no);
            for leg in &order.legs {
                println!(
                    "  {:<20} {:>14} {}  {} / {}{}",
                    leg.entity,
                    leg.amount,
                    leg.currency,
                    leg.transaction_type,
                    leg.account_type,
                    leg.rule_id
                        .as_deref()
                        .map(|r| format!("  [{}]", r))
                        .unwrap_or_default()
                );
            }
        }
        println!("\nCleared {} orders.", cleared.len());
    }
}

fn cmd_netting(args: &[String]) {
    let mut input_path = None;
    let mut flows_path = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--input" => {
                i += 1;
                input_path = Some(args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--input requires a file path");
                    process::exit(1);
                }));
            }
            "--flows" => {
                i += 1;
                flows_path = Some(args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--flows requires a file path");
                    process::exit(1);
                }));
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    let (input_path, flows_path) = match (input_path, flows_path) {
        (Some(input), Some(flows)) => (input, flows),
        _ => {
            eprintln!("Error: --input <FILE> and --flows <FILE> are required");
            process::exit(1);
        }
    };

    let orders = load_orders(&input_path);
    let flows = load_flows(&flows_path);
    let netted = CrossBorderProcessor::process_netting(&orders, &flows);

    if netted.is_empty() {
        println!("No nettable order groups.");
        return;
    }
    let mut flow_ids: Vec<&String> = netted.keys().collect();
    flow_ids.sort();
    for flow_id in flow_ids {
        println!("Flow {}", flow_id);
        for leg in &netted[flow_id] {
            println!(
                "  {:<20} {:>14} {}  {}",
                leg.entity().to_string(),
                leg.amount().to_string(),
                leg.currency(),
                leg.description().unwrap_or("")
            );
        }
    }
}

fn cmd_generate(args: &[String]) {
    let mut order_count = 100usize;
    let mut entity_count = 8usize;
    let mut currencies_str = "USD".to_string();
    let mut output_path: Option<String> = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--orders" => {
                i += 1;
                order_count = args
                    .get(i)
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(|| {
                        eprintln!("--orders requires a number");
                        process::exit(1);
                    });
            }
            "--entities" => {
                i += 1;
                entity_count = args
                    .get(i)
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(|| {
                        eprintln!("--entities requires a number");
                        process::exit(1);
                    });
            }
            "--currencies" => {
                i += 1;
                currencies_str = args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--currencies requires a comma-separated list");
                    process::exit(1);
                });
            }
            "--output" => {
                i += 1;
                output_path = Some(args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--output requires a file path");
                    process::exit(1);
                }));
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    let currencies: Vec<CurrencyCode> = currencies_str
        .split(',')
        .map(|s| CurrencyCode::new(s.trim()))
        .collect();

    let config = BatchConfig {
        order_count,
        entity_count,
        currencies,
        ..Default::default()
    };
    let orders = generate_order_batch(&config);

    let output = OrdersFile {
        orders: orders
            .iter()
            .map(|order| OrderInput {
                order_no: order.order_no().to_string(),
                customer_id: order.customer_id().to_string(),
                sales_entity: order.sales_entity().to_string(),
                delivery_entity: order.delivery_entity().map(|e| e.to_string()),
                payment_entity: order.payment_entity().map(|e| e.to_string()),
                amount: order.total_amount().to_string(),
                cost: order.total_cost().to_string(),
                currency: order.currency().to_string(),
                mode: match order.clearing_mode() {
                    ClearingMode::Star => "star".to_string(),
                    ClearingMode::Chain => "chain".to_string(),
                },
                business_type: order.business_type().map(str::to_string),
                order_date: Some(order.order_date()),
            })
            .collect(),
    };

    let json = serde_json::to_string_pretty(&output).unwrap();

    if let Some(path) = output_path {
        fs::write(&path, &json).unwrap_or_else(|e| {
            eprintln!("Error writing to '{}': {}", path, e);
            process::exit(1);
        });
        eprintln!(
            "Generated {} orders across {} entities → {}",
            order_count, entity_count, path
        );
    } else {
        println!("{}", json);
    }
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let command = args[1].as_str();
    let rest = &args[2..];

    match command {
        "clear" => cmd_clear(rest),
        "netting" => cmd_netting(rest),
        "generate" => cmd_generate(rest),
        "help" | "--help" | "-h" => print_usage(),
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            process::exit(1);
        }
    }
}
