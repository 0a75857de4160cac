//! # Seed Data Generator
//!
//! Populates a database with a demo tenant for development.
//!
//! ## Usage
//! ```bash
//! # Default database path (./ledgerline.db)
//! cargo run -p ledgerline-db --bin seed
//!
//! # Custom path and product count
//! cargo run -p ledgerline-db --bin seed -- --db ./data/demo.db --count 500
//! ```
//!
//! ## What Gets Seeded
//! - One tenant with two cash accounts (till + bank)
//! - Two salespeople with different commission rate tables
//! - Products across a handful of categories
//! - One worked order-to-cash example: create → approve → ship (cash)

use chrono::Utc;
use std::env;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use ledgerline_core::{Direction, LineSource, OrderLineDraft, PaymentMethod};
use ledgerline_db::{Database, DbConfig, NewProduct};

/// Product categories for realistic demo data
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "BEV",
        &["Cola 330ml", "Cola 1L", "Sparkling Water", "Iced Tea", "Orange Juice"],
    ),
    (
        "SNK",
        &["Potato Chips", "Peanut Pack", "Chocolate Bar", "Wafer Roll", "Crackers"],
    ),
    (
        "HH",
        &["Dish Soap", "Laundry Powder", "Sponge 3pk", "Trash Bags", "Light Bulb"],
    ),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args: Vec<String> = env::args().collect();
    let db_path = arg_value(&args, "--db").unwrap_or_else(|| "./ledgerline.db".to_string());
    let count: usize = arg_value(&args, "--count")
        .and_then(|v| v.parse().ok())
        .unwrap_or(60);

    info!(db = %db_path, count = count, "Seeding demo data");

    let db = Database::new(DbConfig::new(&db_path)).await?;

    let tenant = db.tenants().create_tenant("Demo Retail Co").await?;
    let till = db.cash_accounts().create(&tenant.id, "Front Till").await?;
    let bank = db.cash_accounts().create(&tenant.id, "Bank Account").await?;

    // Opening capital lands through the ledger so the balance invariant
    // holds from the first cent.
    db.ledger()
        .record(&tenant.id, &bank.id, Utc::now(), 5_000_000, Direction::In, "Opening capital")
        .await?;
    db.ledger()
        .record(&tenant.id, &till.id, Utc::now(), 200_000, Direction::In, "Till float")
        .await?;

    let ari = db
        .tenants()
        .create_salesperson(&tenant.id, "Ari", 300, 150)
        .await?;
    db.tenants()
        .create_salesperson(&tenant.id, "Budi", 250, 100)
        .await?;

    let mut first_product_id = None;
    let mut seeded = 0;
    'outer: for (prefix, names) in CATEGORIES {
        for (i, name) in names.iter().enumerate() {
            if seeded >= count {
                break 'outer;
            }
            let cost = 500 + (seeded as i64 * 37) % 2000;
            let product = db
                .products()
                .create(
                    &tenant.id,
                    NewProduct {
                        sku: format!("{}-{:03}", prefix, i + 1),
                        name: (*name).to_string(),
                        cost_cents: cost,
                        price_cents: cost + cost / 4,
                        stock_quantity: 50 + (seeded as i64 * 13) % 150,
                        allow_negative_stock: false,
                    },
                )
                .await?;
            first_product_id.get_or_insert(product.id);
            seeded += 1;
        }
    }

    info!(products = seeded, "Products seeded");

    // A worked order-to-cash example against the first product
    if let Some(product_id) = first_product_id {
        let product = db.products().get(&tenant.id, &product_id).await?.unwrap();
        let lines = vec![OrderLineDraft {
            id: None,
            source: LineSource::Catalog {
                product_id: product.id.clone(),
            },
            name: product.name.clone(),
            unit_price_cents: product.price_cents,
            quantity: 3,
        }];

        let workflow = db.order_workflow();
        let customer_id = format!("walk-in-{}", Uuid::new_v4());
        let order_id = workflow
            .create_order(
                &tenant.id,
                &ari.id,
                Some(customer_id.as_str()),
                PaymentMethod::Cash,
                None,
                &lines,
            )
            .await?;
        workflow.approve_order(&tenant.id, &order_id, &lines).await?;
        let sale_id = workflow
            .ship_order(&tenant.id, &order_id, Some(&till.id))
            .await?;

        info!(order_id = %order_id, sale_id = %sale_id, "Demo order shipped");
    }

    info!(tenant_id = %tenant.id, "Seed complete");

    db.close().await;
    Ok(())
}

/// Reads `--flag value` style arguments.
fn arg_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}
