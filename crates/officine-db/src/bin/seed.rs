//! # Seed Data Generator
//!
//! Populates the database with a demo pharmacy for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./officine_dev.db for organization "org_demo"
//! cargo run -p officine-db --bin seed
//!
//! # Specify database path and organization
//! cargo run -p officine-db --bin seed -- --db ./data/officine.db --org org_2abc
//! ```
//!
//! ## Generated Data
//! - One pharmacy bound to the given organization
//! - A handful of wholesalers
//! - Products across therapeutic categories, each with two or three lots
//!   spread over the expiry tiers (expired, critical, warning, watch, safe)
//! - Some counter sales consumed FEFO, so a few products end up low on stock
//! - A low-stock replenishment draft when anything is below threshold

use chrono::{Duration, Utc};
use std::env;
use tracing_subscriber::EnvFilter;

use officine_core::expiry::{ExpiryFilters, ExpiryWindow};
use officine_core::{OrderType, Pharmacy};
use officine_db::{
    ConsumeLots, Database, DbConfig, LotSource, NewProduct, ReceiveLot, SaleRef,
};

const SUPPLIERS: &[&str] = &["CERP Rouen", "OCP Répartition", "Alliance Healthcare"];

/// (name, category, purchase price cents, sale price cents, low-stock threshold)
const PRODUCTS: &[(&str, &str, i64, i64, i64)] = &[
    ("Doliprane 1000mg", "antalgique", 150, 290, 20),
    ("Efferalgan 500mg", "antalgique", 140, 260, 15),
    ("Spasfon Lyoc 80mg", "antispasmodique", 310, 520, 8),
    ("Amoxicilline 500mg", "antibiotique", 180, 340, 10),
    ("Augmentin 1g", "antibiotique", 420, 710, 6),
    ("Smecta 3g", "gastro", 260, 450, 10),
    ("Gaviscon Menthe", "gastro", 380, 640, 5),
    ("Ventoline 100µg", "respiratoire", 290, 480, 4),
    ("Toplexil Sirop", "respiratoire", 350, 590, 6),
    ("Biafine Emulsion", "dermatologie", 410, 690, 3),
];

/// Expiry offsets (days from today) cycled across lots so every tier shows up.
const EXPIRY_OFFSETS: &[i64] = &[-12, 5, 21, 48, 75, 240, 400];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./officine_dev.db");
    let mut org_id = String::from("org_demo");
    let mut print_report = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--org" | "-o" => {
                if i + 1 < args.len() {
                    org_id = args[i + 1].clone();
                    i += 1;
                }
            }
            "--report" | "-r" => print_report = true,
            "--help" | "-h" => {
                println!("Officine Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./officine_dev.db)");
                println!("  -o, --org <ID>     Organization id of the pharmacy (default: org_demo)");
                println!("  -r, --report       Print the 90-day expiry report as JSON");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Officine Seed Data Generator");
    println!("==============================");
    println!("Database:     {}", db_path);
    println!("Organization: {}", org_id);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    if let Some(existing) = db.pharmacies().get_by_clerk_org_id(&org_id).await? {
        println!("⚠ Organization {} already has pharmacy {}", org_id, existing.name);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file or pick another --org to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();
    let pharmacy = db
        .pharmacies()
        .create(&org_id, "Pharmacie de la Gare")
        .await?;
    println!("✓ Created pharmacy {}", pharmacy.name);

    let mut supplier_ids = Vec::with_capacity(SUPPLIERS.len());
    for name in SUPPLIERS {
        supplier_ids.push(db.suppliers().create(&pharmacy.id, name).await?.id);
    }
    println!("✓ Created {} suppliers", supplier_ids.len());

    println!();
    println!("Receiving lots...");
    let lots = seed_products(&db, &pharmacy, &supplier_ids).await?;
    println!("✓ Received {} lots for {} products", lots, PRODUCTS.len());

    println!();
    println!("Recording counter sales...");
    let sales = seed_sales(&db, &pharmacy).await?;
    println!("✓ Consumed {} sale lines FEFO", sales);

    let report = db
        .expiry_reports()
        .risk_report(
            &pharmacy.id,
            Utc::now().date_naive(),
            ExpiryWindow::Days90,
            &ExpiryFilters::default(),
        )
        .await?;

    println!();
    println!("Expiry risk (90 days):");
    println!("  Expired:      {}", report.counts.expired);
    println!("  ≤ 30 days:    {}", report.counts.due_in_30_days);
    println!("  31-60 days:   {}", report.counts.due_in_60_days);
    println!("  61-90 days:   {}", report.counts.due_in_90_days);

    let summary = db.replenishment().summary(&pharmacy.id).await?;
    println!();
    println!("Low stock: {} products", summary.count);
    if summary.count > 0 {
        let order_id = db
            .replenishment()
            .create_draft(&pharmacy.id, &supplier_ids[0])
            .await?;
        println!("✓ Created replenishment draft {}", order_id);
    }

    if print_report {
        println!();
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    println!();
    println!("✓ Seed complete in {:?}", start.elapsed());

    Ok(())
}

/// Creates the catalogue and receives its lots. Every other product arrives
/// on a delivery note, the rest as opening stock. Returns the lot count.
async fn seed_products(
    db: &Database,
    pharmacy: &Pharmacy,
    supplier_ids: &[String],
) -> Result<usize, Box<dyn std::error::Error>> {
    let today = Utc::now().date_naive();
    let mut received = 0;

    for (idx, (name, category, purchase, sale, threshold)) in PRODUCTS.iter().enumerate() {
        let product = db
            .products()
            .create(NewProduct {
                pharmacy_id: pharmacy.id.clone(),
                name: name.to_string(),
                category: Some(category.to_string()),
                purchase_price_cents: *purchase,
                sale_price_cents: *sale,
                low_stock_threshold: *threshold,
            })
            .await?;

        let source = if idx % 2 == 0 {
            let supplier_id = &supplier_ids[idx % supplier_ids.len()];
            let order = db
                .procurement()
                .create_order(
                    &pharmacy.id,
                    Some(supplier_id),
                    OrderType::DeliveryNote,
                    Some("Livraison initiale"),
                )
                .await?;
            LotSource::delivery_note(order.id, None)
        } else {
            LotSource::initial_stock()
        };

        for lot_idx in 0..(2 + idx % 2) {
            let offset = EXPIRY_OFFSETS[(idx + lot_idx * 3) % EXPIRY_OFFSETS.len()];
            let quantity = 4 + ((idx * 7 + lot_idx * 5) % 18) as i64;

            let request = ReceiveLot {
                product_id: product.id.clone(),
                lot_number: format!("{}{:02}-{}", &category[..3].to_uppercase(), idx, lot_idx + 1),
                expiry_date: today + Duration::days(offset),
                quantity,
                source: source.clone(),
                reason: None,
            };

            if let Err(e) = db.ledger().receive_lot(&pharmacy.id, None, &request).await {
                eprintln!("Failed to receive {}: {}", request.lot_number, e);
                continue;
            }
            received += 1;
        }
    }

    Ok(received)
}

/// Sells part of every third product so its stock drops under threshold.
async fn seed_sales(db: &Database, pharmacy: &Pharmacy) -> Result<usize, Box<dyn std::error::Error>> {
    let mut lines = 0;

    for (idx, product) in db.products().list(&pharmacy.id).await?.iter().enumerate() {
        if idx % 3 != 0 || product.stock_quantity == 0 {
            continue;
        }

        let request = ConsumeLots {
            product_id: product.id.clone(),
            quantity: (product.stock_quantity - product.low_stock_threshold / 2).clamp(1, product.stock_quantity),
            sale: Some(SaleRef {
                sale_id: format!("seed-sale-{:03}", idx),
                sale_item_id: None,
            }),
            reason: None,
        };

        match db.ledger().consume_fefo(&pharmacy.id, None, &request).await {
            Ok(_) => lines += 1,
            Err(e) => eprintln!("Failed to sell {}: {}", product.name, e),
        }
    }

    Ok(lines)
}
