//! # Catalog Seeder
//!
//! Creates (or migrates) a database file and loads the starting catalog.
//!
//! ## Usage
//! ```bash
//! # Seed ./data/farmgate.db
//! cargo run -p farmgate-db --bin seed
//!
//! # Specify database path
//! cargo run -p farmgate-db --bin seed -- --db ./data/dev.db
//! ```
//!
//! Seeding is skipped when the products table already has rows, so running
//! it twice is harmless.

use std::env;

use farmgate_db::{Database, DbConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from("./data/farmgate.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Farmgate Catalog Seeder");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./data/farmgate.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            other => {
                eprintln!("Ignoring unknown argument: {other}");
            }
        }
        i += 1;
    }

    println!("🌱 Farmgate Catalog Seeder");
    println!("==========================");
    println!("Database: {db_path}");
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let inserted = db.seed_catalog().await?;
    if inserted == 0 {
        let existing = db.products().count().await?;
        let accounts = db.users().count().await?;
        println!("⚠ Database already has {existing} products and {accounts} accounts; skipping seed.");
        println!("  Delete the database file to start over.");
    } else {
        println!("✓ Inserted {inserted} products");
    }

    println!();
    for category in db.products().categories().await? {
        let products = db.products().list(Some(&category)).await?;
        println!("  {category:<12} {} products", products.len());
    }

    let low = db.inventory().low_stock().await?;
    if !low.is_empty() {
        println!();
        println!("Low or out of stock:");
        for product in low {
            let marker = match product.stock_level() {
                farmgate_core::StockLevel::Out => "⛔",
                _ => "⚠️ ",
            };
            println!(
                "  {marker} #{:<3} {:<32} {} left",
                product.id, product.name, product.stock
            );
        }
    }

    db.close().await;
    Ok(())
}
