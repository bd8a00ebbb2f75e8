//! # Repository Module
//!
//! Database repository implementations for Farmgate.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  axum handler                                                          │
//! │       │                                                                 │
//! │       │  db.inventory().restock(4, 20, "admin-1", None)                │
//! │       ▼                                                                 │
//! │  InventoryRepository                                                   │
//! │  ├── check_availability(&self, id, qty)                                │
//! │  ├── deduct(&self, id, qty)                                            │
//! │  ├── deduct_all(&self, lines)                                          │
//! │  └── restock(&self, id, qty, actor, notes)                             │
//! │       │                                                                 │
//! │       │  SQL (runtime-checked, conditional updates)                    │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Catalog reads and product writes
//! - [`InventoryRepository`](inventory::InventoryRepository) - Stock ledger
//! - [`UserRepository`](user::UserRepository) - Accounts and refresh tokens
//! - [`ApplicationRepository`](application::ApplicationRepository) - Wholesale/distributor workflow
//! - [`OrderRepository`](order::OrderRepository) - Checkout settlement and order history
//! - [`NotificationRepository`](notification::NotificationRepository) - Alert feed

pub mod application;
pub mod inventory;
pub mod notification;
pub mod order;
pub mod product;
pub mod user;

use chrono::{DateTime, Utc};
use farmgate_core::{BulkTier, Product};

/// Row shape of `products`, without tiers.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct ProductRecord {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub base_price: i64,
    pub unit: String,
    pub category: String,
    pub stock: i64,
    pub in_stock: bool,
    pub low_stock_threshold: i64,
    pub last_restocked: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductRecord {
    pub(crate) fn into_product(self, bulk_tiers: Vec<BulkTier>) -> Product {
        Product {
            id: self.id,
            name: self.name,
            description: self.description,
            base_price: self.base_price,
            unit: self.unit,
            category: self.category,
            stock: self.stock,
            in_stock: self.in_stock,
            low_stock_threshold: self.low_stock_threshold,
            last_restocked: self.last_restocked,
            bulk_tiers,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

pub(crate) const PRODUCT_COLUMNS: &str = "id, name, description, base_price, unit, category, \
     stock, in_stock, low_stock_threshold, last_restocked, created_at, updated_at";

#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub(crate) struct TierRecord {
    pub product_id: i64,
    pub min_quantity: i64,
    pub price_per_unit: i64,
}

impl From<TierRecord> for BulkTier {
    fn from(record: TierRecord) -> Self {
        BulkTier::new(record.min_quantity, record.price_per_unit)
    }
}
