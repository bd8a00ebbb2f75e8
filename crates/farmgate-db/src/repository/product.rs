//! # Product Repository
//!
//! Catalog reads and product writes. Stock counters are only changed through
//! the [`InventoryRepository`](super::inventory::InventoryRepository); this
//! repository sets the opening stock when a product is created.
//!
//! ## Tier Loading
//! ```text
//! products ──┐
//!            ├──► Product { ..., bulk_tiers: [..] }   (tiers ascending)
//! bulk_price_tiers (ORDER BY min_quantity)
//! ```

use std::collections::HashMap;

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use super::{ProductRecord, TierRecord, PRODUCT_COLUMNS};
use crate::error::DbResult;
use farmgate_core::validation::{validate_bulk_tiers, validate_price, validate_product_name};
use farmgate_core::{BulkTier, Product};

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists the catalog, optionally filtered by category, ordered by id.
    pub async fn list(&self, category: Option<&str>) -> DbResult<Vec<Product>> {
        let category = category.map(str::trim).filter(|c| !c.is_empty());
        debug!(category = ?category, "Listing products");

        let records: Vec<ProductRecord> = match category {
            Some(category) => {
                sqlx::query_as(&format!(
                    "SELECT {PRODUCT_COLUMNS} FROM products WHERE category = ?1 ORDER BY id"
                ))
                .bind(category)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(&format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id"))
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        let ids: Vec<i64> = records.iter().map(|r| r.id).collect();
        let mut tiers = self.tiers_for(&ids).await?;

        Ok(records
            .into_iter()
            .map(|record| {
                let product_tiers = tiers.remove(&record.id).unwrap_or_default();
                record.into_product(product_tiers)
            })
            .collect())
    }

    /// Gets a product by id.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Product>> {
        let record: Option<ProductRecord> =
            sqlx::query_as(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        match record {
            Some(record) => {
                let tiers = self.tiers_for(&[id]).await?.remove(&id).unwrap_or_default();
                Ok(Some(record.into_product(tiers)))
            }
            None => Ok(None),
        }
    }

    /// Loads several products at once, keyed by id. Missing ids are absent
    /// from the map.
    pub async fn get_many(&self, ids: &[i64]) -> DbResult<HashMap<i64, Product>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id IN ("));
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let records: Vec<ProductRecord> = builder.build_query_as().fetch_all(&self.pool).await?;
        let mut tiers = self.tiers_for(ids).await?;

        Ok(records
            .into_iter()
            .map(|record| {
                let product_tiers = tiers.remove(&record.id).unwrap_or_default();
                (record.id, record.into_product(product_tiers))
            })
            .collect())
    }

    /// Bulk tiers for the given products, ascending by `min_quantity`.
    async fn tiers_for(&self, ids: &[i64]) -> DbResult<HashMap<i64, Vec<BulkTier>>> {
        let mut grouped: HashMap<i64, Vec<BulkTier>> = HashMap::new();
        if ids.is_empty() {
            return Ok(grouped);
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT product_id, min_quantity, price_per_unit FROM bulk_price_tiers WHERE product_id IN (",
        );
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY product_id, min_quantity");

        let records: Vec<TierRecord> = builder.build_query_as().fetch_all(&self.pool).await?;
        for record in records {
            grouped
                .entry(record.product_id)
                .or_default()
                .push(record.into());
        }

        Ok(grouped)
    }

    /// Inserts a product and its tiers.
    ///
    /// ## Returns
    /// * `Err(DbError::Core(Validation))` - bad name, price or tiers
    /// * `Err(DbError::UniqueViolation)` - id already taken
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        validate_product_name(&product.name)?;
        validate_price(product.base_price)?;
        validate_bulk_tiers(&product.bulk_tiers)?;

        debug!(id = product.id, name = %product.name, "Inserting product");

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, description, base_price, unit, category,
                stock, in_stock, low_stock_threshold, last_restocked,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
            "#,
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.base_price)
        .bind(&product.unit)
        .bind(&product.category)
        .bind(product.stock)
        .bind(product.stock > 0)
        .bind(product.low_stock_threshold)
        .bind(product.last_restocked)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        for tier in &product.bulk_tiers {
            sqlx::query(
                "INSERT INTO bulk_price_tiers (product_id, min_quantity, price_per_unit) VALUES (?1, ?2, ?3)",
            )
            .bind(product.id)
            .bind(tier.min_quantity)
            .bind(tier.price_per_unit)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        let mut stored = product.clone();
        stored.in_stock = product.stock > 0;
        stored.created_at = now;
        stored.updated_at = now;
        Ok(stored)
    }

    /// Distinct categories, alphabetical.
    pub async fn categories(&self) -> DbResult<Vec<String>> {
        let categories: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT category FROM products ORDER BY category")
                .fetch_all(&self.pool)
                .await?;
        Ok(categories)
    }

    /// Counts products (for seeding and diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::{Database, DbConfig};
    use farmgate_core::CoreError;

    async fn seeded() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.seed_catalog().await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_list_loads_tiers_in_order() {
        let db = seeded().await;
        let products = db.products().list(None).await.unwrap();
        assert_eq!(products.len(), crate::catalog::seed_products().len());

        let rice = products.iter().find(|p| p.id == 1).unwrap();
        assert_eq!(
            rice.bulk_tiers,
            vec![BulkTier::new(10, 6500), BulkTier::new(50, 6000)]
        );
        assert_eq!(rice.base_price, 7500);
    }

    #[tokio::test]
    async fn test_list_by_category() {
        let db = seeded().await;
        let legumes = db.products().list(Some("legumes")).await.unwrap();
        assert!(!legumes.is_empty());
        assert!(legumes.iter().all(|p| p.category == "legumes"));
    }

    #[tokio::test]
    async fn test_get_by_id_and_missing() {
        let db = seeded().await;
        let groundnuts = db.products().get_by_id(10).await.unwrap().unwrap();
        assert_eq!(groundnuts.stock, 0);
        assert!(!groundnuts.in_stock);

        assert!(db.products().get_by_id(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_many_skips_unknown() {
        let db = seeded().await;
        let found = db.products().get_many(&[1, 4, 999]).await.unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.contains_key(&1));
        assert_eq!(found[&4].bulk_tiers.len(), 2);
    }

    #[tokio::test]
    async fn test_insert_rejects_unsorted_tiers() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut product = Product::new(50, "Sorghum (50kg)", 30000, 10);
        product.bulk_tiers = vec![BulkTier::new(20, 28000), BulkTier::new(5, 29000)];

        let err = db.products().insert(&product).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::Validation(_))));
        assert_eq!(db.products().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_id() {
        let db = seeded().await;
        let err = db
            .products()
            .insert(&Product::new(1, "Duplicate", 100, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }
}
