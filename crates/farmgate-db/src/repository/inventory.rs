//! # Inventory Repository
//!
//! The authoritative stock ledger. Each mutation is a single conditional SQL
//! statement, so two concurrent deductions can never both succeed against
//! the same unit of stock.
//!
//! ## Deduction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  UPDATE products                                                       │
//! │     SET stock = stock - :qty, in_stock = (stock - :qty) > 0            │
//! │   WHERE id = :id AND stock >= :qty                                     │
//! │  RETURNING name, stock, low_stock_threshold                            │
//! │                                                                         │
//! │  row returned ──► deducted, check band crossing for alerts             │
//! │  no row       ──► unknown product or short stock, nothing changed      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Restock
//! ```text
//! stock += qty ──► restock_history row ──► was 0? notify + drop subscriptions
//! ```
//!
//! Alerts are published after the transaction commits and never block the
//! stock change.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::notification::NotificationRepository;
use super::product::ProductRepository;
use crate::error::DbResult;
use farmgate_core::checkout::{normalize_cart, CartLine};
use farmgate_core::validation::validate_restock_quantity;
use farmgate_core::{
    Availability, CoreError, Notification, NotificationLevel, Product, RestockRecord, StockLevel,
    StockShortage, ValidationError,
};

// =============================================================================
// Stock Changes
// =============================================================================

/// Before/after view of one successful deduction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StockChange {
    pub product_id: i64,
    pub name: String,
    pub previous: i64,
    pub current: i64,
    pub threshold: i64,
}

impl StockChange {
    /// Low/out-of-stock alert if this deduction crossed a band.
    pub(crate) fn alert(&self) -> Option<Notification> {
        let notification = match StockLevel::crossed(self.previous, self.current, self.threshold)? {
            StockLevel::Out => Notification::new(
                NotificationLevel::Error,
                "Out of stock",
                format!("{} is out of stock", self.name),
            ),
            StockLevel::Low => Notification::new(
                NotificationLevel::Warning,
                "Low stock",
                format!(
                    "{} is running low: {} left (threshold {})",
                    self.name, self.current, self.threshold
                ),
            ),
            StockLevel::Healthy => return None,
        };
        Some(notification.for_product(self.product_id))
    }
}

pub(crate) fn stock_alerts(changes: &[StockChange]) -> Vec<Notification> {
    changes.iter().filter_map(StockChange::alert).collect()
}

/// Conditionally deducts every line on `conn`.
///
/// Lines that cannot be filled are skipped and reported; the caller must
/// roll back when any shortage is returned.
pub(crate) async fn deduct_lines(
    conn: &mut SqliteConnection,
    lines: &[CartLine],
    now: DateTime<Utc>,
) -> DbResult<Result<Vec<StockChange>, Vec<StockShortage>>> {
    let mut changes = Vec::with_capacity(lines.len());
    let mut shortages = Vec::new();

    for line in lines {
        let updated: Option<(String, i64, i64)> = sqlx::query_as(
            r#"
            UPDATE products
            SET stock = stock - ?2,
                in_stock = (stock - ?2) > 0,
                updated_at = ?3
            WHERE id = ?1 AND stock >= ?2
            RETURNING name, stock, low_stock_threshold
            "#,
        )
        .bind(line.product_id)
        .bind(line.quantity)
        .bind(now)
        .fetch_optional(&mut *conn)
        .await?;

        match updated {
            Some((name, current, threshold)) => changes.push(StockChange {
                product_id: line.product_id,
                name,
                previous: current + line.quantity,
                current,
                threshold,
            }),
            None => {
                let existing: Option<(String, i64)> =
                    sqlx::query_as("SELECT name, stock FROM products WHERE id = ?1")
                        .bind(line.product_id)
                        .fetch_optional(&mut *conn)
                        .await?;
                let (name, available) =
                    existing.unwrap_or_else(|| (format!("Product #{}", line.product_id), 0));
                shortages.push(StockShortage {
                    product_id: line.product_id,
                    name,
                    available,
                    requested: line.quantity,
                });
            }
        }
    }

    if shortages.is_empty() {
        Ok(Ok(changes))
    } else {
        Ok(Err(shortages))
    }
}

// =============================================================================
// Records
// =============================================================================

#[derive(Debug, Clone, sqlx::FromRow)]
struct RestockRow {
    id: String,
    product_id: i64,
    quantity: i64,
    previous_stock: i64,
    new_stock: i64,
    actor_id: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<RestockRow> for RestockRecord {
    fn from(r: RestockRow) -> Self {
        RestockRecord {
            id: r.id,
            product_id: r.product_id,
            quantity: r.quantity,
            previous_stock: r.previous_stock,
            new_stock: r.new_stock,
            actor_id: r.actor_id,
            notes: r.notes,
            created_at: r.created_at,
        }
    }
}

/// What a restock did.
#[derive(Debug, Clone)]
pub struct RestockResult {
    pub record: RestockRecord,
    /// Subscribers told the product is back in stock.
    pub notified_subscribers: usize,
}

// =============================================================================
// Repository
// =============================================================================

#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    fn notifications(&self) -> NotificationRepository {
        NotificationRepository::new(self.pool.clone())
    }

    /// Whether `quantity` units are on hand. Unknown products report
    /// `{available: false, current_stock: 0}`. Never mutates.
    pub async fn check_availability(&self, product_id: i64, quantity: i64) -> DbResult<Availability> {
        let stock: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(match stock {
            Some(stock) => Availability {
                available: quantity > 0 && stock >= quantity,
                current_stock: stock,
            },
            None => Availability::unknown(),
        })
    }

    /// Removes `quantity` units if that many are on hand.
    ///
    /// Returns `false` without changing anything for unknown products,
    /// non-positive quantities or short stock.
    pub async fn deduct(&self, product_id: i64, quantity: i64) -> DbResult<bool> {
        if quantity <= 0 {
            warn!(product_id, quantity, "Rejected non-positive deduction");
            return Ok(false);
        }

        let mut conn = self.pool.acquire().await?;
        let outcome = deduct_lines(&mut *conn, &[CartLine::new(product_id, quantity)], Utc::now()).await?;
        drop(conn);

        match outcome {
            Ok(changes) => {
                debug!(product_id, quantity, "Stock deducted");
                self.notifications().publish_all(&stock_alerts(&changes)).await;
                Ok(true)
            }
            Err(_) => {
                debug!(product_id, quantity, "Deduction refused");
                Ok(false)
            }
        }
    }

    /// Deducts every line in one transaction. If any line cannot be filled
    /// nothing is deducted and the failing lines are reported.
    pub async fn deduct_all(&self, lines: &[CartLine]) -> DbResult<()> {
        let lines = normalize_cart(lines)?;

        let mut tx = self.pool.begin().await?;
        match deduct_lines(&mut *tx, &lines, Utc::now()).await? {
            Ok(changes) => {
                tx.commit().await?;
                self.notifications().publish_all(&stock_alerts(&changes)).await;
                Ok(())
            }
            Err(shortages) => {
                tx.rollback().await?;
                warn!(lines = shortages.len(), "Batch deduction rolled back");
                Err(CoreError::InsufficientStock { shortages }.into())
            }
        }
    }

    /// Adds `quantity` units and records the change.
    ///
    /// ## Returns
    /// * `Ok(Some(RestockResult))` - stock increased, history appended
    /// * `Ok(None)` - unknown product, nothing changed
    /// * `Err(DbError::Core(Validation))` - quantity not positive, above the
    ///   restock cap, or the new stock would not fit
    pub async fn restock(
        &self,
        product_id: i64,
        quantity: i64,
        actor_id: &str,
        notes: Option<&str>,
    ) -> DbResult<Option<RestockResult>> {
        validate_restock_quantity(quantity)?;
        let notes = notes.map(str::trim).filter(|n| !n.is_empty());
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        let updated: Option<(String, i64)> = sqlx::query_as(
            r#"
            UPDATE products
            SET stock = stock + ?2,
                in_stock = 1,
                last_restocked = ?3,
                updated_at = ?3
            WHERE id = ?1 AND stock <= ?4
            RETURNING name, stock
            "#,
        )
        .bind(product_id)
        .bind(quantity)
        .bind(now)
        .bind(i64::MAX - quantity)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((name, new_stock)) = updated else {
            let existing: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
                .bind(product_id)
                .fetch_optional(&mut *tx)
                .await?;
            return match existing {
                Some(stock) => Err(CoreError::Validation(ValidationError::OutOfRange {
                    field: "quantity".to_string(),
                    min: 1,
                    max: i64::MAX - stock,
                })
                .into()),
                None => {
                    debug!(product_id, "Restock of unknown product");
                    Ok(None)
                }
            };
        };
        let previous_stock = new_stock - quantity;

        let record = RestockRecord {
            id: Uuid::new_v4().to_string(),
            product_id,
            quantity,
            previous_stock,
            new_stock,
            actor_id: actor_id.to_string(),
            notes: notes.map(str::to_string),
            created_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO restock_history (
                id, product_id, quantity, previous_stock, new_stock, actor_id, notes, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&record.id)
        .bind(record.product_id)
        .bind(record.quantity)
        .bind(record.previous_stock)
        .bind(record.new_stock)
        .bind(&record.actor_id)
        .bind(&record.notes)
        .bind(record.created_at)
        .execute(&mut *tx)
        .await?;

        // 0 → positive: everyone waiting is told once
        let subscribers: Vec<(String, String)> = if previous_stock == 0 {
            let subscribers = sqlx::query_as(
                "SELECT user_id, email FROM stock_subscriptions WHERE product_id = ?1 ORDER BY created_at",
            )
            .bind(product_id)
            .fetch_all(&mut *tx)
            .await?;

            sqlx::query("DELETE FROM stock_subscriptions WHERE product_id = ?1")
                .bind(product_id)
                .execute(&mut *tx)
                .await?;

            subscribers
        } else {
            Vec::new()
        };

        tx.commit().await?;

        info!(
            product_id,
            quantity,
            previous_stock,
            new_stock,
            actor_id = %actor_id,
            "Product restocked"
        );

        let mut notifications = vec![Notification::new(
            NotificationLevel::Info,
            "Restocked",
            format!("{name} restocked: {previous_stock} → {new_stock}"),
        )
        .for_product(product_id)];
        notifications.extend(subscribers.iter().map(|(user_id, email)| {
            Notification::new(
                NotificationLevel::Success,
                "Back in stock",
                format!("{name} is back in stock ({new_stock} available); notifying {email}"),
            )
            .for_product(product_id)
            .for_user(user_id.as_str())
        }));
        self.notifications().publish_all(&notifications).await;

        Ok(Some(RestockResult {
            record,
            notified_subscribers: subscribers.len(),
        }))
    }

    /// Registers a back-in-stock request. Idempotent: returns `false` if the
    /// user was already subscribed.
    pub async fn subscribe(&self, product_id: i64, user_id: &str, email: &str) -> DbResult<bool> {
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM products WHERE id = ?1")
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(CoreError::ProductNotFound(product_id).into());
        }

        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO stock_subscriptions (product_id, user_id, email, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(product_id)
        .bind(user_id)
        .bind(email)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Number of users waiting on a product.
    pub async fn subscriber_count(&self, product_id: i64) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM stock_subscriptions WHERE product_id = ?1")
                .bind(product_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// Products at or below their low-stock threshold, emptiest first.
    pub async fn low_stock(&self) -> DbResult<Vec<Product>> {
        let ids: Vec<i64> = sqlx::query_scalar(
            "SELECT id FROM products WHERE stock <= low_stock_threshold ORDER BY stock, id",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut found = ProductRepository::new(self.pool.clone()).get_many(&ids).await?;
        Ok(ids.iter().filter_map(|id| found.remove(id)).collect())
    }

    /// Restock history for a product, newest first.
    pub async fn restock_history(&self, product_id: i64) -> DbResult<Vec<RestockRecord>> {
        let rows: Vec<RestockRow> = sqlx::query_as(
            r#"
            SELECT id, product_id, quantity, previous_stock, new_stock, actor_id, notes, created_at
            FROM restock_history
            WHERE product_id = ?1
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(RestockRecord::from).collect())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
