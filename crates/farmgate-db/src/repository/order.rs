//! # Order Repository
//!
//! Checkout settlement and order history.
//!
//! ## Checkout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. normalise cart, validate address                  (no writes)      │
//! │  2. load buyer ──► classification from the store, never the client     │
//! │  3. load products ──► checkout::plan_checkout ──► priced lines, totals │
//! │  4. BEGIN                                                               │
//! │       conditional deduct per line ──► any short? ROLLBACK, itemise     │
//! │       INSERT orders + order_lines                                      │
//! │     COMMIT                                                              │
//! │  5. publish stock alerts and the new-order notice                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Either every line is deducted and the order exists, or nothing changed.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::inventory::{deduct_lines, stock_alerts};
use super::notification::NotificationRepository;
use super::product::ProductRepository;
use super::user::UserRepository;
use crate::error::{DbError, DbResult};
use farmgate_core::checkout::{
    normalize_cart, plan_checkout, validate_shipping_address, CartLine, CheckoutPolicy,
};
use farmgate_core::order::{
    advance_timeline, ensure_can_manage_orders, generate_order_number, initial_timeline,
};
use farmgate_core::{
    Actor, CoreError, Notification, NotificationLevel, Order, OrderLine, OrderStatus,
    PaymentMethod, ShippingAddress, TimelineEvent,
};

/// Order ids bound per line query, well under SQLite's variable limit.
const LINE_QUERY_BATCH: usize = 500;

/// Attempts at drawing an unused order number.
const ORDER_NUMBER_ATTEMPTS: usize = 5;

const ORDER_COLUMNS: &str = "id, order_number, status, subtotal, shipping, tax, total, buyer_id, \
     buyer_email, shipping_address, payment_method, timeline, created_at, updated_at";

// =============================================================================
// Records
// =============================================================================

#[derive(Debug, Clone, sqlx::FromRow)]
struct OrderRecord {
    id: String,
    order_number: String,
    status: OrderStatus,
    subtotal: i64,
    shipping: i64,
    tax: i64,
    total: i64,
    buyer_id: String,
    buyer_email: String,
    shipping_address: String,
    payment_method: PaymentMethod,
    timeline: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRecord {
    fn into_order(self, lines: Vec<OrderLine>) -> DbResult<Order> {
        let shipping_address: ShippingAddress = serde_json::from_str(&self.shipping_address)?;
        let timeline: Vec<TimelineEvent> = serde_json::from_str(&self.timeline)?;

        Ok(Order {
            id: self.id,
            order_number: self.order_number,
            status: self.status,
            lines,
            subtotal: self.subtotal,
            shipping: self.shipping,
            tax: self.tax,
            total: self.total,
            buyer_id: self.buyer_id,
            buyer_email: self.buyer_email,
            shipping_address,
            payment_method: self.payment_method,
            timeline,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct LineRecord {
    order_id: String,
    product_id: i64,
    name: String,
    unit_price: i64,
    quantity: i64,
    unit: String,
    category: String,
    line_total: i64,
}

impl From<LineRecord> for OrderLine {
    fn from(r: LineRecord) -> Self {
        OrderLine {
            product_id: r.product_id,
            name: r.name,
            unit_price: r.unit_price,
            quantity: r.quantity,
            unit: r.unit,
            category: r.category,
            line_total: r.line_total,
        }
    }
}

/// A buyer's checkout submission. Only product ids and quantities come from
/// the client; prices and classification are resolved server-side.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub buyer_id: String,
    pub cart: Vec<CartLine>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
}

// =============================================================================
// Repository
// =============================================================================

#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    fn notifications(&self) -> NotificationRepository {
        NotificationRepository::new(self.pool.clone())
    }

    /// Converts a cart into an order, atomically deducting stock.
    ///
    /// ## Returns
    /// * `Ok(Order)` - stock deducted, order stored with status `pending`
    /// * `Err(Core(EmptyCart | CartTooLarge | Validation))` - bad input
    /// * `Err(Core(UserNotFound))` - unknown buyer
    /// * `Err(Core(InsufficientStock))` - itemised shortages, nothing changed
    pub async fn checkout(&self, request: CheckoutRequest, policy: &CheckoutPolicy) -> DbResult<Order> {
        let cart = normalize_cart(&request.cart)?;
        let shipping_address = validate_shipping_address(&request.shipping_address)?;

        let buyer = UserRepository::new(self.pool.clone())
            .get_by_id(&request.buyer_id)
            .await?
            .ok_or_else(|| CoreError::UserNotFound(request.buyer_id.clone()))?
            .as_buyer();

        let ids: Vec<i64> = cart.iter().map(|line| line.product_id).collect();
        let products = ProductRepository::new(self.pool.clone()).get_many(&ids).await?;
        let plan = plan_checkout(&cart, &products, buyer.classification, policy)?;

        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4().to_string(),
            order_number: String::new(),
            status: OrderStatus::Pending,
            subtotal: plan.totals.subtotal.naira(),
            shipping: plan.totals.shipping.naira(),
            tax: plan.totals.tax.naira(),
            total: plan.totals.total.naira(),
            lines: plan.lines,
            buyer_id: buyer.id.clone(),
            buyer_email: buyer.email.clone(),
            shipping_address,
            payment_method: request.payment_method,
            timeline: initial_timeline(now),
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.pool.begin().await?;

        let changes = match deduct_lines(&mut *tx, &cart, now).await? {
            Ok(changes) => changes,
            Err(shortages) => {
                tx.rollback().await?;
                warn!(buyer_id = %buyer.id, lines = shortages.len(), "Checkout lost a stock race");
                return Err(CoreError::InsufficientStock { shortages }.into());
            }
        };

        let order = insert_order(&mut *tx, order).await?;
        tx.commit().await?;

        info!(
            order_id = %order.id,
            order_number = %order.order_number,
            buyer_id = %order.buyer_id,
            classification = buyer.classification.as_str(),
            lines = order.lines.len(),
            total = order.total,
            "Order placed"
        );

        let mut notifications = stock_alerts(&changes);
        notifications.push(Notification::new(
            NotificationLevel::Info,
            "New order",
            format!(
                "Order {} placed by {} for ₦{}",
                order.order_number, order.buyer_email, order.total
            ),
        ));
        self.notifications().publish_all(&notifications).await;

        Ok(order)
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Order>> {
        let record: Option<OrderRecord> =
            sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        match record {
            Some(record) => {
                let lines = self.lines_for(&[record.id.clone()]).await?.remove(&record.id);
                Ok(Some(record.into_order(lines.unwrap_or_default())?))
            }
            None => Ok(None),
        }
    }

    /// A page of a buyer's orders, newest first.
    pub async fn list_for_buyer(&self, buyer_id: &str, limit: i64, offset: i64) -> DbResult<Vec<Order>> {
        let records: Vec<OrderRecord> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE buyer_id = ?1 \
             ORDER BY created_at DESC, rowid DESC LIMIT ?2 OFFSET ?3"
        ))
        .bind(buyer_id)
        .bind(limit)
        .bind(offset.max(0))
        .fetch_all(&self.pool)
        .await?;

        self.with_lines(records).await
    }

    /// A page of all orders, newest first, optionally filtered by status.
    pub async fn list_all(
        &self,
        status: Option<OrderStatus>,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<Order>> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {ORDER_COLUMNS} FROM orders"));
        if let Some(status) = status {
            builder.push(" WHERE status = ").push_bind(status);
        }
        builder
            .push(" ORDER BY created_at DESC, rowid DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset.max(0));

        let records: Vec<OrderRecord> = builder.build_query_as().fetch_all(&self.pool).await?;
        self.with_lines(records).await
    }

    /// Moves an order to `next` and updates its timeline.
    ///
    /// The update is guarded on the status that was read, so two admins
    /// racing on one order cannot both apply a transition.
    pub async fn advance_status(&self, id: &str, next: OrderStatus, actor: &Actor) -> DbResult<Order> {
        ensure_can_manage_orders(actor)?;

        let mut order = self
            .get(id)
            .await?
            .ok_or_else(|| CoreError::OrderNotFound(id.to_string()))?;

        let now = Utc::now();
        let timeline = advance_timeline(&order.timeline, order.status, next, now)?;
        let timeline_json = serde_json::to_string(&timeline)?;

        let result = sqlx::query(
            "UPDATE orders SET status = ?3, timeline = ?4, updated_at = ?5 WHERE id = ?1 AND status = ?2",
        )
        .bind(id)
        .bind(order.status)
        .bind(next)
        .bind(&timeline_json)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let current = self
                .get(id)
                .await?
                .map(|o| o.status)
                .ok_or_else(|| CoreError::OrderNotFound(id.to_string()))?;
            return Err(CoreError::InvalidTransition {
                from: current,
                to: next,
            }
            .into());
        }

        info!(
            order_id = %id,
            from = order.status.as_str(),
            to = next.as_str(),
            actor = %actor.id,
            "Order status changed"
        );

        order.status = next;
        order.timeline = timeline;
        order.updated_at = now;

        let level = match next {
            OrderStatus::Cancelled => NotificationLevel::Warning,
            OrderStatus::Delivered => NotificationLevel::Success,
            _ => NotificationLevel::Info,
        };
        self.notifications()
            .publish(
                &Notification::new(
                    level,
                    format!("Order {}", next.stage_title().to_lowercase()),
                    format!("Order {} is now {}", order.order_number, next.as_str()),
                )
                .for_user(order.buyer_id.as_str()),
            )
            .await;

        Ok(order)
    }

    async fn with_lines(&self, records: Vec<OrderRecord>) -> DbResult<Vec<Order>> {
        let ids: Vec<String> = records.iter().map(|r| r.id.clone()).collect();
        let mut lines = self.lines_for(&ids).await?;

        records
            .into_iter()
            .map(|record| {
                let order_lines = lines.remove(&record.id).unwrap_or_default();
                record.into_order(order_lines)
            })
            .collect()
    }

    async fn lines_for(&self, order_ids: &[String]) -> DbResult<HashMap<String, Vec<OrderLine>>> {
        let mut grouped: HashMap<String, Vec<OrderLine>> = HashMap::new();
        if order_ids.is_empty() {
            return Ok(grouped);
        }

        for batch in order_ids.chunks(LINE_QUERY_BATCH) {
            let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
                "SELECT order_id, product_id, name, unit_price, quantity, unit, category, line_total \
                 FROM order_lines WHERE order_id IN (",
            );
            let mut separated = builder.separated(", ");
            for id in batch {
                separated.push_bind(id.as_str());
            }
            separated.push_unseparated(") ORDER BY order_id, line_no");

            let records: Vec<LineRecord> = builder.build_query_as().fetch_all(&self.pool).await?;
            for record in records {
                grouped
                    .entry(record.order_id.clone())
                    .or_default()
                    .push(record.into());
            }
        }

        Ok(grouped)
    }
}

/// Inserts the order header and lines, drawing a fresh order number on
/// collision.
async fn insert_order(conn: &mut SqliteConnection, mut order: Order) -> DbResult<Order> {
    let shipping_address = serde_json::to_string(&order.shipping_address)?;
    let timeline = serde_json::to_string(&order.timeline)?;

    let mut attempt = 0;
    loop {
        attempt += 1;
        order.order_number = generate_order_number(order.created_at, Uuid::new_v4().as_u128() as u32);

        let inserted = sqlx::query(&format!(
            "INSERT INTO orders ({ORDER_COLUMNS}) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)"
        ))
        .bind(&order.id)
        .bind(&order.order_number)
        .bind(order.status)
        .bind(order.subtotal)
        .bind(order.shipping)
        .bind(order.tax)
        .bind(order.total)
        .bind(&order.buyer_id)
        .bind(&order.buyer_email)
        .bind(&shipping_address)
        .bind(order.payment_method)
        .bind(&timeline)
        .bind(order.created_at)
        .execute(&mut *conn)
        .await;

        match inserted {
            Ok(_) => break,
            Err(e) => {
                let err = DbError::from(e);
                if err.is_unique_violation_on("orders.order_number") && attempt < ORDER_NUMBER_ATTEMPTS {
                    debug!(order_number = %order.order_number, "Order number taken, redrawing");
                    continue;
                }
                return Err(err);
            }
        }
    }

    for (line_no, line) in order.lines.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO order_lines (
                order_id, line_no, product_id, name, unit_price, quantity, unit, category, line_total
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&order.id)
        .bind(line_no as i64)
        .bind(line.product_id)
        .bind(&line.name)
        .bind(line.unit_price)
        .bind(line.quantity)
        .bind(&line.unit)
        .bind(&line.category)
        .bind(line.line_total)
        .execute(&mut *conn)
        .await?;
    }

    Ok(order)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::user::NewUser;
    use crate::{Database, DbConfig};
    use farmgate_core::{BulkTier, Product, Role, User};

    fn address() -> ShippingAddress {
        ShippingAddress {
            full_name: "Ada Obi".to_string(),
            phone: "08035550101".to_string(),
            street: "12 Allen Avenue".to_string(),
            city: "Ikeja".to_string(),
            state: "Lagos".to_string(),
            postal_code: None,
        }
    }

    async fn setup(products: &[Product]) -> (Database, User) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        for product in products {
            db.products().insert(product).await.unwrap();
        }
        let user = db
            .users()
            .create(NewUser {
                email: "ada@farmgate.ng".to_string(),
                name: "Ada Obi".to_string(),
                phone: None,
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap();
        (db, user)
    }

    fn request(buyer: &User, cart: Vec<CartLine>) -> CheckoutRequest {
        CheckoutRequest {
            buyer_id: buyer.id.clone(),
            cart,
            shipping_address: address(),
            payment_method: PaymentMethod::PayOnDelivery,
        }
    }

    fn product(id: i64, price: i64, stock: i64) -> Product {
        let mut p = Product::new(id, format!("Product {id}"), price, stock);
        p.low_stock_threshold = 3;
        p
    }

    async fn stock_of(db: &Database, id: i64) -> i64 {
        db.products().get_by_id(id).await.unwrap().unwrap().stock
    }

    #[tokio::test]
    async fn test_checkout_deducts_and_totals() {
        let (db, buyer) = setup(&[product(1, 1000, 5)]).await;

        let order = db
            .orders()
            .checkout(request(&buyer, vec![CartLine::new(1, 3)]), &CheckoutPolicy::default())
            .await
            .unwrap();

        assert_eq!(stock_of(&db, 1).await, 2);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.subtotal, 3000);
        assert_eq!(order.shipping, 2500);
        assert_eq!(order.tax, 225);
        assert_eq!(order.total, 5725);
        assert!(order.order_number.starts_with("FG-"));

        let stored = db.orders().get(&order.id).await.unwrap().unwrap();
        assert_eq!(stored.lines.len(), 1);
        assert_eq!(stored.lines[0].line_total, 3000);
        assert_eq!(stored.shipping_address.city, "Ikeja");
        assert_eq!(stored.timeline.len(), 4);
        assert!(stored.timeline[0].completed);
    }

    #[tokio::test]
    async fn test_checkout_short_stock_changes_nothing() {
        let (db, buyer) = setup(&[product(1, 1000, 2)]).await;

        let err = db
            .orders()
            .checkout(request(&buyer, vec![CartLine::new(1, 3)]), &CheckoutPolicy::default())
            .await
            .unwrap_err();

        match err {
            DbError::Core(CoreError::InsufficientStock { shortages }) => {
                assert_eq!(shortages.len(), 1);
                assert_eq!(shortages[0].available, 2);
                assert_eq!(shortages[0].requested, 3);
            }
            other => panic!("expected shortage, got {other:?}"),
        }
        assert_eq!(stock_of(&db, 1).await, 2);
        assert!(db.orders().list_all(None, 50, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_multi_line_shortage_is_all_or_nothing() {
        let (db, buyer) = setup(&[product(1, 1000, 10), product(2, 500, 1)]).await;

        let err = db
            .orders()
            .checkout(
                request(&buyer, vec![CartLine::new(1, 4), CartLine::new(2, 2), CartLine::new(99, 1)]),
                &CheckoutPolicy::default(),
            )
            .await
            .unwrap_err();

        let DbError::Core(CoreError::InsufficientStock { shortages }) = err else {
            panic!("expected shortage");
        };
        let ids: Vec<i64> = shortages.iter().map(|s| s.product_id).collect();
        assert_eq!(ids, vec![2, 99]);
        assert_eq!(shortages[1].name, "Product #99");
        assert_eq!(shortages[1].available, 0);

        assert_eq!(stock_of(&db, 1).await, 10);
        assert_eq!(stock_of(&db, 2).await, 1);
    }

    #[tokio::test]
    async fn test_wholesale_buyer_gets_tier_price() {
        let mut rice = product(1, 7500, 100);
        rice.bulk_tiers = vec![BulkTier::new(10, 6500), BulkTier::new(50, 6000)];
        let (db, buyer) = setup(&[rice]).await;

        let retail = db
            .orders()
            .checkout(request(&buyer, vec![CartLine::new(1, 10)]), &CheckoutPolicy::default())
            .await
            .unwrap();
        assert_eq!(retail.lines[0].unit_price, 7500);

        sqlx::query("UPDATE users SET classification = 'wholesale_verified' WHERE id = ?1")
            .bind(&buyer.id)
            .execute(db.pool())
            .await
            .unwrap();

        let wholesale = db
            .orders()
            .checkout(request(&buyer, vec![CartLine::new(1, 10)]), &CheckoutPolicy::default())
            .await
            .unwrap();
        assert_eq!(wholesale.lines[0].unit_price, 6500);
        assert_eq!(wholesale.subtotal, 65_000);
        assert_eq!(wholesale.shipping, 0);
        assert_eq!(stock_of(&db, 1).await, 80);
    }

    #[tokio::test]
    async fn test_checkout_input_errors() {
        let (db, buyer) = setup(&[product(1, 1000, 5)]).await;
        let orders = db.orders();
        let policy = CheckoutPolicy::default();

        assert!(matches!(
            orders.checkout(request(&buyer, vec![]), &policy).await,
            Err(DbError::Core(CoreError::EmptyCart))
        ));

        let mut bad_address = request(&buyer, vec![CartLine::new(1, 1)]);
        bad_address.shipping_address.city = "  ".to_string();
        assert!(matches!(
            orders.checkout(bad_address, &policy).await,
            Err(DbError::Core(CoreError::Validation(_)))
        ));

        let mut ghost = request(&buyer, vec![CartLine::new(1, 1)]);
        ghost.buyer_id = "ghost".to_string();
        assert!(matches!(
            orders.checkout(ghost, &policy).await,
            Err(DbError::Core(CoreError::UserNotFound(_)))
        ));

        assert_eq!(stock_of(&db, 1).await, 5);
    }

    #[tokio::test]
    async fn test_checkout_raises_low_stock_alert() {
        let (db, buyer) = setup(&[product(1, 1000, 5)]).await;
        db.orders()
            .checkout(request(&buyer, vec![CartLine::new(1, 3)]), &CheckoutPolicy::default())
            .await
            .unwrap();

        let feed = db.notifications().list(false, 10).await.unwrap();
        assert!(feed
            .iter()
            .any(|n| n.level == NotificationLevel::Warning && n.product_id == Some(1)));
        assert!(feed.iter().any(|n| n.title == "New order"));
    }

    #[tokio::test]
    async fn test_advance_status() {
        let (db, buyer) = setup(&[product(1, 1000, 5)]).await;
        let order = db
            .orders()
            .checkout(request(&buyer, vec![CartLine::new(1, 1)]), &CheckoutPolicy::default())
            .await
            .unwrap();
        let admin = Actor::new("admin-1", Role::Admin);

        let shipped = db
            .orders()
            .advance_status(&order.id, OrderStatus::Shipped, &admin)
            .await
            .unwrap();
        assert_eq!(shipped.status, OrderStatus::Shipped);
        assert!(shipped.timeline[..3].iter().all(|e| e.completed));
        assert!(!shipped.timeline[3].completed);

        let err = db
            .orders()
            .advance_status(&order.id, OrderStatus::Cancelled, &admin)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::InvalidTransition { .. })));

        let buyer_actor = Actor::new(buyer.id.clone(), Role::User);
        assert!(matches!(
            db.orders().advance_status(&order.id, OrderStatus::Delivered, &buyer_actor).await,
            Err(DbError::Core(CoreError::Forbidden { .. }))
        ));
        assert!(matches!(
            db.orders().advance_status("missing", OrderStatus::Delivered, &admin).await,
            Err(DbError::Core(CoreError::OrderNotFound(_)))
        ));

        let stored = db.orders().get(&order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Shipped);
    }

    #[tokio::test]
    async fn test_listing() {
        let (db, buyer) = setup(&[product(1, 1000, 50)]).await;
        for qty in 1..=3 {
            db.orders()
                .checkout(request(&buyer, vec![CartLine::new(1, qty)]), &CheckoutPolicy::default())
                .await
                .unwrap();
        }

        let mine = db.orders().list_for_buyer(&buyer.id, 50, 0).await.unwrap();
        assert_eq!(mine.len(), 3);
        assert_eq!(mine[0].lines[0].quantity, 3);
        assert!(db.orders().list_for_buyer("someone-else", 50, 0).await.unwrap().is_empty());

        let admin = Actor::new("admin-1", Role::Admin);
        db.orders()
            .advance_status(&mine[0].id, OrderStatus::Cancelled, &admin)
            .await
            .unwrap();
        assert_eq!(db.orders().list_all(Some(OrderStatus::Cancelled), 50, 0).await.unwrap().len(), 1);
        assert_eq!(db.orders().list_all(Some(OrderStatus::Pending), 50, 0).await.unwrap().len(), 2);
        // cancellation does not return stock
        assert_eq!(stock_of(&db, 1).await, 44);
    }

    #[tokio::test]
    async fn test_listing_pages_past_line_batch() {
        let count = LINE_QUERY_BATCH + 20;
        let (db, buyer) = setup(&[product(1, 100, count as i64)]).await;
        for _ in 0..count {
            db.orders()
                .checkout(request(&buyer, vec![CartLine::new(1, 1)]), &CheckoutPolicy::default())
                .await
                .unwrap();
        }

        let everything = db.orders().list_all(None, count as i64 + 10, 0).await.unwrap();
        assert_eq!(everything.len(), count);
        assert!(everything.iter().all(|order| order.lines.len() == 1));

        let first = db.orders().list_for_buyer(&buyer.id, 10, 0).await.unwrap();
        let second = db.orders().list_for_buyer(&buyer.id, 10, 10).await.unwrap();
        assert_eq!(first.len(), 10);
        assert_eq!(second.len(), 10);
        assert_eq!(first[0].id, everything[0].id);
        assert_eq!(second[0].id, everything[10].id);

        let tail = db.orders().list_all(None, 50, count as i64 - 5).await.unwrap();
        assert_eq!(tail.len(), 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_checkouts_never_oversell() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::new(dir.path().join("race.db")).max_connections(8))
            .await
            .unwrap();
        db.products().insert(&product(1, 1000, 5)).await.unwrap();

        let mut buyers = Vec::new();
        for n in 0..10 {
            let buyer = db
                .users()
                .create(NewUser {
                    email: format!("buyer{n}@farmgate.ng"),
                    name: format!("Buyer {n}"),
                    phone: None,
                    password_hash: "hash".to_string(),
                })
                .await
                .unwrap();
            buyers.push(buyer);
        }

        let handles: Vec<_> = buyers
            .iter()
            .map(|buyer| {
                let db = db.clone();
                let req = request(buyer, vec![CartLine::new(1, 1)]);
                tokio::spawn(async move { db.orders().checkout(req, &CheckoutPolicy::default()).await })
            })
            .collect();

        let mut placed = 0;
        let mut refused = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => placed += 1,
                Err(DbError::Core(CoreError::InsufficientStock { shortages })) => {
                    assert_eq!(shortages[0].product_id, 1);
                    refused += 1;
                }
                Err(other) => panic!("unexpected checkout error: {other}"),
            }
        }

        assert_eq!(placed, 5);
        assert_eq!(refused, 5);
        assert_eq!(stock_of(&db, 1).await, 0);
        assert_eq!(db.orders().list_all(None, 50, 0).await.unwrap().len(), 5);
        db.close().await;
    }
}
