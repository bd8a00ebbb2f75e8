//! # Domain Types
//!
//! Core domain types used throughout Farmgate.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      User       │   │   Application   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (integer)   │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  base_price     │   │  role           │   │  status         │       │
//! │  │  stock          │   │  classification │   │  details (kind) │       │
//! │  │  bulk_tiers     │   │  distributor    │   │  review fields  │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Order       │   │   OrderLine     │   │  RestockRecord  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  order_number   │   │  price snapshot │   │  previous_stock │       │
//! │  │  totals         │   │  quantity       │   │  new_stock      │       │
//! │  │  timeline       │   │  name snapshot  │   │  actor_id       │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## One Buyer Record
//! [`User`] is the single canonical account record. Pricing and checkout
//! read the narrow [`Buyer`] projection of it, so there is exactly one place
//! a classification lives.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 750 bps = 7.5% (Nigerian VAT).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Product
// =============================================================================

/// A price break at or above a quantity threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BulkTier {
    /// Minimum quantity (inclusive) for this tier to apply.
    pub min_quantity: i64,
    /// Unit price in Naira once the tier applies.
    pub price_per_unit: i64,
}

impl BulkTier {
    pub const fn new(min_quantity: i64, price_per_unit: i64) -> Self {
        BulkTier {
            min_quantity,
            price_per_unit,
        }
    }

    #[inline]
    pub fn price(&self) -> Money {
        Money::from_naira(self.price_per_unit)
    }
}

/// A catalog product and its ledger state.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Catalog identifier.
    pub id: i64,

    /// Display name.
    pub name: String,

    /// Optional marketing description.
    pub description: Option<String>,

    /// Base unit price in whole Naira.
    pub base_price: i64,

    /// Unit label shown next to the price, e.g. "per kg".
    pub unit: String,

    /// Category tag ("grains", "tubers", ...).
    pub category: String,

    /// Units on hand. Never negative.
    pub stock: i64,

    /// Mirrors `stock > 0`; kept for catalog listings.
    pub in_stock: bool,

    /// Stock at or below this level counts as low (informational).
    pub low_stock_threshold: i64,

    /// When stock was last added through a restock.
    #[ts(as = "Option<String>")]
    pub last_restocked: Option<DateTime<Utc>>,

    /// Bulk price tiers, ascending by `min_quantity`.
    pub bulk_tiers: Vec<BulkTier>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Creates a product with default unit, category and threshold.
    pub fn new(id: i64, name: impl Into<String>, base_price: i64, stock: i64) -> Self {
        let now = Utc::now();
        Product {
            id,
            name: name.into(),
            description: None,
            base_price,
            unit: "per unit".to_string(),
            category: "general".to_string(),
            stock,
            in_stock: stock > 0,
            low_stock_threshold: 10,
            last_restocked: None,
            bulk_tiers: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the base price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_naira(self.base_price)
    }

    /// Checks whether the requested quantity can be taken from stock.
    #[inline]
    pub fn can_fulfil(&self, quantity: i64) -> bool {
        self.stock >= quantity
    }

    /// Classifies the current stock against the low-stock threshold.
    #[inline]
    pub fn stock_level(&self) -> StockLevel {
        StockLevel::classify(self.stock, self.low_stock_threshold)
    }
}

/// Where a stock count sits relative to the product's threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StockLevel {
    /// Above the low-stock threshold.
    Healthy,
    /// `0 < stock <= threshold`.
    Low,
    /// Exactly zero.
    Out,
}

impl StockLevel {
    pub fn classify(stock: i64, threshold: i64) -> Self {
        if stock <= 0 {
            StockLevel::Out
        } else if stock <= threshold {
            StockLevel::Low
        } else {
            StockLevel::Healthy
        }
    }

    /// The band a deduction moved stock into, if it crossed one.
    ///
    /// ```text
    /// healthy ──► low   Some(Low)
    /// any     ──► 0     Some(Out)
    /// low     ──► low   None
    /// ```
    pub fn crossed(previous: i64, current: i64, threshold: i64) -> Option<StockLevel> {
        let before = StockLevel::classify(previous, threshold);
        let after = StockLevel::classify(current, threshold);
        match (before, after) {
            (StockLevel::Out, _) => None,
            (_, StockLevel::Out) => Some(StockLevel::Out),
            (StockLevel::Healthy, StockLevel::Low) => Some(StockLevel::Low),
            _ => None,
        }
    }
}

/// Result of an availability check. Never mutates the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    pub available: bool,
    pub current_stock: i64,
}

impl Availability {
    /// Fail-closed answer for unknown products.
    pub const fn unknown() -> Self {
        Availability {
            available: false,
            current_stock: 0,
        }
    }
}

/// One line that cannot be filled from current stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StockShortage {
    pub product_id: i64,
    pub name: String,
    pub available: i64,
    pub requested: i64,
}

/// Immutable entry in a product's restock history.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RestockRecord {
    pub id: String,
    pub product_id: i64,
    pub quantity: i64,
    pub previous_stock: i64,
    pub new_stock: i64,
    pub actor_id: String,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Users
// =============================================================================

/// A buyer's commercial classification.
///
/// Only [`BuyerClassification::WholesaleVerified`] unlocks bulk-tier prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum BuyerClassification {
    Retail,
    WholesalePending,
    WholesaleVerified,
    DistributorPending,
    DistributorVerified,
}

impl BuyerClassification {
    #[inline]
    pub fn receives_bulk_pricing(&self) -> bool {
        matches!(self, BuyerClassification::WholesaleVerified)
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            BuyerClassification::WholesalePending | BuyerClassification::DistributorPending
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BuyerClassification::Retail => "retail",
            BuyerClassification::WholesalePending => "wholesale_pending",
            BuyerClassification::WholesaleVerified => "wholesale_verified",
            BuyerClassification::DistributorPending => "distributor_pending",
            BuyerClassification::DistributorVerified => "distributor_verified",
        }
    }
}

impl Default for BuyerClassification {
    fn default() -> Self {
        BuyerClassification::Retail
    }
}

/// Account role, orthogonal to classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Admin,
    SuperAdmin,
}

impl Role {
    #[inline]
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::SuperAdmin => "super_admin",
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

/// Advisory distributor tier derived from coverage text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum DistributorTier {
    /// Fewer than 3 states.
    Tier1,
    /// 3 to 5 states.
    Tier2,
    /// 6 or more states.
    Tier3,
}

/// Business snapshot copied onto a user when a distributor is approved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DistributorProfile {
    pub business_name: String,
    pub business_address: String,
    pub coverage_area: String,
    pub years_in_business: i64,
    pub expected_monthly_volume: String,
    pub tier: DistributorTier,
}

/// The canonical account record.
///
/// Password hashes and refresh tokens never leave the database layer.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub role: Role,
    pub classification: BuyerClassification,
    pub distributor: Option<DistributorProfile>,
    #[ts(as = "Option<String>")]
    pub last_login: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// The projection pricing and checkout work with.
    pub fn as_buyer(&self) -> Buyer {
        Buyer {
            id: self.id.clone(),
            email: self.email.clone(),
            classification: self.classification,
        }
    }
}

/// Whoever performs an operation, as established by a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Actor { id: id.into(), role }
    }

    #[inline]
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Identity and classification of the person checking out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Buyer {
    pub id: String,
    pub email: String,
    pub classification: BuyerClassification,
}

// =============================================================================
// Applications
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationKind {
    Wholesale,
    Distributor,
}

impl ApplicationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationKind::Wholesale => "wholesale",
            ApplicationKind::Distributor => "distributor",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    #[inline]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ApplicationStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}

/// Kind-specific attestation fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ApplicationDetails {
    Wholesale {
        business_type: Option<String>,
        registration_number: Option<String>,
    },
    Distributor {
        coverage_area: String,
        years_in_business: i64,
        expected_monthly_volume: String,
        tier: DistributorTier,
    },
}

impl ApplicationDetails {
    pub fn kind(&self) -> ApplicationKind {
        match self {
            ApplicationDetails::Wholesale { .. } => ApplicationKind::Wholesale,
            ApplicationDetails::Distributor { .. } => ApplicationKind::Distributor,
        }
    }
}

/// A request to change classification, subject to admin review.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: String,
    pub applicant_id: String,
    pub applicant_name: String,
    pub applicant_email: String,
    pub business_name: String,
    pub business_address: String,
    pub business_phone: Option<String>,
    pub details: ApplicationDetails,
    pub status: ApplicationStatus,
    #[ts(as = "String")]
    pub submitted_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<String>,
    pub review_notes: Option<String>,
    pub rejection_reason: Option<String>,
}

impl Application {
    #[inline]
    pub fn kind(&self) -> ApplicationKind {
        self.details.kind()
    }
}

// =============================================================================
// Orders
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    BankTransfer,
    PayOnDelivery,
}

/// Where an order ships to, frozen at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub full_name: String,
    pub phone: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: Option<String>,
}

/// A line item in an order.
/// Uses snapshot pattern to freeze product data at time of checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: i64,
    /// Product name at time of checkout (frozen).
    pub name: String,
    /// Unit price as charged (frozen).
    pub unit_price: i64,
    pub quantity: i64,
    pub unit: String,
    pub category: String,
    /// `unit_price × quantity`.
    pub line_total: i64,
}

impl OrderLine {
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_naira(self.line_total)
    }
}

/// One stage of an order's progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    pub status: OrderStatus,
    pub title: String,
    pub completed: bool,
    #[ts(as = "Option<String>")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// A placed order.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub order_number: String,
    pub status: OrderStatus,
    pub lines: Vec<OrderLine>,
    pub subtotal: i64,
    pub shipping: i64,
    pub tax: i64,
    pub total: i64,
    pub buyer_id: String,
    pub buyer_email: String,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub timeline: Vec<TimelineEvent>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Notifications
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Publish-only alert for the admin feed (and, for back-in-stock, a buyer).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub level: NotificationLevel,
    pub title: String,
    pub message: String,
    pub product_id: Option<i64>,
    pub user_id: Option<String>,
    pub read: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(level: NotificationLevel, title: impl Into<String>, message: impl Into<String>) -> Self {
        Notification {
            id: Uuid::new_v4().to_string(),
            level,
            title: title.into(),
            message: message.into(),
            product_id: None,
            user_id: None,
            read: false,
            created_at: Utc::now(),
        }
    }

    pub fn for_product(mut self, product_id: i64) -> Self {
        self.product_id = Some(product_id);
        self
    }

    pub fn for_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
