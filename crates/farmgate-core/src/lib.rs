//! # farmgate-core: Pure Business Logic for Farmgate
//!
//! This crate holds every pricing, classification, workflow and checkout
//! rule of the storefront as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Farmgate Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Storefront client (browser, thin)                  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ REST /api/v1                           │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                storefront-api (axum handlers)                   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ farmgate-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌──────────┐ ┌──────────┐ ┌───────┐  │   │
//! │  │   │ pricing │ │ tiering │ │ workflow │ │ checkout │ │ order │  │   │
//! │  │   └─────────┘ └─────────┘ └──────────┘ └──────────┘ └───────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              farmgate-db (SQLite ledger + repositories)         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, User, Application, Order, ...)
//! - [`money`] - Whole-Naira money type with integer arithmetic
//! - [`pricing`] - Bulk-tier unit pricing
//! - [`tiering`] - Distributor tier heuristic over coverage text
//! - [`workflow`] - Wholesale/distributor application review rules
//! - [`checkout`] - Cart normalisation, stock shortfalls, totals
//! - [`order`] - Order numbers, timeline and status transitions
//! - [`validation`] - Field-level input validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use farmgate_core::{pricing, BulkTier, BuyerClassification, Money, Product};
//!
//! let mut product = Product::new(1, "Ofada Rice (50kg)", 7500, 100);
//! product.bulk_tiers = vec![
//!     BulkTier::new(10, 6500),
//!     BulkTier::new(50, 6000),
//! ];
//!
//! let price = pricing::unit_price(&product, 60, BuyerClassification::WholesaleVerified);
//! assert_eq!(price, Money::from_naira(6000));
//!
//! let retail = pricing::unit_price(&product, 60, BuyerClassification::Retail);
//! assert_eq!(retail, Money::from_naira(7500));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod checkout;
pub mod error;
pub mod money;
pub mod order;
pub mod pricing;
pub mod tiering;
pub mod types;
pub mod validation;
pub mod workflow;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct products allowed in a single checkout.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single product in one checkout.
///
/// Wholesale buyers routinely order in the hundreds of units, so this sits
/// far above any retail basket and only catches typing mistakes.
pub const MAX_ITEM_QUANTITY: i64 = 10_000;

/// Maximum units added by a single restock.
pub const MAX_RESTOCK_QUANTITY: i64 = 1_000_000;

/// Number of federating units counted for nationwide coverage
/// (36 states plus the Federal Capital Territory).
pub const NATIONWIDE_STATE_COUNT: usize = 37;
