//! # Pricing Engine
//!
//! Resolves the unit price a buyer pays for a quantity of a product.
//!
//! ## Decision Flow
//! ```text
//! unit_price(product, quantity, classification)
//!      │
//!      ├── classification != wholesale_verified ──► base_price
//!      │
//!      ├── no bulk tiers ─────────────────────────► base_price
//!      │
//!      └── scan tiers ascending
//!              price = base_price
//!              for tier: if quantity >= tier.min_quantity { price = tier.price }
//!              ──► price  (last qualifying tier wins)
//! ```
//!
//! Pending wholesale buyers pay retail until an admin approves them. The
//! classification always comes from the stored user record, never from the
//! request.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{BulkTier, BuyerClassification, Product};

/// Returns the tier that sets the price for `quantity`, if any.
///
/// Tiers are scanned in list order and the last one whose threshold is met
/// wins, so malformed data with equal thresholds resolves to the later entry.
pub fn applicable_tier(tiers: &[BulkTier], quantity: i64) -> Option<&BulkTier> {
    tiers
        .iter()
        .filter(|tier| quantity >= tier.min_quantity)
        .last()
}

/// Unit price for `quantity` units of `product` bought by a buyer with
/// `classification`.
///
/// Pure; negative quantities are the caller's problem.
pub fn unit_price(product: &Product, quantity: i64, classification: BuyerClassification) -> Money {
    if !classification.receives_bulk_pricing() {
        return product.price();
    }

    applicable_tier(&product.bulk_tiers, quantity)
        .map(BulkTier::price)
        .unwrap_or_else(|| product.price())
}

/// The first tier above `quantity`, i.e. what the buyer could reach by
/// ordering more.
pub fn next_tier(product: &Product, quantity: i64) -> Option<BulkTier> {
    product
        .bulk_tiers
        .iter()
        .find(|tier| tier.min_quantity > quantity)
        .copied()
}

/// Price breakdown returned by the quote endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price: Money,
    pub line_total: Money,
    /// Tier that produced `unit_price`; `None` when paying base price.
    pub applied_tier: Option<BulkTier>,
    /// Next reachable tier. Only reported to buyers who get bulk pricing.
    pub next_tier: Option<BulkTier>,
}

/// Builds a [`PriceQuote`] for the given buyer.
pub fn quote(product: &Product, quantity: i64, classification: BuyerClassification) -> PriceQuote {
    let unit_price = unit_price(product, quantity, classification);
    let bulk = classification.receives_bulk_pricing();

    PriceQuote {
        product_id: product.id,
        quantity,
        unit_price,
        line_total: unit_price * quantity,
        applied_tier: if bulk {
            applicable_tier(&product.bulk_tiers, quantity).copied()
        } else {
            None
        },
        next_tier: if bulk { next_tier(product, quantity) } else { None },
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
