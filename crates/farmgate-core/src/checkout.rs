//! # Checkout Planning
//!
//! Everything checkout decides before touching the database: cart
//! normalisation, stock shortfalls, line pricing and order totals.
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  [(product_id, qty)] + Buyer (classification read from the store)      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  normalize_cart      empty? too many lines? bad qty? merge duplicates  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  find_shortages      any line short ──► InsufficientStock (itemized)   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  price_lines         pricing::unit_price per line, snapshot            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CheckoutPolicy::totals   subtotal, shipping, VAT, total               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CheckoutPlan ──► farmgate-db settles stock + inserts order in one tx  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::pricing;
use crate::types::{BuyerClassification, OrderLine, Product, ShippingAddress, StockShortage, TaxRate};
use crate::validation::{validate_bounded, validate_cart_size, validate_phone, validate_quantity};
use crate::MAX_CART_ITEMS;

// =============================================================================
// Cart Input
// =============================================================================

/// A product and quantity as submitted by the client. Prices are never
/// accepted from the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: i64,
    pub quantity: i64,
}

impl CartLine {
    pub const fn new(product_id: i64, quantity: i64) -> Self {
        CartLine {
            product_id,
            quantity,
        }
    }
}

/// Validates a cart and merges repeated product ids, keeping first-seen
/// order.
pub fn normalize_cart(lines: &[CartLine]) -> CoreResult<Vec<CartLine>> {
    if lines.is_empty() {
        return Err(CoreError::EmptyCart);
    }

    let mut merged: Vec<CartLine> = Vec::with_capacity(lines.len().min(MAX_CART_ITEMS));
    let mut index: HashMap<i64, usize> = HashMap::with_capacity(lines.len().min(MAX_CART_ITEMS));
    for line in lines {
        validate_quantity(line.quantity)?;
        match index.get(&line.product_id) {
            Some(&at) => {
                merged[at].quantity = merged[at].quantity.saturating_add(line.quantity);
            }
            None => {
                // Stop at the first line past the limit
                if validate_cart_size(merged.len() + 1).is_err() {
                    return Err(CoreError::CartTooLarge {
                        max: MAX_CART_ITEMS,
                    });
                }
                index.insert(line.product_id, merged.len());
                merged.push(*line);
            }
        }
    }

    for line in &merged {
        validate_quantity(line.quantity)?;
    }

    Ok(merged)
}

/// Lists every line that current stock cannot fill.
///
/// A product missing from `products` is reported with zero available.
pub fn find_shortages(cart: &[CartLine], products: &HashMap<i64, Product>) -> Vec<StockShortage> {
    cart.iter()
        .filter_map(|line| match products.get(&line.product_id) {
            Some(product) if product.can_fulfil(line.quantity) => None,
            Some(product) => Some(StockShortage {
                product_id: product.id,
                name: product.name.clone(),
                available: product.stock,
                requested: line.quantity,
            }),
            None => Some(StockShortage {
                product_id: line.product_id,
                name: format!("Product #{}", line.product_id),
                available: 0,
                requested: line.quantity,
            }),
        })
        .collect()
}

/// Prices each line for the buyer and snapshots product details.
pub fn price_lines(
    cart: &[CartLine],
    products: &HashMap<i64, Product>,
    classification: BuyerClassification,
) -> CoreResult<Vec<OrderLine>> {
    cart.iter()
        .map(|line| {
            let product = products
                .get(&line.product_id)
                .ok_or(CoreError::ProductNotFound(line.product_id))?;
            let unit_price = pricing::unit_price(product, line.quantity, classification);

            Ok(OrderLine {
                product_id: product.id,
                name: product.name.clone(),
                unit_price: unit_price.naira(),
                quantity: line.quantity,
                unit: product.unit.clone(),
                category: product.category.clone(),
                line_total: (unit_price * line.quantity).naira(),
            })
        })
        .collect()
}

// =============================================================================
// Totals
// =============================================================================

/// Shipping and tax settings applied at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckoutPolicy {
    /// Orders with a subtotal strictly above this ship free.
    pub free_shipping_threshold: Money,
    pub flat_shipping_fee: Money,
    pub vat_rate: TaxRate,
}

impl Default for CheckoutPolicy {
    fn default() -> Self {
        CheckoutPolicy {
            free_shipping_threshold: Money::from_naira(50_000),
            flat_shipping_fee: Money::from_naira(2_500),
            vat_rate: TaxRate::from_bps(750),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
    pub subtotal: Money,
    pub shipping: Money,
    pub tax: Money,
    pub total: Money,
}

impl CheckoutPolicy {
    pub fn shipping_for(&self, subtotal: Money) -> Money {
        if subtotal > self.free_shipping_threshold {
            Money::zero()
        } else {
            self.flat_shipping_fee
        }
    }

    /// `total = subtotal + shipping + tax`, VAT charged on the subtotal.
    pub fn totals(&self, lines: &[OrderLine]) -> OrderTotals {
        let subtotal: Money = lines.iter().map(OrderLine::line_total).sum();
        let shipping = self.shipping_for(subtotal);
        let tax = subtotal.calculate_tax(self.vat_rate);

        OrderTotals {
            subtotal,
            shipping,
            tax,
            total: subtotal + shipping + tax,
        }
    }
}

// =============================================================================
// Plan
// =============================================================================

/// Priced lines and totals, ready to be settled.
#[derive(Debug, Clone)]
pub struct CheckoutPlan {
    pub lines: Vec<OrderLine>,
    pub totals: OrderTotals,
}

/// Runs every pre-settlement step of checkout.
///
/// `products` must hold a fresh read of every product in the cart. The
/// stock check here is advisory; the database re-checks each line inside
/// the settlement transaction.
pub fn plan_checkout(
    cart: &[CartLine],
    products: &HashMap<i64, Product>,
    classification: BuyerClassification,
    policy: &CheckoutPolicy,
) -> CoreResult<CheckoutPlan> {
    let cart = normalize_cart(cart)?;

    let shortages = find_shortages(&cart, products);
    if !shortages.is_empty() {
        return Err(CoreError::InsufficientStock { shortages });
    }

    let lines = price_lines(&cart, products, classification)?;
    let totals = policy.totals(&lines);

    Ok(CheckoutPlan { lines, totals })
}

/// Trims and validates a shipping address.
pub fn validate_shipping_address(address: &ShippingAddress) -> CoreResult<ShippingAddress> {
    Ok(ShippingAddress {
        full_name: validate_bounded("shippingAddress.fullName", &address.full_name, 200)?,
        phone: validate_phone(&address.phone)?,
        street: validate_bounded("shippingAddress.street", &address.street, 300)?,
        city: validate_bounded("shippingAddress.city", &address.city, 100)?,
        state: validate_bounded("shippingAddress.state", &address.state, 100)?,
        postal_code: address
            .postal_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .map(str::to_string),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BulkTier;
    use crate::MAX_ITEM_QUANTITY;

    fn catalog() -> HashMap<i64, Product> {
        let mut rice = Product::new(1, "Ofada Rice (50kg)", 7500, 100);
        rice.unit = "per bag".to_string();
        rice.category = "grains".to_string();
        rice.bulk_tiers = vec![BulkTier::new(10, 6500), BulkTier::new(50, 6000)];

        let yam = Product::new(2, "Yam Tubers", 3000, 5);
        let pepper = Product::new(3, "Dried Pepper", 1200, 2);

        [rice, yam, pepper].into_iter().map(|p| (p.id, p)).collect()
    }

    #[test]
    fn test_empty_cart_rejected() {
        assert!(matches!(normalize_cart(&[]), Err(CoreError::EmptyCart)));
    }

    #[test]
    fn test_invalid_quantity_rejected() {
        assert!(matches!(
            normalize_cart(&[CartLine::new(1, 0)]),
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            normalize_cart(&[CartLine::new(1, -2)]),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_duplicates_merged_in_order() {
        let cart = normalize_cart(&[
            CartLine::new(2, 1),
            CartLine::new(1, 2),
            CartLine::new(2, 3),
        ])
        .unwrap();
        assert_eq!(cart, vec![CartLine::new(2, 4), CartLine::new(1, 2)]);
    }

    #[test]
    fn test_merged_quantity_still_capped() {
        let half = MAX_ITEM_QUANTITY / 2 + 1;
        let result = normalize_cart(&[CartLine::new(1, half), CartLine::new(1, half)]);
        assert!(matches!(result, Err(CoreError::Validation(_))));
    }

    #[test]
    fn test_cart_too_large() {
        let lines: Vec<CartLine> = (0..=MAX_CART_ITEMS as i64).map(|id| CartLine::new(id, 1)).collect();
        assert!(matches!(
            normalize_cart(&lines),
            Err(CoreError::CartTooLarge { .. })
        ));
    }

    #[test]
    fn test_oversized_cart_rejected_before_full_scan() {
        // The bad quantity sits past the limit, so it is never reached
        let mut lines: Vec<CartLine> = (0..70_000).map(|id| CartLine::new(id, 1)).collect();
        lines.push(CartLine::new(-1, 0));
        assert!(matches!(
            normalize_cart(&lines),
            Err(CoreError::CartTooLarge { max: MAX_CART_ITEMS })
        ));
    }

    #[test]
    fn test_repeats_do_not_count_towards_limit() {
        let lines: Vec<CartLine> = (0..MAX_CART_ITEMS as i64)
            .chain(0..MAX_CART_ITEMS as i64)
            .map(|id| CartLine::new(id, 1))
            .collect();
        let cart = normalize_cart(&lines).unwrap();
        assert_eq!(cart.len(), MAX_CART_ITEMS);
        assert!(cart.iter().all(|line| line.quantity == 2));
        assert_eq!(cart[0].product_id, 0);
    }

    #[test]
    fn test_shortages_are_itemized() {
        let shortages = find_shortages(
            &[CartLine::new(1, 3), CartLine::new(2, 6), CartLine::new(3, 3), CartLine::new(99, 1)],
            &catalog(),
        );
        let ids: Vec<i64> = shortages.iter().map(|s| s.product_id).collect();
        assert_eq!(ids, vec![2, 3, 99]);
        assert_eq!(shortages[0].available, 5);
        assert_eq!(shortages[0].requested, 6);
        assert_eq!(shortages[2].available, 0);
    }

    #[test]
    fn test_plan_retail_order_with_flat_shipping() {
        // stock 5, qty 3 of a 3000 product
        let plan = plan_checkout(
            &[CartLine::new(2, 3)],
            &catalog(),
            BuyerClassification::Retail,
            &CheckoutPolicy::default(),
        )
        .unwrap();

        assert_eq!(plan.lines.len(), 1);
        assert_eq!(plan.lines[0].unit_price, 3000);
        assert_eq!(plan.totals.subtotal.naira(), 9000);
        assert_eq!(plan.totals.shipping.naira(), 2500);
        assert_eq!(plan.totals.tax.naira(), 675);
        assert_eq!(plan.totals.total.naira(), 9000 + 2500 + 675);
    }

    #[test]
    fn test_plan_fails_on_any_shortage() {
        let result = plan_checkout(
            &[CartLine::new(1, 1), CartLine::new(3, 3)],
            &catalog(),
            BuyerClassification::Retail,
            &CheckoutPolicy::default(),
        );
        match result {
            Err(CoreError::InsufficientStock { shortages }) => {
                assert_eq!(shortages.len(), 1);
                assert_eq!(shortages[0].name, "Dried Pepper");
            }
            other => panic!("expected shortage, got {other:?}"),
        }
    }

    #[test]
    fn test_wholesale_buyer_priced_at_tier_and_ships_free() {
        let plan = plan_checkout(
            &[CartLine::new(1, 60)],
            &catalog(),
            BuyerClassification::WholesaleVerified,
            &CheckoutPolicy::default(),
        )
        .unwrap();

        let line = &plan.lines[0];
        assert_eq!(line.unit_price, 6000);
        assert_eq!(line.line_total, 360_000);
        assert_eq!(line.unit, "per bag");
        assert_eq!(plan.totals.shipping, Money::zero());
        assert_eq!(plan.totals.tax.naira(), 27_000);
        assert_eq!(plan.totals.total.naira(), 387_000);
    }

    #[test]
    fn test_free_shipping_is_strictly_above_threshold() {
        let policy = CheckoutPolicy::default();
        assert_eq!(policy.shipping_for(Money::from_naira(50_000)).naira(), 2500);
        assert_eq!(policy.shipping_for(Money::from_naira(50_001)).naira(), 0);
    }

    #[test]
    fn test_shipping_address_trimmed() {
        let address = validate_shipping_address(&ShippingAddress {
            full_name: " Ada Obi ".to_string(),
            phone: "08035550101".to_string(),
            street: "12 Market Road".to_string(),
            city: "Ibadan".to_string(),
            state: "Oyo".to_string(),
            postal_code: Some("  ".to_string()),
        })
        .unwrap();
        assert_eq!(address.full_name, "Ada Obi");
        assert_eq!(address.postal_code, None);
    }
}
