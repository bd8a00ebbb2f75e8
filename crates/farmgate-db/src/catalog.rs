//! # Seed Catalog
//!
//! The storefront's starting product list. Applied once to an empty
//! `products` table by [`Database::seed_catalog`](crate::Database::seed_catalog)
//! or the `seed` binary.

use farmgate_core::{BulkTier, Product};

/// `(id, name, description, base_price, unit, category, stock, low_stock_threshold, tiers)`
type CatalogEntry = (
    i64,
    &'static str,
    &'static str,
    i64,
    &'static str,
    &'static str,
    i64,
    i64,
    &'static [(i64, i64)],
);

const CATALOG: &[CatalogEntry] = &[
    (
        1,
        "Ofada Rice (50kg)",
        "Locally grown, stone-free Ofada rice.",
        7500,
        "per bag",
        "grains",
        120,
        15,
        &[(10, 6500), (50, 6000)],
    ),
    (
        2,
        "White Maize (100kg)",
        "Dried, sorted white maize for milling and feed.",
        42000,
        "per bag",
        "grains",
        60,
        10,
        &[(5, 40000), (20, 38000)],
    ),
    (
        3,
        "Brown Beans (Oloyin, 50kg)",
        "Sweet honey beans from Kano.",
        55000,
        "per bag",
        "legumes",
        40,
        8,
        &[(5, 52000), (20, 50000)],
    ),
    (
        4,
        "Yam Tubers (Abuja)",
        "Large tubers, sold in bundles of five.",
        9000,
        "per bundle",
        "tubers",
        80,
        10,
        &[(10, 8200), (40, 7800)],
    ),
    (
        5,
        "Garri (Ijebu, 25kg)",
        "Crisp white garri, double sieved.",
        18000,
        "per bag",
        "processed",
        100,
        12,
        &[(10, 16500)],
    ),
    (
        6,
        "Palm Oil (25L)",
        "Fresh red palm oil in sealed kegs.",
        38000,
        "per keg",
        "oils",
        35,
        5,
        &[(5, 36000), (15, 34500)],
    ),
    (
        7,
        "Dried Pepper (Shombo)",
        "Sun-dried long red pepper.",
        2500,
        "per kg",
        "spices",
        200,
        25,
        &[(20, 2200), (100, 2000)],
    ),
    (
        8,
        "Fresh Tomatoes (Basket)",
        "Plum tomatoes, harvested within 48 hours.",
        15000,
        "per basket",
        "vegetables",
        25,
        5,
        &[],
    ),
    (
        9,
        "Cassava Flour (10kg)",
        "High quality cassava flour for baking.",
        8500,
        "per bag",
        "processed",
        70,
        10,
        &[(10, 7800)],
    ),
    (
        10,
        "Groundnuts (Shelled, 25kg)",
        "Raw shelled groundnuts.",
        27000,
        "per bag",
        "legumes",
        0,
        5,
        &[(5, 25500)],
    ),
    (
        11,
        "Plantain (Bunch)",
        "Mature green plantain bunches.",
        4500,
        "per bunch",
        "fruits",
        50,
        10,
        &[],
    ),
    (
        12,
        "NPK Fertilizer 15-15-15 (50kg)",
        "Balanced compound fertilizer.",
        28000,
        "per bag",
        "inputs",
        90,
        15,
        &[(10, 26500), (40, 25000)],
    ),
];

/// Builds the seed products.
pub fn seed_products() -> Vec<Product> {
    CATALOG
        .iter()
        .map(
            |&(id, name, description, base_price, unit, category, stock, threshold, tiers)| {
                let mut product = Product::new(id, name, base_price, stock);
                product.description = Some(description.to_string());
                product.unit = unit.to_string();
                product.category = category.to_string();
                product.low_stock_threshold = threshold;
                product.bulk_tiers = tiers
                    .iter()
                    .map(|&(min_quantity, price)| BulkTier::new(min_quantity, price))
                    .collect();
                product
            },
        )
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use farmgate_core::validation::{validate_bulk_tiers, validate_product_name};

    #[test]
    fn test_catalog_is_valid() {
        let products = seed_products();
        let mut ids: Vec<i64> = products.iter().map(|p| p.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), products.len());

        for product in &products {
            validate_product_name(&product.name).unwrap();
            validate_bulk_tiers(&product.bulk_tiers).unwrap();
            assert!(product.stock >= 0);
            assert_eq!(product.in_stock, product.stock > 0);
        }
    }
}
