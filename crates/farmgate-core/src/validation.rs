//! # Validation Module
//!
//! Input validation utilities for Farmgate.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Storefront client                                            │
//! │  └── Basic form checks, immediate feedback (never trusted)             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: API handlers (Rust)                                          │
//! │  ├── Type validation (serde deserialization)                           │
//! │  └── THIS MODULE: field rules                                          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (stock >= 0)                                                │
//! │  ├── UNIQUE (email, order_number)                                      │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use farmgate_core::validation::{validate_email, validate_quantity};
//!
//! assert!(validate_email("ada@farmgate.ng").is_ok());
//! assert!(validate_quantity(5).is_ok());
//! ```

use crate::error::ValidationError;
use crate::types::BulkTier;
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY, MAX_RESTOCK_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Minimum password length accepted at registration and password change.
pub const MIN_PASSWORD_LENGTH: usize = 8;

// =============================================================================
// String Validators
// =============================================================================

/// Requires a non-blank value and returns it trimmed.
pub fn validate_required(field: &str, value: &str) -> ValidationResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(value.to_string())
}

/// Like [`validate_required`] but also caps the length.
pub fn validate_bounded(field: &str, value: &str, max: usize) -> ValidationResult<String> {
    let value = validate_required(field, value)?;
    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(value)
}

/// Validates a product name.
///
/// ## Example
/// ```rust
/// use farmgate_core::validation::validate_product_name;
///
/// assert!(validate_product_name("Ofada Rice (50kg)").is_ok());
/// assert!(validate_product_name("").is_err());
/// ```
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    validate_bounded("name", name, 200).map(|_| ())
}

/// Validates and normalises an email address (trimmed, lower-cased).
///
/// Only the shape is checked: one `@`, a non-empty local part and a dotted
/// domain.
pub fn validate_email(email: &str) -> ValidationResult<String> {
    let email = validate_bounded("email", email, 254)?.to_lowercase();

    let invalid = || ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: "must be a valid email address".to_string(),
    };

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.contains('@')
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
        || email.chars().any(char::is_whitespace)
    {
        return Err(invalid());
    }

    Ok(email)
}

/// Validates a new password.
pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.is_empty() {
        return Err(ValidationError::Required {
            field: "password".to_string(),
        });
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: MIN_PASSWORD_LENGTH,
        });
    }
    if password.len() > 128 {
        return Err(ValidationError::TooLong {
            field: "password".to_string(),
            max: 128,
        });
    }
    Ok(())
}

/// Validates a phone number: digits with an optional leading `+`,
/// spaces and hyphens allowed as separators.
pub fn validate_phone(phone: &str) -> ValidationResult<String> {
    let phone = validate_bounded("phone", phone, 20)?;
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    let well_formed = phone
        .char_indices()
        .all(|(i, c)| c.is_ascii_digit() || c == ' ' || c == '-' || (i == 0 && c == '+'));

    if !well_formed || digits < 7 {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must contain at least 7 digits".to_string(),
        });
    }
    Ok(phone)
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a cart quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a restock amount, capped far above any cart quantity.
pub fn validate_restock_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    if qty > MAX_RESTOCK_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_RESTOCK_QUANTITY,
        });
    }
    Ok(())
}

/// Validates a price in whole Naira. Zero is allowed.
pub fn validate_price(naira: i64) -> ValidationResult<()> {
    if naira < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a tax rate in basis points (0% to 100%).
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10000 {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: 10000,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates the number of distinct lines in a cart.
pub fn validate_cart_size(lines: usize) -> ValidationResult<()> {
    if lines > MAX_CART_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "cart items".to_string(),
            min: 1,
            max: MAX_CART_ITEMS as i64,
        });
    }

    Ok(())
}

/// Validates a product's bulk tiers.
///
/// ## Rules
/// - `min_quantity` strictly increasing and at least 1
/// - tier prices non-negative
///
/// ```text
/// [{10, 6500}, {50, 6000}]   ✅
/// [{50, 6000}, {10, 6500}]   ❌ not ascending
/// [{10, 6500}, {10, 6000}]   ❌ duplicate threshold
/// ```
pub fn validate_bulk_tiers(tiers: &[BulkTier]) -> ValidationResult<()> {
    let mut previous: Option<i64> = None;

    for tier in tiers {
        if tier.min_quantity < 1 {
            return Err(ValidationError::MustBePositive {
                field: "bulkTiers.minQuantity".to_string(),
            });
        }
        if tier.price_per_unit < 0 {
            return Err(ValidationError::OutOfRange {
                field: "bulkTiers.pricePerUnit".to_string(),
                min: 0,
                max: i64::MAX,
            });
        }
        if let Some(prev) = previous {
            if tier.min_quantity <= prev {
                return Err(ValidationError::InvalidFormat {
                    field: "bulkTiers".to_string(),
                    reason: "minQuantity must be strictly increasing".to_string(),
                });
            }
        }
        previous = Some(tier.min_quantity);
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
