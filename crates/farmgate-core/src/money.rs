//! # Money Module
//!
//! Provides the `Money` type for monetary values in whole Naira.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  The catalog, tier prices, shipping fee and thresholds are all whole   │
//! │  Naira. Keeping them as i64 means subtotal = Σ price × qty is exact.  │
//! │                                                                         │
//! │  The only fractional step is VAT (7.5%), which is rounded once on the  │
//! │  order subtotal with integer math, never with floats.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use farmgate_core::money::Money;
//!
//! let price = Money::from_naira(7500);
//! let line = price * 3_i64;
//! assert_eq!(line.naira(), 22_500);
//! assert_eq!(line.to_string(), "₦22,500");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul};
use ts_rs::TS;

use crate::types::TaxRate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in whole Naira.
///
/// ## Where Money is Used
/// ```text
/// Product.base_price ──► pricing::unit_price ──► OrderLine.unit_price
///                                                   │
///                                                   ▼
///                        Σ line totals ──► subtotal ──► shipping + VAT ──► total
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from whole Naira.
    #[inline]
    pub const fn from_naira(naira: i64) -> Self {
        Money(naira)
    }

    /// Returns the value in whole Naira.
    #[inline]
    pub const fn naira(&self) -> i64 {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Calculates tax at the given rate, rounding half up to the nearest Naira.
    ///
    /// ## Implementation
    /// Integer math: `(amount * bps + 5000) / 10000`.
    /// The +5000 provides rounding (5000/10000 = 0.5).
    ///
    /// ## Example
    /// ```rust
    /// use farmgate_core::money::Money;
    /// use farmgate_core::types::TaxRate;
    ///
    /// // ₦22,500 at 7.5% VAT = ₦1,687.50 → ₦1,688
    /// let vat = Money::from_naira(22_500).calculate_tax(TaxRate::from_bps(750));
    /// assert_eq!(vat.naira(), 1_688);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        // i128 keeps very large wholesale orders from overflowing
        let tax = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_naira(tax as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Formats as `₦7,500` (thousands separated, no decimals).
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let digits = self.0.unsigned_abs().to_string();

        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }

        write!(f, "{}₦{}", sign, grouped)
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Money::from_naira(7500).to_string(), "₦7,500");
        assert_eq!(Money::from_naira(999).to_string(), "₦999");
        assert_eq!(Money::from_naira(1_250_000).to_string(), "₦1,250,000");
        assert_eq!(Money::from_naira(-2500).to_string(), "-₦2,500");
        assert_eq!(Money::zero().to_string(), "₦0");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_naira(1000);
        let b = Money::from_naira(500);

        assert_eq!((a + b).naira(), 1500);
        assert_eq!((a * 3).naira(), 3000);
    }

    #[test]
    fn test_sum() {
        let total: Money = [100, 250, 650]
            .into_iter()
            .map(Money::from_naira)
            .sum();
        assert_eq!(total.naira(), 1000);
    }

    #[test]
    fn test_vat_rounds_half_up() {
        let rate = TaxRate::from_bps(750);
        // 1000 × 7.5% = 75 exactly
        assert_eq!(Money::from_naira(1000).calculate_tax(rate).naira(), 75);
        // 22,500 × 7.5% = 1687.5 → 1688
        assert_eq!(Money::from_naira(22_500).calculate_tax(rate).naira(), 1688);
        // 10 × 7.5% = 0.75 → 1
        assert_eq!(Money::from_naira(10).calculate_tax(rate).naira(), 1);
    }

    #[test]
    fn test_zero() {
        assert_eq!(Money::zero().naira(), 0);
        assert_eq!(Money::default(), Money::zero());
    }
}
