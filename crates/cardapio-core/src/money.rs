//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely, plus the
//! Brazilian display helpers used by reports and golden tests.
//!
//! ## Why Integer Centavos?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌                                  │
//! │                                                                         │
//! │  Recipe costs multiply by fractional quantities (0.25 kg of cheese)     │
//! │  and markups multiply by fractional factors (1.96). Those products      │
//! │  are rounded ONCE, back to whole centavos, at each step:                │
//! │                                                                         │
//! │    R$ 32,90/kg × 0,125 kg = 411.25 centavos → 411 centavos              │
//! │                                                                         │
//! │  Sums of lines, totals and prices are then exact integers.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use cardapio_core::money::Money;
//!
//! let kilo = Money::from_cents(3290);          // R$ 32,90
//! let line = kilo.multiply_quantity(0.125);    // 1/8 kg
//! assert_eq!(line.cents(), 411);
//! assert_eq!(line.to_string(), "R$ 4,11");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in centavos (1/100 of a Real).
///
/// ## Design Decisions
/// - **i64 (signed)**: differences (price - cost) can be negative
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Rounding**: every fractional multiplication rounds half away from zero
/// - **Saturating**: sums and products clamp at `i64::MIN`/`i64::MAX`, so a
///   derived total never wraps around to the opposite sign
///
/// ## Where Money is Used
/// ```text
/// Ingredient.unit_cost ──► recipe line cost ──► total_recipe_cost
///                                                   │ ÷ yield
///                                                   ▼
///                                            cost_per_portion ──► × markup
///                                                                    │
///                                                 suggested_price ◄──┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from centavos.
    ///
    /// ## Example
    /// ```rust
    /// use cardapio_core::money::Money;
    ///
    /// let price = Money::from_cents(1290); // R$ 12,90
    /// assert_eq!(price.cents(), 1290);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in centavos.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole reais portion.
    #[inline]
    pub const fn reais(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the centavos portion (always 0-99).
    #[inline]
    pub const fn centavos_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.saturating_abs())
    }

    /// Multiplies by a fractional quantity, rounding to the nearest centavo.
    ///
    /// ## Example
    /// ```rust
    /// use cardapio_core::money::Money;
    ///
    /// let flour_per_kg = Money::from_cents(450);
    /// assert_eq!(flour_per_kg.multiply_quantity(0.3).cents(), 135);
    /// assert_eq!(flour_per_kg.multiply_quantity(f64::NAN).cents(), 0);
    /// ```
    ///
    /// Non-finite quantities yield zero rather than a poisoned amount, and
    /// products beyond the `i64` range clamp to its bounds.
    pub fn multiply_quantity(&self, qty: f64) -> Money {
        if !qty.is_finite() {
            return Money::zero();
        }
        Money((self.0 as f64 * qty).round() as i64)
    }

    /// Applies a markup factor (price = cost × factor), rounding to the
    /// nearest centavo.
    #[inline]
    pub fn apply_factor(&self, factor: f64) -> Money {
        self.multiply_quantity(factor)
    }

    /// Divides into `parts` equal shares, rounding half away from zero.
    ///
    /// Returns `None` when `parts` is not positive.
    ///
    /// ## Example
    /// ```rust
    /// use cardapio_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(1000).divide(3), Some(Money::from_cents(333)));
    /// assert_eq!(Money::from_cents(1001).divide(2), Some(Money::from_cents(501)));
    /// assert_eq!(Money::from_cents(1000).divide(0), None);
    /// ```
    pub fn divide(&self, parts: i64) -> Option<Money> {
        if parts <= 0 {
            return None;
        }
        let quotient = self.0 / parts;
        let remainder = self.0 % parts;
        if remainder.abs() * 2 >= parts {
            Some(Money(quotient + self.0.signum()))
        } else {
            Some(Money(quotient))
        }
    }

    /// Returns `self / other` as a fraction, or 0 when `other` is not positive.
    ///
    /// ## Example
    /// ```rust
    /// use cardapio_core::money::Money;
    ///
    /// let allocated = Money::from_cents(300_000);
    /// let revenue = Money::from_cents(1_000_000);
    /// assert_eq!(allocated.ratio_of(revenue), 0.3);
    /// assert_eq!(allocated.ratio_of(Money::zero()), 0.0);
    /// ```
    pub fn ratio_of(&self, other: Money) -> f64 {
        if other.0 <= 0 {
            return 0.0;
        }
        self.0 as f64 / other.0 as f64
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Displays money as Brazilian Real: `R$ 1.234,56`.
///
/// ## Note
/// A plain space separates the symbol; the browser locale formatter emits a
/// non-breaking space, which reports do not need.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}R$ {},{:02}",
            sign,
            group_thousands(self.reais().unsigned_abs()),
            self.centavos_part()
        )
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
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_sub(other.0);
    }
}

/// Multiplication by a whole quantity (combo items).
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

// =============================================================================
// Formatting Helpers
// =============================================================================

/// Formats a fraction as a Brazilian percentage with two decimals.
///
/// ## Example
/// ```rust
/// use cardapio_core::money::format_percent;
///
/// assert_eq!(format_percent(0.5), "50,00%");
/// assert_eq!(format_percent(0.1234), "12,34%");
/// assert_eq!(format_percent(f64::INFINITY), "0,00%");
/// ```
pub fn format_percent(fraction: f64) -> String {
    if !fraction.is_finite() {
        return "0,00%".to_string();
    }
    let hundredths = (fraction * 10_000.0).round() as i64;
    let sign = if hundredths < 0 { "-" } else { "" };
    let hundredths = hundredths.unsigned_abs();
    format!(
        "{}{},{:02}%",
        sign,
        group_thousands(hundredths / 100),
        hundredths % 100
    )
}

/// Formats an optional amount, rendering a missing value as zero.
pub fn format_optional(amount: Option<Money>) -> String {
    amount.unwrap_or_default().to_string()
}

/// Groups digits in thousands with `.` (pt-BR).
fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}
