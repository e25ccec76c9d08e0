//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Micro-Units?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE PER-MILLILITER PROBLEM                                             │
//! │                                                                         │
//! │  Ingredient prices are quoted per ml and are often fractions of a      │
//! │  cent: carrier oil at 0.0325/ml, 0.4ml of it = 0.013                   │
//! │                                                                         │
//! │  Integer cents would round every line to 0.01 before summing.          │
//! │  Floating point would drift: 0.1 + 0.2 = 0.30000000000000004           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer micro-units (1/1_000_000 of the currency)       │
//! │    0.0325/ml  = 32_500 micros                                          │
//! │    × 0.4ml    = 13_000 micros  (rounded once, per line)                │
//! │    Sums are exact integer additions                                    │
//! │    Cents appear only at presentation time                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use aroma_core::money::Money;
//!
//! let bottle = Money::from_cents(250);       // 2.50
//! let label = Money::from_decimal(0.5);      // 0.50
//! let total = bottle + label;
//! assert_eq!(total.rounded_cents(), 300);
//! assert_eq!(total.to_string(), "$3.00");
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};

/// Micro-units per whole currency unit.
pub const MICROS_PER_UNIT: i64 = 1_000_000;

/// Micro-units per cent.
pub const MICROS_PER_CENT: i64 = 10_000;

/// Largest amount, in whole currency units, a single price may hold.
///
/// Keeps every stored price far enough below `i64::MAX` micros that a
/// bundle or recipe total can only overflow through checked arithmetic.
pub const MAX_AMOUNT_UNITS: i64 = 1_000_000_000;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in micro-units (1/1_000_000 of the currency).
///
/// ## Design Decisions
/// - **i64 (signed)**: room for ±9 trillion currency units, prices are
///   capped at [`Money::MAX`]
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **JSON as a decimal number**: `2.5`, matching what the frontend sends
/// - **SQLite as INTEGER micros**: exact storage, no REAL columns for money
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  PackagingItem.price ──► bundle_total_price ──► PackageBundle.total_price│
/// │                                                                         │
/// │  Ingredient.price_per_unit × amount_ml ──► recipe_total_cost            │
/// │                                             ──► Recipe.total_cost       │
/// │                                                                         │
/// │  Recipe.retail_price − unit cost ──► Margin                            │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
pub struct Money(i64);

impl Money {
    /// Largest price accepted from a client: [`MAX_AMOUNT_UNITS`].
    pub const MAX: Money = Money(MAX_AMOUNT_UNITS * MICROS_PER_UNIT);

    /// Creates a Money value from micro-units.
    #[inline]
    pub const fn from_micros(micros: i64) -> Self {
        Money(micros)
    }

    /// Creates a Money value from cents.
    ///
    /// ## Example
    /// ```rust
    /// use aroma_core::money::Money;
    ///
    /// let price = Money::from_cents(125); // 1.25
    /// assert_eq!(price.micros(), 1_250_000);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents * MICROS_PER_CENT)
    }

    /// Creates a Money value from a decimal amount of currency.
    ///
    /// Rounds to the nearest micro-unit. Meant for literals and seed data;
    /// amounts coming from a client go through [`Money::try_from_decimal`].
    /// Values past [`Money::MAX`] are clamped to it.
    ///
    /// ## Example
    /// ```rust
    /// use aroma_core::money::Money;
    ///
    /// assert_eq!(Money::from_decimal(0.85), Money::from_cents(85));
    /// assert_eq!(Money::from_decimal(0.0325).micros(), 32_500);
    /// ```
    pub fn from_decimal(amount: f64) -> Self {
        let micros = (amount * MICROS_PER_UNIT as f64).round();
        let max = Money::MAX.0 as f64;
        Money(micros.clamp(-max, max) as i64)
    }

    /// Creates a Money value from a decimal amount, if it is a finite number
    /// within `±MAX_AMOUNT_UNITS`.
    ///
    /// ## Example
    /// ```rust
    /// use aroma_core::money::Money;
    ///
    /// assert_eq!(Money::try_from_decimal(2.5), Some(Money::from_cents(250)));
    /// assert_eq!(Money::try_from_decimal(1e13), None);
    /// assert_eq!(Money::try_from_decimal(f64::NAN), None);
    /// ```
    pub fn try_from_decimal(amount: f64) -> Option<Self> {
        if !amount.is_finite() || amount.abs() > MAX_AMOUNT_UNITS as f64 {
            return None;
        }
        Some(Money((amount * MICROS_PER_UNIT as f64).round() as i64))
    }

    /// Returns the value in micro-units.
    #[inline]
    pub const fn micros(&self) -> i64 {
        self.0
    }

    /// Returns the value as a decimal amount of currency (for display and JSON).
    #[inline]
    pub fn to_decimal(&self) -> f64 {
        self.0 as f64 / MICROS_PER_UNIT as f64
    }

    /// Rounds to whole cents, ties away from zero.
    ///
    /// ## Example
    /// ```rust
    /// use aroma_core::money::Money;
    ///
    /// assert_eq!(Money::from_micros(12_345).rounded_cents(), 1);   // 0.012345
    /// assert_eq!(Money::from_micros(15_000).rounded_cents(), 2);   // 0.015
    /// assert_eq!(Money::from_micros(-15_000).rounded_cents(), -2);
    /// ```
    pub const fn rounded_cents(&self) -> i64 {
        let half = MICROS_PER_CENT / 2;
        if self.0 >= 0 {
            (self.0 + half) / MICROS_PER_CENT
        } else {
            (self.0 - half) / MICROS_PER_CENT
        }
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
        Money(self.0.abs())
    }

    /// Adds two amounts, `None` on overflow.
    #[inline]
    pub const fn checked_add(self, other: Money) -> Option<Money> {
        match self.0.checked_add(other.0) {
            Some(micros) => Some(Money(micros)),
            None => None,
        }
    }

    /// Multiplies a per-ml price by a volume in milliliters.
    ///
    /// The product is rounded once to the nearest micro-unit. `None` when the
    /// volume is not finite or the product does not fit.
    ///
    /// ## Example
    /// ```rust
    /// use aroma_core::money::Money;
    ///
    /// let per_ml = Money::from_decimal(0.85);   // lavender
    /// let line = per_ml.multiply_ml(3.0);       // 3ml in a blend
    /// assert_eq!(line, Some(Money::from_cents(255)));
    /// assert_eq!(Money::MAX.multiply_ml(1e9), None);
    /// ```
    pub fn multiply_ml(&self, amount_ml: f64) -> Option<Money> {
        let product = (self.0 as f64 * amount_ml).round();
        // i64::MAX as f64 rounds up to 2^63, which is already out of range.
        if !product.is_finite() || product.abs() >= i64::MAX as f64 {
            return None;
        }
        Some(Money(product as i64))
    }

    /// Share of `self` that `part` represents, in percent.
    ///
    /// Returns `None` when `self` is zero.
    pub fn percent_of(&self, part: Money) -> Option<f64> {
        if self.is_zero() {
            return None;
        }
        Some(part.0 as f64 * 100.0 / self.0 as f64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money rounded to cents.
///
/// ## Note
/// This is for logs and messages. The frontend formats currency itself.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cents = self.rounded_cents();
        let sign = if cents < 0 { "-" } else { "" };
        write!(f, "{}${}.{:02}", sign, (cents / 100).abs(), (cents % 100).abs())
    }
}

/// Default money is zero.
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

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

/// Serialized as a decimal number of currency units.
impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_decimal())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = f64::deserialize(deserializer)?;
        Money::try_from_decimal(amount).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "amount must be a finite number between -{max} and {max}",
                max = MAX_AMOUNT_UNITS
            ))
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
