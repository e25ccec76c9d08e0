//! # Unit Conversion
//!
//! Drops ↔ milliliter conversion for recipe amounts.
//!
//! ## Canonical Unit
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  User types        Stored as          Shown back as                     │
//! │  ──────────        ─────────          ─────────────                     │
//! │  10 drops    ──►   0.5 ml      ──►    10 drops                          │
//! │  (20 drops/ml)     amount_ml          round(0.5 × 20)                   │
//! │                                                                         │
//! │  25 ml       ──►   25 ml       ──►    25 ml                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Storage and costing only ever see milliliters. The measurement on the
//! ingredient is consulted at the edges, when an amount is entered or shown.
//!
//! ## Usage
//! ```rust
//! use aroma_core::types::{DropsPerMl, Measurement};
//!
//! let drops = Measurement::Drops { drops_per_ml: DropsPerMl::new(20.0).unwrap() };
//! assert_eq!(drops.to_canonical_ml(10.0), 0.5);
//! assert_eq!(drops.to_display_amount(0.5), 10.0);
//! ```

use crate::error::CoreResult;
use crate::types::Ingredient;
use crate::validation;

/// Converts an amount entered in the ingredient's unit to milliliters.
///
/// Identity for ml-measured ingredients; `amount / drops_per_ml` for drops.
pub fn to_canonical_ml(ingredient: &Ingredient, display_amount: f64) -> f64 {
    ingredient.measurement.to_canonical_ml(display_amount)
}

/// Converts milliliters to the ingredient's display unit.
///
/// Drops are rounded to the nearest whole drop, ties away from zero.
pub fn to_display_amount(ingredient: &Ingredient, amount_ml: f64) -> f64 {
    ingredient.measurement.to_display_amount(amount_ml)
}

/// [`to_canonical_ml`] for untrusted input: the amount must be a finite,
/// non-negative number.
pub fn checked_to_canonical_ml(ingredient: &Ingredient, display_amount: f64) -> CoreResult<f64> {
    validation::validate_non_negative_amount("amount", display_amount)?;
    Ok(to_canonical_ml(ingredient, display_amount))
}

/// [`to_display_amount`] for untrusted input.
pub fn checked_to_display_amount(ingredient: &Ingredient, amount_ml: f64) -> CoreResult<f64> {
    validation::validate_non_negative_amount("amount_ml", amount_ml)?;
    Ok(to_display_amount(ingredient, amount_ml))
}

// =============================================================================
// Unit Tests
// =============================================================================
