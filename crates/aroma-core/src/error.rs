//! # Error Types
//!
//! Domain-specific error types for aroma-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  aroma-core errors (this file)                                         │
//! │  ├── CoreError        - Engine failures (conversion, costing, rules)   │
//! │  └── ValidationError  - Draft field failures                           │
//! │                                                                         │
//! │  aroma-db errors (separate crate)                                      │
//! │  └── DbError          - DuplicateName, InUse, backend unavailable ...  │
//! │                                                                         │
//! │  aroma-api errors (in app)                                             │
//! │  └── ApiError         - What the HTTP client sees (serialized)         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ApiError ← DbError                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (ingredient id, field name, ...)
//! 3. A missing reference is an error, never a silent zero
//! 4. Recipe violations are accumulated, everything else fails fast

use thiserror::Error;

use crate::validation::RecipeViolation;

// =============================================================================
// Core Error
// =============================================================================

/// Engine errors.
///
/// Local computations (conversion, pricing, costing) fail fast with one of
/// these. Recipe validation is the exception: it gathers every violation and
/// reports them together through [`CoreError::RecipeInvalid`].
#[derive(Debug, Error)]
pub enum CoreError {
    /// A measurement could not be built from its raw parts.
    ///
    /// ## When This Occurs
    /// - `measurement_type = drops` without a `drops_per_ml` factor
    /// - `drops_per_ml` is zero, negative, or not a finite number
    #[error("Invalid conversion: {reason}")]
    InvalidConversion { reason: String },

    /// A recipe entry references an ingredient the lookup does not hold.
    ///
    /// ## User Workflow
    /// ```text
    /// Recipe entries: [lavender-id, unknown-id]
    ///      │
    ///      ▼
    /// recipe_total_cost(entries, lookup)
    ///      │
    ///      ▼
    /// UnknownIngredient("unknown-id")  ← no partial sum is returned
    /// ```
    #[error("Ingredient not found: {0}")]
    UnknownIngredient(String),

    /// A bundle draft references a packaging item that does not exist.
    #[error("Packaging item not found: {0}")]
    UnknownPackagingItem(String),

    /// A recipe needs more of an ingredient than is in stock.
    #[error("Not enough stock for {ingredient}: need {required_ml}ml but only have {available_ml}ml")]
    InsufficientStock {
        ingredient: String,
        required_ml: f64,
        available_ml: f64,
    },

    /// A price sum or line cost does not fit in [`Money`](crate::Money).
    ///
    /// Prices are capped at `Money::MAX` on input, so this takes very large
    /// amounts or very many items.
    #[error("Amount out of range: {what} is too large")]
    AmountOverflow { what: String },

    /// The recipe broke one or more rules; every violation is listed.
    #[error("Recipe is invalid: {}", join_violations(.0))]
    RecipeInvalid(Vec<RecipeViolation>),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

fn join_violations(violations: &[RecipeViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// =============================================================================
// Validation Error
// =============================================================================

/// Draft field validation errors.
///
/// These occur when a submitted draft doesn't meet the field requirements,
/// before any business rule runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value is above the accepted maximum.
    #[error("{field} must be at most {max}")]
    TooLarge { field: String, max: String },

    /// Value must be zero or more.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Value is NaN or infinite.
    #[error("{field} must be a finite number")]
    NotFinite { field: String },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// The same value appears twice in a list that must be unique.
    #[error("{field} '{value}' is listed more than once")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            ingredient: "Rose Otto".to_string(),
            required_ml: 1.5,
            available_ml: 0.5,
        };
        assert_eq!(
            err.to_string(),
            "Not enough stock for Rose Otto: need 1.5ml but only have 0.5ml"
        );

        let err = CoreError::UnknownIngredient("abc".to_string());
        assert_eq!(err.to_string(), "Ingredient not found: abc");
    }

    #[test]
    fn test_recipe_invalid_lists_every_violation() {
        let err = CoreError::RecipeInvalid(vec![
            RecipeViolation::EmptyName,
            RecipeViolation::NoIngredients,
        ]);
        assert_eq!(
            err.to_string(),
            "Recipe is invalid: Recipe name is required; Recipe must contain at least one ingredient"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "name".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
