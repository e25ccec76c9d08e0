//! # Validation Module
//!
//! Recipe validation, draft acceptance, and field validators for AromaDB.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Frontend (TypeScript)                                        │
//! │  ├── Required inputs, capacity warning while typing                    │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Engine (THIS MODULE)                                         │
//! │  ├── Field validators (name, amounts, ids)                             │
//! │  ├── validate_recipe: ALL violations, classified                       │
//! │  ├── accept_recipe: policy, costing, stock                             │
//! │  └── check_stock                                                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── UNIQUE (owner, name)                                              │
//! │  └── Foreign keys, ON DELETE RESTRICT                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Fail Fast vs Accumulate
//! Field validators stop at the first problem. Recipe rules are collected so
//! a user fixing a form sees every issue at once.
//!
//! ## Usage
//! ```rust
//! use aroma_core::types::RecipeDraft;
//! use aroma_core::validation::validate_recipe;
//! use aroma_core::{PackageBundle, RecipeViolation};
//!
//! let bundles: Vec<PackageBundle> = Vec::new();
//! let violations = validate_recipe(&RecipeDraft::default(), &bundles).unwrap_err();
//!
//! assert_eq!(violations.len(), 4);
//! assert_eq!(violations[0], RecipeViolation::EmptyName);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::lookup::Lookup;
use crate::money::Money;
use crate::pricing::{recipe_cost_breakdown, recipe_total_cost, CostBreakdown, Margin};
use crate::types::{Ingredient, NewRecipe, PackageBundle, RecipeDraft, RecipeIngredient};
use crate::MAX_NAME_LEN;

/// Result type for field validation.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Recipe Violations
// =============================================================================

/// Whether a violation makes the recipe structurally unusable or only
/// overfills its packaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ViolationClass {
    Structural,
    Capacity,
}

/// A recipe rule that was broken.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export)]
pub enum RecipeViolation {
    #[error("Recipe name is required")]
    EmptyName,

    /// No bundle id was given, or the id does not resolve.
    #[error("Recipe must use an existing package bundle")]
    NoPackageBundle { package_bundle_id: Option<String> },

    #[error("Recipe must contain at least one ingredient")]
    NoIngredients,

    #[error("Total volume must be greater than zero")]
    NonPositiveVolume,

    #[error("Total volume {total_volume_ml}ml exceeds bundle capacity {capacity_ml}ml")]
    VolumeExceedsCapacity {
        total_volume_ml: f64,
        capacity_ml: f64,
    },
}

impl RecipeViolation {
    /// Stable machine-readable code.
    pub const fn code(&self) -> &'static str {
        match self {
            RecipeViolation::EmptyName => "EMPTY_NAME",
            RecipeViolation::NoPackageBundle { .. } => "NO_PACKAGE_BUNDLE",
            RecipeViolation::NoIngredients => "NO_INGREDIENTS",
            RecipeViolation::NonPositiveVolume => "NON_POSITIVE_VOLUME",
            RecipeViolation::VolumeExceedsCapacity { .. } => "VOLUME_EXCEEDS_CAPACITY",
        }
    }

    pub const fn class(&self) -> ViolationClass {
        match self {
            RecipeViolation::VolumeExceedsCapacity { .. } => ViolationClass::Capacity,
            _ => ViolationClass::Structural,
        }
    }
}

/// What to do with a capacity-class violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum CapacityPolicy {
    /// Reject the recipe.
    #[default]
    Enforce,
    /// Save the recipe and return the violation as a warning.
    Warn,
}

impl CapacityPolicy {
    fn blocks(&self, violation: &RecipeViolation) -> bool {
        match violation.class() {
            ViolationClass::Structural => true,
            ViolationClass::Capacity => *self == CapacityPolicy::Enforce,
        }
    }
}

/// All violations found for one recipe.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    pub violations: Vec<RecipeViolation>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    /// Splits violations into `(blocking, advisory)` under `policy`.
    ///
    /// Structural violations always block.
    pub fn partition(self, policy: CapacityPolicy) -> (Vec<RecipeViolation>, Vec<RecipeViolation>) {
        self.violations
            .into_iter()
            .partition(|violation| policy.blocks(violation))
    }
}

impl From<Result<(), Vec<RecipeViolation>>> for ValidationReport {
    fn from(result: Result<(), Vec<RecipeViolation>>) -> Self {
        ValidationReport {
            violations: result.err().unwrap_or_default(),
        }
    }
}

// =============================================================================
// Recipe Validation
// =============================================================================

/// Checks a recipe against every rule and reports all violations.
///
/// ## Rules
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  name blank                           → EmptyName                       │
/// │  no bundle id / id not found          → NoPackageBundle                 │
/// │  no ingredient entries                → NoIngredients                   │
/// │  total_volume_ml ≤ 0 (or NaN)         → NonPositiveVolume               │
/// │  total_volume_ml > bundle capacity    → VolumeExceedsCapacity           │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
///
/// Violations come back in the order above.
pub fn validate_recipe<L>(recipe: &RecipeDraft, bundles: &L) -> Result<(), Vec<RecipeViolation>>
where
    L: Lookup<PackageBundle> + ?Sized,
{
    let mut violations = Vec::new();

    if recipe.name.trim().is_empty() {
        violations.push(RecipeViolation::EmptyName);
    }

    let bundle_id = recipe
        .package_bundle_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty());
    let bundle = bundle_id.and_then(|id| bundles.lookup(id));
    if bundle.is_none() {
        violations.push(RecipeViolation::NoPackageBundle {
            package_bundle_id: bundle_id.map(str::to_string),
        });
    }

    if recipe.ingredients.is_empty() {
        violations.push(RecipeViolation::NoIngredients);
    }

    // NaN fails this comparison too
    let volume_positive = recipe.total_volume_ml > 0.0;
    if !volume_positive {
        violations.push(RecipeViolation::NonPositiveVolume);
    }

    if let Some(bundle) = bundle {
        if volume_positive && recipe.total_volume_ml > bundle.capacity_ml {
            violations.push(RecipeViolation::VolumeExceedsCapacity {
                total_volume_ml: recipe.total_volume_ml,
                capacity_ml: bundle.capacity_ml,
            });
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

/// A recipe that passed validation, with the capacity warnings the policy let
/// through.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptedRecipe {
    pub recipe: NewRecipe,
    pub warnings: Vec<RecipeViolation>,
}

/// Runs every check a recipe must pass before it is stored.
///
/// ## Order
/// 0. Ids are trimmed once (`RecipeDraft::normalized`), so every lookup below
///    sees the same id that gets stored
/// 1. Recipe rules (`validate_recipe`), split by `policy`
/// 2. Field rules (`RecipeDraft::validate_fields`)
/// 3. Costing (`recipe_total_cost`), which also resolves every ingredient
/// 4. Stock (`check_stock`)
///
/// ## Errors
/// - `RecipeInvalid` listing every blocking violation
/// - `Validation`, `UnknownIngredient`, `InsufficientStock` from steps 2-4
pub fn accept_recipe<B, I>(
    draft: RecipeDraft,
    bundles: &B,
    ingredients: &I,
    policy: CapacityPolicy,
) -> CoreResult<AcceptedRecipe>
where
    B: Lookup<PackageBundle> + ?Sized,
    I: Lookup<Ingredient> + ?Sized,
{
    let draft = draft.normalized();
    let report = ValidationReport::from(validate_recipe(&draft, bundles));
    let (blocking, warnings) = report.partition(policy);
    if !blocking.is_empty() {
        return Err(CoreError::RecipeInvalid(blocking));
    }

    draft.validate_fields()?;
    let total_cost = recipe_total_cost(&draft.ingredients, ingredients)?;
    check_stock(&draft.ingredients, ingredients)?;

    Ok(AcceptedRecipe {
        recipe: NewRecipe {
            name: draft.name.trim().to_string(),
            description: draft.description,
            total_volume_ml: draft.total_volume_ml,
            retail_price: draft.retail_price,
            notes: draft
                .notes
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            total_cost,
            // validate_recipe guarantees the id is present and resolves
            package_bundle_id: draft.package_bundle_id.unwrap_or_default(),
            ingredients: draft.ingredients,
        },
        warnings,
    })
}

/// Checks a bundle's new capacity against the recipes already filled into it.
///
/// `largest_volume_ml` is the biggest `total_volume_ml` among those recipes,
/// `None` when no recipe uses the bundle.
///
/// ## Returns
/// * `Ok(vec![])` - Every recipe still fits
/// * `Ok(warnings)` - A recipe no longer fits and `policy` is `Warn`
/// * `Err(RecipeInvalid)` - A recipe no longer fits and `policy` is `Enforce`
pub fn check_bundle_capacity(
    capacity_ml: f64,
    largest_volume_ml: Option<f64>,
    policy: CapacityPolicy,
) -> CoreResult<Vec<RecipeViolation>> {
    let violations = match largest_volume_ml {
        Some(total_volume_ml) if total_volume_ml > capacity_ml => {
            vec![RecipeViolation::VolumeExceedsCapacity {
                total_volume_ml,
                capacity_ml,
            }]
        }
        _ => Vec::new(),
    };

    let (blocking, warnings) = ValidationReport { violations }.partition(policy);
    if !blocking.is_empty() {
        return Err(CoreError::RecipeInvalid(blocking));
    }
    Ok(warnings)
}

// =============================================================================
// Dry Run
// =============================================================================

/// Everything `accept_recipe` would check, reported without stopping at the
/// first failure. Nothing is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RecipeAssessment {
    /// Whether `accept_recipe` would accept the draft under the same policy.
    pub accepted: bool,

    /// Violations that block saving under the policy.
    pub errors: Vec<RecipeViolation>,

    /// Violations the policy lets through.
    pub warnings: Vec<RecipeViolation>,

    /// Field, ingredient and stock problems, as messages.
    pub problems: Vec<String>,

    /// Cost per unit, when every ingredient resolves.
    pub cost: Option<CostBreakdown>,

    /// Margin at the draft's retail price.
    pub margin: Option<Margin>,
}

/// Assesses a draft for the recipe editor.
///
/// ```text
/// validate_recipe ──► errors / warnings (by policy)
/// validate_fields ──► problems
/// cost breakdown  ──► cost + margin, or a problem
/// check_stock     ──► problems (only when costing succeeded)
/// ```
pub fn assess_recipe<B, I>(
    draft: &RecipeDraft,
    bundles: &B,
    ingredients: &I,
    policy: CapacityPolicy,
) -> RecipeAssessment
where
    B: Lookup<PackageBundle> + ?Sized,
    I: Lookup<Ingredient> + ?Sized,
{
    let draft = &draft.clone().normalized();
    let (errors, warnings) = ValidationReport::from(validate_recipe(draft, bundles)).partition(policy);
    let mut problems = Vec::new();

    if let Err(e) = draft.validate_fields() {
        problems.push(e.to_string());
    }

    let bundle = draft
        .package_bundle_id
        .as_deref()
        .and_then(|id| bundles.lookup(id));

    let cost = match recipe_cost_breakdown(&draft.ingredients, ingredients, bundle) {
        Ok(cost) => Some(cost),
        Err(e) => {
            problems.push(e.to_string());
            None
        }
    };

    if cost.is_some() {
        if let Err(e) = check_stock(&draft.ingredients, ingredients) {
            problems.push(e.to_string());
        }
    }

    let margin = cost.and_then(|c| c.margin(draft.retail_price));

    RecipeAssessment {
        accepted: errors.is_empty() && problems.is_empty(),
        errors,
        warnings,
        problems,
        cost,
        margin,
    }
}

// =============================================================================
// Stock
// =============================================================================

/// Checks that every ingredient with recorded stock has enough of it.
///
/// Stock is kept in the ingredient's own unit and converted to ml before the
/// comparison. Ingredients with zero stock are treated as untracked.
///
/// ## Errors
/// - `UnknownIngredient` for an id the lookup does not hold
/// - `InsufficientStock` for the first entry that needs more than is on hand
pub fn check_stock<L>(entries: &[RecipeIngredient], ingredients: &L) -> CoreResult<()>
where
    L: Lookup<Ingredient> + ?Sized,
{
    for entry in entries {
        let ingredient = ingredients
            .lookup(&entry.ingredient_id)
            .ok_or_else(|| CoreError::UnknownIngredient(entry.ingredient_id.clone()))?;

        if ingredient.stock_amount <= 0.0 {
            continue;
        }

        let available_ml = ingredient.stock_ml();
        if available_ml < entry.amount_ml {
            return Err(CoreError::InsufficientStock {
                ingredient: ingredient.name.clone(),
                required_ml: entry.amount_ml,
                available_ml,
            });
        }
    }
    Ok(())
}

// =============================================================================
// Field Validators
// =============================================================================

/// Validates an entity name and returns it trimmed.
///
/// ## Rules
/// - Must not be blank
/// - At most [`MAX_NAME_LEN`] characters
///
/// ## Example
/// ```rust
/// use aroma_core::validation::validate_name;
///
/// assert_eq!(validate_name("name", "  Lavender ").unwrap(), "Lavender");
/// assert!(validate_name("name", "   ").is_err());
/// ```
pub fn validate_name(field: &str, value: &str) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(value.to_string())
}

/// Validates a referenced id (UUID) and returns it trimmed.
pub fn validate_id(field: &str, value: &str) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    uuid::Uuid::parse_str(value).map_err(|e| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: e.to_string(),
    })?;

    Ok(value.to_string())
}

/// Validates a price. Zero is allowed (free samples, donated packaging).
pub fn validate_non_negative_money(field: &str, value: Money) -> ValidationResult<()> {
    if value.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    if value > Money::MAX {
        return Err(ValidationError::TooLarge {
            field: field.to_string(),
            max: Money::MAX.to_decimal().to_string(),
        });
    }
    Ok(())
}

/// Validates a quantity that may be zero (stock on hand).
pub fn validate_non_negative_amount(field: &str, value: f64) -> ValidationResult<()> {
    if !value.is_finite() {
        return Err(ValidationError::NotFinite {
            field: field.to_string(),
        });
    }
    if value < 0.0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a quantity that must be greater than zero (capacity, amount_ml).
pub fn validate_positive_amount(field: &str, value: f64) -> ValidationResult<()> {
    if !value.is_finite() {
        return Err(ValidationError::NotFinite {
            field: field.to_string(),
        });
    }
    if value <= 0.0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
