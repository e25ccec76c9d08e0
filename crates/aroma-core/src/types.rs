//! # Domain Types
//!
//! Core domain types used throughout AromaDB.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   Ingredient    │   │  PackagingItem  │   │  PackageBundle  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  name (unique)  │   │  name (unique)  │   │  capacity (ml)  │       │
//! │  │  measurement    │   │  price          │   │  items ─────────┼──► PackagingItem
//! │  │  price_per_unit │   │  capacity?      │   │  total_price*   │       │
//! │  └────────▲────────┘   └─────────────────┘   └────────▲────────┘       │
//! │           │                                           │                 │
//! │  ┌────────┴────────┐   ┌─────────────────┐            │                 │
//! │  │RecipeIngredient │◄──┤     Recipe      ├────────────┘                 │
//! │  │  amount_ml      │   │  total_volume_ml│   * derived, never typed in  │
//! │  └─────────────────┘   │  total_cost*    │                              │
//! │                        └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Records vs Drafts
//! Every entity comes in two shapes:
//! - **Record** (`Ingredient`, `Recipe`, ...): what storage returns, with id,
//!   owner and timestamps.
//! - **Draft** (`IngredientDraft`, `RecipeDraft`, ...): what a client submits.
//!   Loosely typed on purpose so a half-filled form still deserializes; it is
//!   turned into a typed `New*` value by `validate()` before anything is stored.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::lookup::{Identified, Lookup};
use crate::money::Money;
use crate::validation;
use crate::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};

// =============================================================================
// Measurement
// =============================================================================

/// Conversion factor from milliliters to drops.
///
/// Can only hold a finite value greater than zero, so a drops-measured
/// ingredient can never divide by zero.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize, TS)]
#[serde(try_from = "f64", into = "f64")]
#[ts(export)]
pub struct DropsPerMl(f64);

impl DropsPerMl {
    /// Creates a conversion factor, rejecting zero, negative and non-finite values.
    ///
    /// ## Example
    /// ```rust
    /// use aroma_core::types::DropsPerMl;
    ///
    /// assert!(DropsPerMl::new(20.0).is_ok());
    /// assert!(DropsPerMl::new(0.0).is_err());
    /// assert!(DropsPerMl::new(f64::NAN).is_err());
    /// ```
    pub fn new(value: f64) -> CoreResult<Self> {
        if !value.is_finite() {
            return Err(CoreError::InvalidConversion {
                reason: "drops_per_ml must be a finite number".to_string(),
            });
        }
        if value <= 0.0 {
            return Err(CoreError::InvalidConversion {
                reason: "drops_per_ml must be greater than zero".to_string(),
            });
        }
        Ok(DropsPerMl(value))
    }

    /// Returns the factor as a plain number.
    #[inline]
    pub fn get(&self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for DropsPerMl {
    type Error = CoreError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        DropsPerMl::new(value)
    }
}

impl From<DropsPerMl> for f64 {
    fn from(value: DropsPerMl) -> Self {
        value.0
    }
}

/// The unit a user enters amounts in, as stored and as sent by the frontend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum MeasurementKind {
    #[default]
    Ml,
    Drops,
}

impl MeasurementKind {
    /// Storage/wire representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            MeasurementKind::Ml => "ml",
            MeasurementKind::Drops => "drops",
        }
    }
}

impl fmt::Display for MeasurementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MeasurementKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ml" => Ok(MeasurementKind::Ml),
            "drops" => Ok(MeasurementKind::Drops),
            other => Err(CoreError::InvalidConversion {
                reason: format!("unknown measurement type '{}'", other),
            }),
        }
    }
}

/// How an ingredient is measured.
///
/// ## Why an Enum?
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Loose form:   measurement_type = "drops", drops_per_ml = null          │
/// │                → every conversion must re-check the factor              │
/// │                                                                         │
/// │  Typed form:   Measurement::Drops { drops_per_ml: DropsPerMl(20.0) }    │
/// │                → the factor exists and is positive by construction      │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
///
/// Amounts are always stored in milliliters. The measurement only affects
/// how amounts are entered and displayed.
///
/// On the wire it is the same pair of flat fields the ingredient form sends:
/// `{"measurement_type": "drops", "drops_per_ml": 20.0}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "measurement_type", rename_all = "lowercase")]
#[ts(export)]
pub enum Measurement {
    #[serde(rename = "ml")]
    Milliliters,
    Drops { drops_per_ml: DropsPerMl },
}

impl Measurement {
    /// Builds a measurement from its raw stored/submitted parts.
    ///
    /// A factor supplied with `ml` is ignored.
    ///
    /// ## Errors
    /// `InvalidConversion` when `kind` is drops and the factor is missing or
    /// not a finite positive number.
    pub fn from_parts(kind: MeasurementKind, drops_per_ml: Option<f64>) -> CoreResult<Self> {
        match kind {
            MeasurementKind::Ml => Ok(Measurement::Milliliters),
            MeasurementKind::Drops => {
                let factor = drops_per_ml.ok_or_else(|| CoreError::InvalidConversion {
                    reason: "drops_per_ml is required when measuring in drops".to_string(),
                })?;
                Ok(Measurement::Drops {
                    drops_per_ml: DropsPerMl::new(factor)?,
                })
            }
        }
    }

    /// The raw kind of this measurement.
    pub const fn kind(&self) -> MeasurementKind {
        match self {
            Measurement::Milliliters => MeasurementKind::Ml,
            Measurement::Drops { .. } => MeasurementKind::Drops,
        }
    }

    /// The conversion factor, for drops only.
    pub fn drops_per_ml(&self) -> Option<f64> {
        match self {
            Measurement::Milliliters => None,
            Measurement::Drops { drops_per_ml } => Some(drops_per_ml.get()),
        }
    }

    /// Unit label shown next to display amounts.
    pub const fn unit_label(&self) -> &'static str {
        self.kind().as_str()
    }

    /// Converts an amount in this unit to milliliters.
    ///
    /// Identity for milliliters; `drops / drops_per_ml` for drops.
    pub fn to_canonical_ml(&self, amount: f64) -> f64 {
        match self {
            Measurement::Milliliters => amount,
            Measurement::Drops { drops_per_ml } => amount / drops_per_ml.get(),
        }
    }

    /// Converts milliliters to an amount in this unit.
    ///
    /// Drops are rounded to the nearest whole drop, ties away from zero.
    pub fn to_display_amount(&self, amount_ml: f64) -> f64 {
        match self {
            Measurement::Milliliters => amount_ml,
            Measurement::Drops { drops_per_ml } => (amount_ml * drops_per_ml.get()).round(),
        }
    }
}

impl Default for Measurement {
    fn default() -> Self {
        Measurement::Milliliters
    }
}

// =============================================================================
// Ingredient
// =============================================================================

/// A raw material used in recipes (essential oil, carrier oil, hydrosol...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Ingredient {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// User the record belongs to when storage is scoped per user.
    pub owner_id: Option<String>,

    /// Display name, unique per owner.
    pub name: String,

    /// Category tag (essential oil, carrier oil, hydrosol...).
    #[serde(rename = "type")]
    pub category: String,

    pub description: String,

    /// Therapeutic properties, free text.
    pub properties: String,

    pub notes: Option<String>,

    /// How amounts of this ingredient are entered and displayed.
    ///
    /// Flattened so a fetched record can be sent back as an
    /// [`IngredientDraft`] without losing its unit.
    #[serde(flatten)]
    pub measurement: Measurement,

    /// Price per milliliter, also for drops-measured ingredients.
    #[serde(alias = "price_per_ml")]
    #[ts(type = "number")]
    pub price_per_unit: Money,

    /// Stock on hand, in the ingredient's own unit.
    pub stock_amount: f64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Ingredient {
    /// Stock on hand converted to milliliters.
    pub fn stock_ml(&self) -> f64 {
        self.measurement.to_canonical_ml(self.stock_amount)
    }
}

/// Ingredient as submitted by a client.
///
/// `measurement_type` and `drops_per_ml` are flat here, the way the form
/// sends them; `validate()` folds them into a [`Measurement`].
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct IngredientDraft {
    #[serde(default)]
    pub name: String,

    #[serde(rename = "type", default)]
    pub category: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub properties: String,

    #[serde(default)]
    pub notes: Option<String>,

    #[serde(alias = "price_per_ml", default)]
    #[ts(type = "number")]
    pub price_per_unit: Money,

    #[serde(default)]
    pub stock_amount: f64,

    #[serde(default)]
    pub measurement_type: MeasurementKind,

    #[serde(default)]
    pub drops_per_ml: Option<f64>,
}

/// A validated ingredient, ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewIngredient {
    pub name: String,
    pub category: String,
    pub description: String,
    pub properties: String,
    pub notes: Option<String>,
    pub measurement: Measurement,
    pub price_per_unit: Money,
    pub stock_amount: f64,
}

impl IngredientDraft {
    /// Checks every field and builds the typed ingredient.
    ///
    /// ## Errors
    /// - `Validation` for a blank or overlong name, a negative price, or a
    ///   negative / non-finite stock amount
    /// - `InvalidConversion` for drops without a usable factor
    pub fn validate(self) -> CoreResult<NewIngredient> {
        let name = validation::validate_name("name", &self.name)?;
        validation::validate_non_negative_money("price_per_unit", self.price_per_unit)?;
        validation::validate_non_negative_amount("stock_amount", self.stock_amount)?;
        let measurement = Measurement::from_parts(self.measurement_type, self.drops_per_ml)?;

        Ok(NewIngredient {
            name,
            category: self.category.trim().to_string(),
            description: self.description,
            properties: self.properties,
            notes: normalize_notes(self.notes),
            measurement,
            price_per_unit: self.price_per_unit,
            stock_amount: self.stock_amount,
        })
    }
}

// =============================================================================
// Packaging Item
// =============================================================================

/// A single packaging component (bottle, cap, label, box...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PackagingItem {
    pub id: String,

    pub owner_id: Option<String>,

    pub name: String,

    /// Type tag (bottle, cap, label, box...).
    #[serde(rename = "type")]
    pub item_type: String,

    /// Material tag (glass, plastic, paper...).
    pub material: String,

    pub description: String,

    /// Unit price.
    #[ts(type = "number")]
    pub price: Money,

    /// Units on hand.
    pub stock_amount: i64,

    /// Volume it holds in ml, for containers.
    #[serde(rename = "capacity")]
    pub capacity_ml: Option<f64>,

    pub color: Option<String>,

    pub notes: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Packaging item as submitted by a client.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PackagingItemDraft {
    #[serde(default)]
    pub name: String,

    #[serde(rename = "type", default)]
    pub item_type: String,

    #[serde(default)]
    pub material: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    #[ts(type = "number")]
    pub price: Money,

    #[serde(default)]
    pub stock_amount: i64,

    #[serde(rename = "capacity", default)]
    pub capacity_ml: Option<f64>,

    #[serde(default)]
    pub color: Option<String>,

    #[serde(default)]
    pub notes: Option<String>,
}

/// A validated packaging item, ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPackagingItem {
    pub name: String,
    pub item_type: String,
    pub material: String,
    pub description: String,
    pub price: Money,
    pub stock_amount: i64,
    pub capacity_ml: Option<f64>,
    pub color: Option<String>,
    pub notes: Option<String>,
}

impl PackagingItemDraft {
    /// Checks every field and builds the typed packaging item.
    pub fn validate(self) -> CoreResult<NewPackagingItem> {
        let name = validation::validate_name("name", &self.name)?;
        validation::validate_non_negative_money("price", self.price)?;
        if self.stock_amount < 0 {
            return Err(ValidationError::MustNotBeNegative {
                field: "stock_amount".to_string(),
            }
            .into());
        }
        if let Some(capacity) = self.capacity_ml {
            validation::validate_positive_amount("capacity", capacity)?;
        }

        Ok(NewPackagingItem {
            name,
            item_type: self.item_type.trim().to_string(),
            material: self.material.trim().to_string(),
            description: self.description,
            price: self.price,
            stock_amount: self.stock_amount,
            capacity_ml: self.capacity_ml,
            color: normalize_notes(self.color),
            notes: normalize_notes(self.notes),
        })
    }
}

// =============================================================================
// Package Bundle
// =============================================================================

/// A named set of packaging items sold together with a recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PackageBundle {
    pub id: String,

    pub owner_id: Option<String>,

    pub name: String,

    pub description: String,

    /// Largest recipe volume the bundle can hold, in ml.
    #[serde(rename = "capacity")]
    pub capacity_ml: f64,

    /// Sum of the constituent item prices. Derived, never submitted.
    #[ts(type = "number")]
    pub total_price: Money,

    pub notes: Option<String>,

    /// Constituent packaging items.
    pub items: Vec<PackagingItem>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Package bundle as submitted by a client.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PackageBundleDraft {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(rename = "capacity", default)]
    pub capacity_ml: f64,

    #[serde(default)]
    pub notes: Option<String>,

    /// Ids of the packaging items to include.
    #[serde(default)]
    pub item_ids: Vec<String>,
}

/// A validated package bundle, ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPackageBundle {
    pub name: String,
    pub description: String,
    pub capacity_ml: f64,
    pub notes: Option<String>,
    pub item_ids: Vec<String>,
}

impl PackageBundleDraft {
    /// Checks every field and builds the typed bundle.
    ///
    /// Item ids must be distinct. Whether they exist is checked against
    /// storage by [`NewPackageBundle::resolve_items`].
    pub fn validate(self) -> CoreResult<NewPackageBundle> {
        let name = validation::validate_name("name", &self.name)?;
        validation::validate_positive_amount("capacity", self.capacity_ml)?;

        let mut seen = HashSet::new();
        let mut item_ids = Vec::with_capacity(self.item_ids.len());
        for raw in &self.item_ids {
            let id = validation::validate_id("item_ids", raw)?;
            if !seen.insert(id.clone()) {
                return Err(ValidationError::Duplicate {
                    field: "item_ids".to_string(),
                    value: id,
                }
                .into());
            }
            item_ids.push(id);
        }

        Ok(NewPackageBundle {
            name,
            description: self.description,
            capacity_ml: self.capacity_ml,
            notes: normalize_notes(self.notes),
            item_ids,
        })
    }
}

impl NewPackageBundle {
    /// Looks up every constituent item, preserving the submitted order.
    ///
    /// ## Errors
    /// `UnknownPackagingItem` for the first id the lookup does not hold.
    pub fn resolve_items<L>(&self, items: &L) -> CoreResult<Vec<PackagingItem>>
    where
        L: Lookup<PackagingItem> + ?Sized,
    {
        self.item_ids
            .iter()
            .map(|id| {
                items
                    .lookup(id)
                    .cloned()
                    .ok_or_else(|| CoreError::UnknownPackagingItem(id.clone()))
            })
            .collect()
    }
}

// =============================================================================
// Recipe
// =============================================================================

/// One ingredient line in a recipe. The amount is always in milliliters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RecipeIngredient {
    pub ingredient_id: String,
    pub amount_ml: f64,
}

/// A recipe entry with the ingredient record it points at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RecipeIngredientDetail {
    pub ingredient: Ingredient,
    pub amount_ml: f64,
}

/// A blend: ingredients in fixed amounts, filled into one package bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Recipe {
    pub id: String,

    pub owner_id: Option<String>,

    pub name: String,

    pub description: String,

    /// Declared volume of the finished product, in ml.
    pub total_volume_ml: f64,

    /// Suggested retail price.
    #[ts(type = "number | null")]
    pub retail_price: Option<Money>,

    pub notes: Option<String>,

    /// Sum of the ingredient line costs. Derived, never submitted.
    #[ts(type = "number")]
    pub total_cost: Money,

    pub package_bundle_id: String,

    pub ingredients: Vec<RecipeIngredient>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Recipe as submitted by a client.
///
/// Everything is optional or defaulted so that an incomplete form reaches
/// [`validate_recipe`](crate::validation::validate_recipe) and gets the full
/// list of problems back instead of a deserialization error.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RecipeDraft {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub total_volume_ml: f64,

    #[serde(default)]
    #[ts(type = "number | null")]
    pub retail_price: Option<Money>,

    #[serde(default)]
    pub notes: Option<String>,

    #[serde(default)]
    pub package_bundle_id: Option<String>,

    #[serde(default)]
    pub ingredients: Vec<RecipeIngredient>,
}

impl RecipeDraft {
    /// Trims the bundle id and every ingredient id.
    ///
    /// A bundle id that is blank after trimming becomes `None`.
    pub fn normalized(mut self) -> Self {
        self.package_bundle_id = self
            .package_bundle_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());
        for entry in &mut self.ingredients {
            let trimmed = entry.ingredient_id.trim();
            if trimmed.len() != entry.ingredient_id.len() {
                entry.ingredient_id = trimmed.to_string();
            }
        }
        self
    }

    /// Checks the per-field rules that are not recipe violations.
    ///
    /// Blank names, missing bundles, empty ingredient lists and non-positive
    /// volumes are reported by `validate_recipe` instead.
    pub fn validate_fields(&self) -> CoreResult<()> {
        if self.name.trim().chars().count() > crate::MAX_NAME_LEN {
            return Err(ValidationError::TooLong {
                field: "name".to_string(),
                max: crate::MAX_NAME_LEN,
            }
            .into());
        }
        if let Some(retail) = self.retail_price {
            validation::validate_non_negative_money("retail_price", retail)?;
        }

        let mut seen = HashSet::new();
        for entry in &self.ingredients {
            let id = validation::validate_id("ingredient_id", &entry.ingredient_id)?;
            validation::validate_positive_amount("amount_ml", entry.amount_ml)?;
            if !seen.insert(id.clone()) {
                return Err(ValidationError::Duplicate {
                    field: "ingredient_id".to_string(),
                    value: id,
                }
                .into());
            }
        }
        Ok(())
    }
}

/// A validated, costed recipe, ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecipe {
    pub name: String,
    pub description: String,
    pub total_volume_ml: f64,
    pub retail_price: Option<Money>,
    pub notes: Option<String>,
    pub total_cost: Money,
    pub package_bundle_id: String,
    pub ingredients: Vec<RecipeIngredient>,
}

// =============================================================================
// Identity
// =============================================================================

impl Identified for Ingredient {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Identified for PackagingItem {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Identified for PackageBundle {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Identified for Recipe {
    fn id(&self) -> &str {
        &self.id
    }
}

// =============================================================================
// Paging
// =============================================================================

/// Offset pagination for list operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub skip: u32,
    pub limit: u32,
}

impl Page {
    /// Builds a page from optional query parameters.
    ///
    /// `limit` defaults to [`DEFAULT_PAGE_LIMIT`] and is capped at
    /// [`MAX_PAGE_LIMIT`].
    pub fn new(skip: Option<u32>, limit: Option<u32>) -> Self {
        Page {
            skip: skip.unwrap_or(0),
            limit: limit.unwrap_or(DEFAULT_PAGE_LIMIT).min(MAX_PAGE_LIMIT),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Page::new(None, None)
    }
}

fn normalize_notes(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
