//! # Pricing
//!
//! Bundle pricing and recipe costing.
//!
//! ## Cost Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  PackagingItem.price ─┬─► bundle_total_price ──────────┐                │
//! │  PackagingItem.price ─┤                                │ packaging_cost │
//! │  PackagingItem.price ─┘                                ▼                │
//! │                                                  ┌───────────┐          │
//! │  amount_ml × price_per_unit ─┬─► recipe_total_cost ─►│ unit_cost │ ──► Margin
//! │  amount_ml × price_per_unit ─┘   (Recipe.total_cost) └───────────┘   vs retail
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each ingredient line is rounded once to the nearest micro-unit, then the
//! lines are summed as integers. The order of items or entries never changes
//! a total.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::lookup::Lookup;
use crate::money::Money;
use crate::types::{Ingredient, PackageBundle, PackagingItem, RecipeIngredient};

// =============================================================================
// Bundle Pricing
// =============================================================================

/// Sum of the item prices. Zero for an empty bundle.
///
/// ## Errors
/// `AmountOverflow` when the sum does not fit in [`Money`].
///
/// ## Example
/// ```rust
/// use aroma_core::pricing::bundle_total_price;
/// use aroma_core::Money;
///
/// let empty: Vec<aroma_core::PackagingItem> = Vec::new();
/// assert_eq!(bundle_total_price(&empty).unwrap(), Money::zero());
/// ```
pub fn bundle_total_price<'a, I>(items: I) -> CoreResult<Money>
where
    I: IntoIterator<Item = &'a PackagingItem>,
{
    items.into_iter().try_fold(Money::zero(), |total, item| {
        total.checked_add(item.price).ok_or_else(|| overflow("bundle total price"))
    })
}

// =============================================================================
// Recipe Costing
// =============================================================================

/// Cost of `amount_ml` of one ingredient.
pub fn line_cost(ingredient: &Ingredient, amount_ml: f64) -> CoreResult<Money> {
    ingredient
        .price_per_unit
        .multiply_ml(amount_ml)
        .ok_or_else(|| overflow(&format!("cost of {} ml of {}", amount_ml, ingredient.name)))
}

/// Sum of `amount_ml × price_per_unit` over the recipe entries.
///
/// ## Errors
/// - `UnknownIngredient` with the first id the lookup does not hold. No
///   partial sum is returned.
/// - `AmountOverflow` when a line or the total does not fit in [`Money`].
///
/// ## User Workflow
/// ```text
/// Entries: [lavender 3ml @ 0.85, almond 25ml @ 0.15]
///      │
///      ▼
/// 2.55 + 3.75 = 6.30  ──► Recipe.total_cost
/// ```
pub fn recipe_total_cost<L>(entries: &[RecipeIngredient], ingredients: &L) -> CoreResult<Money>
where
    L: Lookup<Ingredient> + ?Sized,
{
    let mut total = Money::zero();
    for entry in entries {
        let ingredient = ingredients
            .lookup(&entry.ingredient_id)
            .ok_or_else(|| CoreError::UnknownIngredient(entry.ingredient_id.clone()))?;
        total = total
            .checked_add(line_cost(ingredient, entry.amount_ml)?)
            .ok_or_else(|| overflow("recipe total cost"))?;
    }
    Ok(total)
}

fn overflow(what: &str) -> CoreError {
    CoreError::AmountOverflow {
        what: what.to_string(),
    }
}

// =============================================================================
// Cost Breakdown
// =============================================================================

/// What one finished unit of a recipe costs to make.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CostBreakdown {
    /// Ingredient-only cost, the value stored as `Recipe.total_cost`.
    #[ts(type = "number")]
    pub ingredients_cost: Money,

    /// Price of the package bundle.
    #[ts(type = "number")]
    pub packaging_cost: Money,

    /// `ingredients_cost + packaging_cost`.
    #[ts(type = "number")]
    pub unit_cost: Money,
}

/// Profit at a given retail price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Margin {
    /// Retail price minus unit cost. Negative when sold at a loss.
    #[ts(type = "number")]
    pub profit: Money,

    /// Profit as a percentage of the retail price; absent for a zero price.
    pub percent: Option<f64>,
}

impl CostBreakdown {
    /// Margin against `retail_price`, if one is set.
    pub fn margin(&self, retail_price: Option<Money>) -> Option<Margin> {
        retail_price.map(|retail| {
            let profit = retail - self.unit_cost;
            Margin {
                profit,
                percent: retail.percent_of(profit),
            }
        })
    }
}

/// Ingredient cost, packaging cost and their sum for one unit.
///
/// Without a bundle the packaging cost is zero.
pub fn recipe_cost_breakdown<L>(
    entries: &[RecipeIngredient],
    ingredients: &L,
    bundle: Option<&PackageBundle>,
) -> CoreResult<CostBreakdown>
where
    L: Lookup<Ingredient> + ?Sized,
{
    let ingredients_cost = recipe_total_cost(entries, ingredients)?;
    let packaging_cost = bundle
        .map(|b| bundle_total_price(&b.items))
        .transpose()?
        .unwrap_or_default();
    let unit_cost = ingredients_cost
        .checked_add(packaging_cost)
        .ok_or_else(|| overflow("unit cost"))?;

    Ok(CostBreakdown {
        ingredients_cost,
        packaging_cost,
        unit_cost,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::index_by_id;
    use crate::types::Measurement;
    use chrono::Utc;

    fn item(id: &str, price: Money) -> PackagingItem {
        PackagingItem {
            id: id.to_string(),
            owner_id: None,
            name: id.to_string(),
            item_type: "bottle".to_string(),
            material: "Glass".to_string(),
            description: String::new(),
            price,
            stock_amount: 10,
            capacity_ml: None,
            color: None,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn ingredient(id: &str, price_per_ml: Money) -> Ingredient {
        Ingredient {
            id: id.to_string(),
            owner_id: None,
            name: id.to_string(),
            category: "carrier oil".to_string(),
            description: String::new(),
            properties: String::new(),
            notes: None,
            measurement: Measurement::Milliliters,
            price_per_unit: price_per_ml,
            stock_amount: 0.0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn entry(id: &str, amount_ml: f64) -> RecipeIngredient {
        RecipeIngredient {
            ingredient_id: id.to_string(),
            amount_ml,
        }
    }

    fn bundle(items: Vec<PackagingItem>) -> PackageBundle {
        PackageBundle {
            id: "bundle".to_string(),
            owner_id: None,
            name: "Standard 30ml Package".to_string(),
            description: String::new(),
            capacity_ml: 30.0,
            total_price: bundle_total_price(&items).unwrap(),
            notes: None,
            items,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_bundle_total_price() {
        let items = vec![
            item("bottle", Money::from_decimal(2.00)),
            item("cap", Money::from_decimal(3.50)),
            item("label", Money::from_decimal(1.25)),
        ];
        assert_eq!(bundle_total_price(&items).unwrap(), Money::from_cents(675));

        let mut reversed = items.clone();
        reversed.reverse();
        assert_eq!(
            bundle_total_price(&reversed).unwrap(),
            bundle_total_price(&items).unwrap()
        );

        assert_eq!(bundle_total_price(&Vec::new()).unwrap(), Money::zero());
    }

    #[test]
    fn test_bundle_total_price_overflow_is_an_error() {
        let huge = Money::from_micros(i64::MAX / 2 + 1);
        let items = vec![item("crate", huge), item("pallet", huge)];
        assert!(matches!(
            bundle_total_price(&items),
            Err(CoreError::AmountOverflow { .. })
        ));

        let at_limit = vec![item("bottle", Money::MAX), item("cap", Money::MAX)];
        assert_eq!(
            bundle_total_price(&at_limit).unwrap().micros(),
            2 * Money::MAX.micros()
        );
    }

    #[test]
    fn test_recipe_cost_overflow_is_an_error() {
        let lookup = vec![ingredient("rose", Money::MAX)];
        let result = recipe_total_cost(&[entry("rose", 1e6)], &lookup);
        assert!(matches!(result, Err(CoreError::AmountOverflow { .. })));

        let result = recipe_cost_breakdown(&[entry("rose", 1e6)], &lookup, None);
        assert!(matches!(result, Err(CoreError::AmountOverflow { .. })));
    }

    #[test]
    fn test_recipe_total_cost() {
        let lookup = index_by_id(vec![
            ingredient("lavender", Money::from_decimal(0.85)),
            ingredient("almond", Money::from_decimal(0.15)),
        ]);
        let entries = vec![entry("lavender", 3.0), entry("almond", 25.0)];

        assert_eq!(recipe_total_cost(&entries, &lookup).unwrap(), Money::from_cents(630));
        assert_eq!(recipe_total_cost(&[], &lookup).unwrap(), Money::zero());
    }

    #[test]
    fn test_adding_an_entry_increases_cost() {
        let lookup = vec![
            ingredient("lavender", Money::from_decimal(0.85)),
            ingredient("jojoba", Money::from_decimal(0.35)),
        ];
        let mut entries = vec![entry("lavender", 2.0)];
        let before = recipe_total_cost(&entries, &lookup).unwrap();

        entries.push(entry("jojoba", 0.1));
        let after = recipe_total_cost(&entries, &lookup).unwrap();
        assert!(after > before);
    }

    #[test]
    fn test_sub_cent_lines_are_not_lost() {
        let lookup = vec![ingredient("almond", Money::from_decimal(0.0325))];
        let entries = vec![entry("almond", 0.4), entry("almond", 0.4)];
        // 2 × 0.013 = 0.026; rounding each line to cents would give 0.02
        assert_eq!(
            recipe_total_cost(&entries, &lookup).unwrap(),
            Money::from_micros(26_000)
        );
    }

    #[test]
    fn test_unknown_ingredient_fails_without_partial_sum() {
        let lookup = vec![ingredient("lavender", Money::from_decimal(0.85))];
        let entries = vec![entry("lavender", 3.0), entry("missing", 1.0)];

        match recipe_total_cost(&entries, &lookup) {
            Err(CoreError::UnknownIngredient(id)) => assert_eq!(id, "missing"),
            other => panic!("expected UnknownIngredient, got {:?}", other),
        }
    }

    #[test]
    fn test_cost_breakdown_and_margin() {
        let lookup = vec![ingredient("lavender", Money::from_decimal(0.85))];
        let entries = vec![entry("lavender", 10.0)];
        let packaging = bundle(vec![
            item("bottle", Money::from_decimal(2.50)),
            item("label", Money::from_decimal(0.50)),
        ]);

        let breakdown = recipe_cost_breakdown(&entries, &lookup, Some(&packaging)).unwrap();
        assert_eq!(breakdown.ingredients_cost, Money::from_cents(850));
        assert_eq!(breakdown.packaging_cost, Money::from_cents(300));
        assert_eq!(breakdown.unit_cost, Money::from_cents(1150));

        let margin = breakdown.margin(Some(Money::from_cents(2300))).unwrap();
        assert_eq!(margin.profit, Money::from_cents(1150));
        assert!((margin.percent.unwrap() - 50.0).abs() < 1e-9);

        assert!(breakdown.margin(None).is_none());
        assert!(breakdown.margin(Some(Money::zero())).unwrap().percent.is_none());
    }

    #[test]
    fn test_cost_breakdown_without_bundle() {
        let lookup = vec![ingredient("lavender", Money::from_decimal(0.85))];
        let breakdown =
            recipe_cost_breakdown(&[entry("lavender", 1.0)], &lookup, None).unwrap();
        assert_eq!(breakdown.packaging_cost, Money::zero());
        assert_eq!(breakdown.unit_cost, breakdown.ingredients_cost);
    }
}
