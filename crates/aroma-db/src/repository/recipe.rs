//! # Recipe Repository
//!
//! Database operations for recipes and their ingredient entries.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        create / update                                  │
//! │                                                                         │
//! │  RecipeDraft                                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  references(owner, draft)  ── bundle + ingredients, owner-scoped        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  aroma_core::accept_recipe(draft, bundles, ingredients, policy)         │
//! │       │   RecipeInvalid / Validation / UnknownIngredient /              │
//! │       │   InsufficientStock  ──► DbError::Core(..)                      │
//! │       ▼                                                                 │
//! │  BEGIN                                                                  │
//! │    INSERT/UPDATE recipes                                                │
//! │    DELETE + INSERT recipe_ingredients (position order)                  │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `total_cost` is the ingredient-only sum. It is stored on write and
//! recomputed from current ingredient prices on every read. A read whose
//! entries no longer resolve fails instead of returning the stored value.

use std::collections::HashMap;

use aroma_core::pricing::{recipe_cost_breakdown, recipe_total_cost, CostBreakdown};
use aroma_core::validation::{accept_recipe, assess_recipe, RecipeAssessment};
use aroma_core::{
    CapacityPolicy, CoreError, Ingredient, Money, NewRecipe, PackageBundle, Page, Recipe,
    RecipeDraft, RecipeIngredient, RecipeIngredientDetail, RecipeViolation,
};
use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, warn};

use super::ingredient::IngredientRepository;
use super::new_id;
use super::package_bundle::PackageBundleRepository;
use crate::error::{DbError, DbResult};
use crate::retry::{retry_read, RetryPolicy};

const ENTITY: &str = "Recipe";

const SELECT_RECIPE: &str = r#"
    SELECT
        id, owner_id, name, description, total_volume_ml, retail_price_micros,
        notes, package_bundle_id, created_at, updated_at
    FROM recipes
"#;

#[derive(Debug, sqlx::FromRow)]
struct RecipeRow {
    id: String,
    owner_id: Option<String>,
    name: String,
    description: String,
    total_volume_ml: f64,
    retail_price_micros: Option<Money>,
    notes: Option<String>,
    package_bundle_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RecipeRow {
    fn into_recipe(self, ingredients: Vec<RecipeIngredient>, total_cost: Money) -> Recipe {
        Recipe {
            id: self.id,
            owner_id: self.owner_id,
            name: self.name,
            description: self.description,
            total_volume_ml: self.total_volume_ml,
            retail_price: self.retail_price_micros,
            notes: self.notes,
            total_cost,
            package_bundle_id: self.package_bundle_id,
            ingredients,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// A stored recipe plus the capacity warnings the policy let through.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedRecipe {
    pub recipe: Recipe,
    pub warnings: Vec<RecipeViolation>,
}

/// The records a stored recipe points at, and its cost at current prices.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeDetails {
    pub package_bundle: PackageBundle,
    pub recipe_ingredients: Vec<RecipeIngredientDetail>,
    pub cost: CostBreakdown,
}

/// Repository for recipe database operations.
///
/// ## Usage
/// ```rust,ignore
/// let saved = db.recipes().create(None, draft, CapacityPolicy::Enforce).await?;
/// println!("{} costs {}", saved.recipe.name, saved.recipe.total_cost);
/// ```
#[derive(Debug, Clone)]
pub struct RecipeRepository {
    pool: SqlitePool,
    retry: RetryPolicy,
}

impl RecipeRepository {
    /// Creates a new RecipeRepository.
    pub fn new(pool: SqlitePool, retry: RetryPolicy) -> Self {
        RecipeRepository { pool, retry }
    }

    fn ingredients(&self) -> IngredientRepository {
        IngredientRepository::new(self.pool.clone(), self.retry.clone())
    }

    fn bundles(&self) -> PackageBundleRepository {
        PackageBundleRepository::new(self.pool.clone(), self.retry.clone())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Lists recipes in insertion order.
    pub async fn list(&self, owner: Option<&str>, page: Page) -> DbResult<Vec<Recipe>> {
        debug!(owner = ?owner, skip = page.skip, limit = page.limit, "Listing recipes");

        let sql = format!("{SELECT_RECIPE} WHERE owner_id IS ?1 ORDER BY rowid LIMIT ?2 OFFSET ?3");
        let (sql, pool) = (sql.as_str(), &self.pool);
        let rows = retry_read(&self.retry, "list_recipes", move || async move {
            sqlx::query_as::<_, RecipeRow>(sql)
                .bind(owner)
                .bind(i64::from(page.limit))
                .bind(i64::from(page.skip))
                .fetch_all(pool)
                .await
                .map_err(DbError::from)
        })
        .await?;

        let mut recipes = Vec::with_capacity(rows.len());
        for row in rows {
            recipes.push(self.hydrate(owner, row).await?);
        }
        Ok(recipes)
    }

    /// Gets a recipe by its ID, with its entries in the order they were saved.
    pub async fn get_by_id(&self, owner: Option<&str>, id: &str) -> DbResult<Option<Recipe>> {
        let sql = format!("{SELECT_RECIPE} WHERE id = ?1 AND owner_id IS ?2");
        let (sql, pool) = (sql.as_str(), &self.pool);
        let row = retry_read(&self.retry, "get_recipe", move || async move {
            sqlx::query_as::<_, RecipeRow>(sql)
                .bind(id)
                .bind(owner)
                .fetch_optional(pool)
                .await
                .map_err(DbError::from)
        })
        .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(owner, row).await?)),
            None => Ok(None),
        }
    }

    /// Gets a recipe by its ID, failing with `NotFound`.
    pub async fn get(&self, owner: Option<&str>, id: &str) -> DbResult<Recipe> {
        self.get_by_id(owner, id)
            .await?
            .ok_or_else(|| DbError::not_found(ENTITY, id))
    }

    /// Counts recipes for an owner.
    pub async fn count(&self, owner: Option<&str>) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM recipes WHERE owner_id IS ?1")
            .bind(owner)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Loads the bundle and ingredients a draft refers to.
    ///
    /// References the owner cannot see are left out, so the engine reports
    /// them as missing.
    pub async fn references(
        &self,
        owner: Option<&str>,
        draft: &RecipeDraft,
    ) -> DbResult<(Vec<PackageBundle>, HashMap<String, Ingredient>)> {
        let bundle_id = draft
            .package_bundle_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty());

        let bundles = self
            .bundles()
            .find_many(owner, bundle_id)
            .await?
            .into_values()
            .collect();

        let ids: Vec<&str> = draft.ingredients.iter().map(|e| e.ingredient_id.trim()).collect();
        let ingredients = self.ingredients().find_many(owner, ids).await?;

        Ok((bundles, ingredients))
    }

    /// Runs every write-time check on a draft without storing anything.
    pub async fn assess(
        &self,
        owner: Option<&str>,
        draft: &RecipeDraft,
        policy: CapacityPolicy,
    ) -> DbResult<RecipeAssessment> {
        let (bundles, ingredients) = self.references(owner, draft).await?;
        Ok(assess_recipe(draft, &bundles, &ingredients, policy))
    }

    /// Ingredient cost, packaging cost and unit cost of a stored recipe at
    /// current prices.
    pub async fn cost_breakdown(&self, owner: Option<&str>, recipe: &Recipe) -> DbResult<CostBreakdown> {
        Ok(self.details(owner, recipe).await?.cost)
    }

    /// Loads the bundle and ingredient records of a stored recipe and costs
    /// it at their current prices.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - The bundle is not visible to this owner
    /// * `Err(DbError::Core(CoreError::UnknownIngredient(_)))` - An entry's
    ///   ingredient is not visible to this owner
    pub async fn details(&self, owner: Option<&str>, recipe: &Recipe) -> DbResult<RecipeDetails> {
        let package_bundle = self.bundles().get(owner, &recipe.package_bundle_id).await?;
        let ids: Vec<&str> = recipe.ingredients.iter().map(|e| e.ingredient_id.as_str()).collect();
        let ingredients = self.ingredients().find_many(owner, ids).await?;
        let cost = recipe_cost_breakdown(&recipe.ingredients, &ingredients, Some(&package_bundle))?;

        let recipe_ingredients = recipe
            .ingredients
            .iter()
            .map(|entry| -> DbResult<RecipeIngredientDetail> {
                let ingredient = ingredients
                    .get(&entry.ingredient_id)
                    .cloned()
                    .ok_or_else(|| CoreError::UnknownIngredient(entry.ingredient_id.clone()))?;
                Ok(RecipeIngredientDetail {
                    ingredient,
                    amount_ml: entry.amount_ml,
                })
            })
            .collect::<DbResult<Vec<_>>>()?;

        Ok(RecipeDetails {
            package_bundle,
            recipe_ingredients,
            cost,
        })
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Validates, costs and inserts a new recipe with its entries.
    ///
    /// ## Returns
    /// * `Ok(SavedRecipe)` - Stored recipe, plus capacity warnings under
    ///   `CapacityPolicy::Warn`
    /// * `Err(DbError::Core(CoreError::RecipeInvalid(_)))` - Blocking violations
    /// * `Err(DbError::Core(_))` - Field, ingredient or stock failure
    /// * `Err(DbError::DuplicateName)` - Name already used by this owner
    pub async fn create(
        &self,
        owner: Option<&str>,
        draft: RecipeDraft,
        policy: CapacityPolicy,
    ) -> DbResult<SavedRecipe> {
        let (bundles, ingredients) = self.references(owner, &draft).await?;
        let accepted = accept_recipe(draft, &bundles, &ingredients, policy)?;
        let new = accepted.recipe;
        let id = new_id();
        let now = Utc::now();

        if !accepted.warnings.is_empty() {
            warn!(id = %id, warnings = accepted.warnings.len(), "Saving recipe with capacity warnings");
        }
        debug!(id = %id, name = %new.name, total_cost = %new.total_cost, "Inserting recipe");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO recipes (
                id, owner_id, name, description, total_volume_ml, retail_price_micros,
                notes, total_cost_micros, package_bundle_id, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
            "#,
        )
        .bind(&id)
        .bind(owner)
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.total_volume_ml)
        .bind(new.retail_price)
        .bind(&new.notes)
        .bind(new.total_cost)
        .bind(&new.package_bundle_id)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| DbError::from(e).on_duplicate(ENTITY, &new.name))?;

        insert_entries(&mut tx, &id, &new.ingredients).await?;
        tx.commit().await?;

        Ok(SavedRecipe {
            recipe: into_record(id, owner, new, now, now),
            warnings: accepted.warnings,
        })
    }

    /// Validates, costs and replaces a recipe, including all its entries.
    pub async fn update(
        &self,
        owner: Option<&str>,
        id: &str,
        draft: RecipeDraft,
        policy: CapacityPolicy,
    ) -> DbResult<SavedRecipe> {
        let created_at = self.created_at(owner, id).await?;

        let (bundles, ingredients) = self.references(owner, &draft).await?;
        let accepted = accept_recipe(draft, &bundles, &ingredients, policy)?;
        let new = accepted.recipe;
        let now = Utc::now();

        debug!(id = %id, name = %new.name, total_cost = %new.total_cost, "Updating recipe");

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE recipes SET
                name = ?3,
                description = ?4,
                total_volume_ml = ?5,
                retail_price_micros = ?6,
                notes = ?7,
                total_cost_micros = ?8,
                package_bundle_id = ?9,
                updated_at = ?10
            WHERE id = ?1 AND owner_id IS ?2
            "#,
        )
        .bind(id)
        .bind(owner)
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.total_volume_ml)
        .bind(new.retail_price)
        .bind(&new.notes)
        .bind(new.total_cost)
        .bind(&new.package_bundle_id)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| DbError::from(e).on_duplicate(ENTITY, &new.name))?;

        // deleted between the lookup and the write
        if result.rows_affected() == 0 {
            return Err(DbError::not_found(ENTITY, id));
        }

        sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        insert_entries(&mut tx, id, &new.ingredients).await?;
        tx.commit().await?;

        Ok(SavedRecipe {
            recipe: into_record(id.to_string(), owner, new, created_at, now),
            warnings: accepted.warnings,
        })
    }

    /// Deletes a recipe. Its ingredient entries go with it.
    pub async fn delete(&self, owner: Option<&str>, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting recipe");

        let result = sqlx::query("DELETE FROM recipes WHERE id = ?1 AND owner_id IS ?2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(ENTITY, id));
        }

        Ok(())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn created_at(&self, owner: Option<&str>, id: &str) -> DbResult<DateTime<Utc>> {
        sqlx::query_scalar::<_, DateTime<Utc>>(
            "SELECT created_at FROM recipes WHERE id = ?1 AND owner_id IS ?2",
        )
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found(ENTITY, id))
    }

    async fn load_entries(&self, recipe_id: &str) -> DbResult<Vec<RecipeIngredient>> {
        let pool = &self.pool;
        let rows = retry_read(&self.retry, "load_recipe_entries", move || async move {
            sqlx::query_as::<_, (String, f64)>(
                "SELECT ingredient_id, amount_ml FROM recipe_ingredients WHERE recipe_id = ?1 ORDER BY position",
            )
            .bind(recipe_id)
            .fetch_all(pool)
            .await
            .map_err(DbError::from)
        })
        .await?;

        Ok(rows
            .into_iter()
            .map(|(ingredient_id, amount_ml)| RecipeIngredient {
                ingredient_id,
                amount_ml,
            })
            .collect())
    }

    async fn hydrate(&self, owner: Option<&str>, row: RecipeRow) -> DbResult<Recipe> {
        let entries = self.load_entries(&row.id).await?;
        let ids: Vec<&str> = entries.iter().map(|e| e.ingredient_id.as_str()).collect();
        let ingredients = self.ingredients().find_many(owner, ids).await?;

        let total_cost = recipe_total_cost(&entries, &ingredients).map_err(|e| {
            warn!(id = %row.id, error = %e, "Cannot cost stored recipe");
            e
        })?;

        Ok(row.into_recipe(entries, total_cost))
    }
}

async fn insert_entries(
    tx: &mut Transaction<'_, Sqlite>,
    recipe_id: &str,
    entries: &[RecipeIngredient],
) -> DbResult<()> {
    for (position, entry) in entries.iter().enumerate() {
        sqlx::query(
            "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount_ml, position) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(recipe_id)
        .bind(&entry.ingredient_id)
        .bind(entry.amount_ml)
        .bind(position as i64)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

fn into_record(
    id: String,
    owner: Option<&str>,
    new: NewRecipe,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
) -> Recipe {
    Recipe {
        id,
        owner_id: owner.map(str::to_string),
        name: new.name,
        description: new.description,
        total_volume_ml: new.total_volume_ml,
        retail_price: new.retail_price,
        notes: new.notes,
        total_cost: new.total_cost,
        package_bundle_id: new.package_bundle_id,
        ingredients: new.ingredients,
        created_at,
        updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures;
    use crate::Database;
    use aroma_core::CoreError;

    struct Catalog {
        db: Database,
        lavender: Ingredient,
        almond: Ingredient,
        bundle: PackageBundle,
    }

    /// Lavender (drops, 0.85/ml, 100 drops = 5ml on hand), sweet almond
    /// (ml, 0.15/ml, 500ml) and a 30ml bundle holding one 2.50 bottle.
    async fn catalog() -> Catalog {
        let db = fixtures::db().await;
        let lavender = db
            .ingredients()
            .create(None, fixtures::drops_ingredient("Lavender", 0.85, 100.0))
            .await
            .unwrap();
        let almond = db
            .ingredients()
            .create(None, fixtures::ml_ingredient("Sweet Almond", 0.15, 500.0))
            .await
            .unwrap();
        let bottle = db
            .packaging_items()
            .create(None, fixtures::packaging_item("Amber Glass Bottle", 2.50))
            .await
            .unwrap();
        let bundle = db
            .package_bundles()
            .create(None, fixtures::bundle("Standard 30ml", 30.0, vec![bottle.id]))
            .await
            .unwrap();

        Catalog {
            db,
            lavender,
            almond,
            bundle,
        }
    }

    #[tokio::test]
    async fn test_create_computes_total_cost() {
        let c = catalog().await;
        let draft = fixtures::recipe(
            "Relaxing Sleep Blend",
            &c.bundle.id,
            28.0,
            &[(c.lavender.id.as_str(), 3.0), (c.almond.id.as_str(), 25.0)],
        );

        let saved = c.db.recipes().create(None, draft, CapacityPolicy::Enforce).await.unwrap();
        assert!(saved.warnings.is_empty());
        // 3 × 0.85 + 25 × 0.15
        assert_eq!(saved.recipe.total_cost, Money::from_cents(630));

        let fetched = c.db.recipes().get(None, &saved.recipe.id).await.unwrap();
        assert_eq!(fetched.total_cost, Money::from_cents(630));
        assert_eq!(fetched.ingredients.len(), 2);
        assert_eq!(fetched.ingredients[0].ingredient_id, c.lavender.id);
        assert_eq!(fetched.ingredients[1].amount_ml, 25.0);
    }

    #[tokio::test]
    async fn test_total_cost_follows_ingredient_price() {
        let c = catalog().await;
        let draft = fixtures::recipe("Carrier Only", &c.bundle.id, 20.0, &[(c.almond.id.as_str(), 20.0)]);
        let saved = c.db.recipes().create(None, draft, CapacityPolicy::Enforce).await.unwrap();
        assert_eq!(saved.recipe.total_cost, Money::from_cents(300));

        c.db.ingredients()
            .update(None, &c.almond.id, fixtures::ml_ingredient("Sweet Almond", 0.20, 500.0))
            .await
            .unwrap();

        let listed = c.db.recipes().list(None, Page::default()).await.unwrap();
        assert_eq!(listed[0].total_cost, Money::from_cents(400));
    }

    #[tokio::test]
    async fn test_over_capacity_is_blocked_when_enforced() {
        let c = catalog().await;
        let draft = fixtures::recipe("Too Big", &c.bundle.id, 50.0, &[(c.almond.id.as_str(), 50.0)]);

        let err = c.db.recipes().create(None, draft, CapacityPolicy::Enforce).await.unwrap_err();
        match err {
            DbError::Core(CoreError::RecipeInvalid(violations)) => {
                assert_eq!(violations.len(), 1);
                assert!(matches!(violations[0], RecipeViolation::VolumeExceedsCapacity { .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(c.db.recipes().count(None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_over_capacity_is_saved_with_warning() {
        let c = catalog().await;
        let draft = fixtures::recipe("Too Big", &c.bundle.id, 50.0, &[(c.almond.id.as_str(), 50.0)]);

        let saved = c.db.recipes().create(None, draft, CapacityPolicy::Warn).await.unwrap();
        assert_eq!(saved.warnings.len(), 1);
        assert_eq!(c.db.recipes().count(None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_structural_violations_are_collected() {
        let c = catalog().await;
        let draft = RecipeDraft {
            name: "  ".to_string(),
            ..RecipeDraft::default()
        };

        let err = c.db.recipes().create(None, draft, CapacityPolicy::Warn).await.unwrap_err();
        match err {
            DbError::Core(CoreError::RecipeInvalid(violations)) => {
                let codes: Vec<_> = violations.iter().map(RecipeViolation::code).collect();
                assert_eq!(
                    codes,
                    vec!["EMPTY_NAME", "NO_PACKAGE_BUNDLE", "NO_INGREDIENTS", "NON_POSITIVE_VOLUME"]
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_insufficient_stock() {
        let c = catalog().await;
        // 5ml of lavender on hand
        let draft = fixtures::recipe("Strong", &c.bundle.id, 10.0, &[(c.lavender.id.as_str(), 10.0)]);

        let err = c.db.recipes().create(None, draft, CapacityPolicy::Enforce).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::InsufficientStock { .. })));
    }

    #[tokio::test]
    async fn test_unknown_ingredient() {
        let c = catalog().await;
        let missing = uuid::Uuid::new_v4().to_string();
        let draft = fixtures::recipe("Mystery", &c.bundle.id, 10.0, &[(missing.as_str(), 10.0)]);

        let err = c.db.recipes().create(None, draft, CapacityPolicy::Enforce).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::UnknownIngredient(id)) if id == missing));
    }

    #[tokio::test]
    async fn test_update_replaces_entries() {
        let c = catalog().await;
        let repo = c.db.recipes();
        let saved = repo
            .create(
                None,
                fixtures::recipe("Blend", &c.bundle.id, 28.0, &[(c.lavender.id.as_str(), 3.0), (c.almond.id.as_str(), 25.0)]),
                CapacityPolicy::Enforce,
            )
            .await
            .unwrap();

        let updated = repo
            .update(
                None,
                &saved.recipe.id,
                fixtures::recipe("Blend", &c.bundle.id, 10.0, &[(c.almond.id.as_str(), 10.0)]),
                CapacityPolicy::Enforce,
            )
            .await
            .unwrap();
        assert_eq!(updated.recipe.total_cost, Money::from_cents(150));

        let fetched = repo.get(None, &saved.recipe.id).await.unwrap();
        assert_eq!(fetched.ingredients.len(), 1);
        assert_eq!(fetched.total_volume_ml, 10.0);

        // lavender is no longer referenced
        c.db.ingredients().delete(None, &c.lavender.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let c = catalog().await;
        let draft = fixtures::recipe("Blend", &c.bundle.id, 10.0, &[(c.almond.id.as_str(), 10.0)]);
        let err = c
            .db
            .recipes()
            .update(None, "missing", draft, CapacityPolicy::Enforce)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_references_block_deletes_until_recipe_is_gone() {
        let c = catalog().await;
        let saved = c
            .db
            .recipes()
            .create(
                None,
                fixtures::recipe("Blend", &c.bundle.id, 10.0, &[(c.almond.id.as_str(), 10.0)]),
                CapacityPolicy::Enforce,
            )
            .await
            .unwrap();

        let err = c.db.ingredients().delete(None, &c.almond.id).await.unwrap_err();
        assert!(matches!(err, DbError::InUse { .. }));
        let err = c.db.package_bundles().delete(None, &c.bundle.id).await.unwrap_err();
        assert!(matches!(err, DbError::InUse { .. }));

        c.db.recipes().delete(None, &saved.recipe.id).await.unwrap();

        let entries: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM recipe_ingredients")
            .fetch_one(c.db.pool())
            .await
            .unwrap();
        assert_eq!(entries, 0);

        c.db.ingredients().delete(None, &c.almond.id).await.unwrap();
        c.db.package_bundles().delete(None, &c.bundle.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_other_owners_references_are_invisible() {
        let c = catalog().await;
        let draft = fixtures::recipe("Borrowed", &c.bundle.id, 10.0, &[(c.almond.id.as_str(), 10.0)]);

        let err = c
            .db
            .recipes()
            .create(Some("mallory"), draft, CapacityPolicy::Enforce)
            .await
            .unwrap_err();
        match err {
            DbError::Core(CoreError::RecipeInvalid(violations)) => {
                assert!(matches!(violations[0], RecipeViolation::NoPackageBundle { .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unresolvable_entry_fails_the_read() {
        let c = catalog().await;
        let saved = c
            .db
            .recipes()
            .create(
                None,
                fixtures::recipe("Blend", &c.bundle.id, 10.0, &[(c.almond.id.as_str(), 10.0)]),
                CapacityPolicy::Enforce,
            )
            .await
            .unwrap();

        // moved to another owner behind the repository's back; the link stays valid
        sqlx::query("UPDATE ingredients SET owner_id = 'alice' WHERE id = ?1")
            .bind(&c.almond.id)
            .execute(c.db.pool())
            .await
            .unwrap();

        let err = c.db.recipes().get(None, &saved.recipe.id).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::UnknownIngredient(ref id)) if *id == c.almond.id));
        let err = c.db.recipes().list(None, Page::default()).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::UnknownIngredient(_))));
        let err = c.db.recipes().cost_breakdown(None, &saved.recipe).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::UnknownIngredient(_))));
    }

    #[tokio::test]
    async fn test_details_embed_bundle_and_ingredients() {
        let c = catalog().await;
        let draft = fixtures::recipe(
            "Blend",
            &c.bundle.id,
            28.0,
            &[(c.lavender.id.as_str(), 3.0), (c.almond.id.as_str(), 25.0)],
        );
        let saved = c.db.recipes().create(None, draft, CapacityPolicy::Enforce).await.unwrap();

        let details = c.db.recipes().details(None, &saved.recipe).await.unwrap();
        assert_eq!(details.package_bundle.id, c.bundle.id);
        assert_eq!(details.package_bundle.items.len(), 1);
        let names: Vec<_> = details
            .recipe_ingredients
            .iter()
            .map(|d| d.ingredient.name.as_str())
            .collect();
        assert_eq!(names, vec!["Lavender", "Sweet Almond"]);
        assert_eq!(details.recipe_ingredients[1].amount_ml, 25.0);
        assert_eq!(details.cost.unit_cost, Money::from_cents(880));
    }

    #[tokio::test]
    async fn test_padded_ids_are_stored_trimmed() {
        let c = catalog().await;
        let bundle_id = format!(" {} ", c.bundle.id);
        let almond_id = format!("  {}", c.almond.id);
        let draft = fixtures::recipe("Padded", &bundle_id, 10.0, &[(almond_id.as_str(), 10.0)]);

        let saved = c.db.recipes().create(None, draft, CapacityPolicy::Enforce).await.unwrap();
        assert_eq!(saved.recipe.total_cost, Money::from_cents(150));
        assert_eq!(saved.recipe.package_bundle_id, c.bundle.id);
        assert_eq!(saved.recipe.ingredients[0].ingredient_id, c.almond.id);

        let fetched = c.db.recipes().get(None, &saved.recipe.id).await.unwrap();
        assert_eq!(fetched.total_cost, Money::from_cents(150));
    }

    #[tokio::test]
    async fn test_assess_and_cost_breakdown() {
        let c = catalog().await;
        let draft = fixtures::recipe("Blend", &c.bundle.id, 28.0, &[(c.lavender.id.as_str(), 3.0), (c.almond.id.as_str(), 25.0)]);

        let assessment = c.db.recipes().assess(None, &draft, CapacityPolicy::Enforce).await.unwrap();
        assert!(assessment.accepted);
        let cost = assessment.cost.unwrap();
        assert_eq!(cost.ingredients_cost, Money::from_cents(630));
        assert_eq!(cost.packaging_cost, Money::from_cents(250));
        assert_eq!(cost.unit_cost, Money::from_cents(880));
        assert_eq!(c.db.recipes().count(None).await.unwrap(), 0);

        let saved = c.db.recipes().create(None, draft, CapacityPolicy::Enforce).await.unwrap();
        let breakdown = c.db.recipes().cost_breakdown(None, &saved.recipe).await.unwrap();
        assert_eq!(breakdown, cost);
        let margin = breakdown.margin(saved.recipe.retail_price).unwrap();
        assert_eq!(margin.profit, Money::from_cents(4500 - 880));
    }
}
