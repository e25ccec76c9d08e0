//! # Ingredient Repository
//!
//! Database operations for ingredients.
//!
//! ## Storage Shape
//! ```text
//! ┌──────────────────────────────┐          ┌─────────────────────────────┐
//! │ ingredients (row)            │          │ Ingredient (domain)         │
//! │  measurement_type  'drops'   │ ───────► │  measurement: Drops {       │
//! │  drops_per_ml      20.0      │ TryFrom  │     drops_per_ml: 20.0 }    │
//! │  price_per_unit_micros 850000│          │  price_per_unit: 0.85       │
//! └──────────────────────────────┘          └─────────────────────────────┘
//! ```
//!
//! A row that cannot be turned back into a typed measurement is reported as
//! `DbError::Internal`; the schema's CHECK constraints make that unreachable
//! for rows written through this repository.

use std::collections::HashMap;

use aroma_core::{Ingredient, IngredientDraft, Measurement, MeasurementKind, Money, NewIngredient, Page};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use super::new_id;
use crate::error::{DbError, DbResult};
use crate::retry::{retry_read, RetryPolicy};

const ENTITY: &str = "Ingredient";

const SELECT_INGREDIENT: &str = r#"
    SELECT
        id, owner_id, name, category, description, properties, notes,
        measurement_type, drops_per_ml, price_per_unit_micros, stock_amount,
        created_at, updated_at
    FROM ingredients
"#;

#[derive(Debug, sqlx::FromRow)]
struct IngredientRow {
    id: String,
    owner_id: Option<String>,
    name: String,
    category: String,
    description: String,
    properties: String,
    notes: Option<String>,
    measurement_type: String,
    drops_per_ml: Option<f64>,
    price_per_unit_micros: Money,
    stock_amount: f64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<IngredientRow> for Ingredient {
    type Error = DbError;

    fn try_from(row: IngredientRow) -> Result<Self, Self::Error> {
        let measurement = row
            .measurement_type
            .parse::<MeasurementKind>()
            .and_then(|kind| Measurement::from_parts(kind, row.drops_per_ml))
            .map_err(|e| DbError::Internal(format!("ingredient {}: {}", row.id, e)))?;

        Ok(Ingredient {
            id: row.id,
            owner_id: row.owner_id,
            name: row.name,
            category: row.category,
            description: row.description,
            properties: row.properties,
            notes: row.notes,
            measurement,
            price_per_unit: row.price_per_unit_micros,
            stock_amount: row.stock_amount,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for ingredient database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.ingredients();
///
/// let lavender = repo.create(None, draft).await?;
/// let all = repo.list(None, Page::default()).await?;
/// ```
#[derive(Debug, Clone)]
pub struct IngredientRepository {
    pool: SqlitePool,
    retry: RetryPolicy,
}

impl IngredientRepository {
    /// Creates a new IngredientRepository.
    pub fn new(pool: SqlitePool, retry: RetryPolicy) -> Self {
        IngredientRepository { pool, retry }
    }

    /// Lists ingredients in insertion order.
    pub async fn list(&self, owner: Option<&str>, page: Page) -> DbResult<Vec<Ingredient>> {
        debug!(owner = ?owner, skip = page.skip, limit = page.limit, "Listing ingredients");

        let sql = format!("{SELECT_INGREDIENT} WHERE owner_id IS ?1 ORDER BY rowid LIMIT ?2 OFFSET ?3");
        let (sql, pool) = (sql.as_str(), &self.pool);
        let rows = retry_read(&self.retry, "list_ingredients", move || async move {
            sqlx::query_as::<_, IngredientRow>(sql)
                .bind(owner)
                .bind(i64::from(page.limit))
                .bind(i64::from(page.skip))
                .fetch_all(pool)
                .await
                .map_err(DbError::from)
        })
        .await?;

        rows.into_iter().map(Ingredient::try_from).collect()
    }

    /// Gets an ingredient by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Ingredient))` - Ingredient found
    /// * `Ok(None)` - Not found, or owned by someone else
    pub async fn get_by_id(&self, owner: Option<&str>, id: &str) -> DbResult<Option<Ingredient>> {
        let sql = format!("{SELECT_INGREDIENT} WHERE id = ?1 AND owner_id IS ?2");
        let (sql, pool) = (sql.as_str(), &self.pool);
        let row = retry_read(&self.retry, "get_ingredient", move || async move {
            sqlx::query_as::<_, IngredientRow>(sql)
                .bind(id)
                .bind(owner)
                .fetch_optional(pool)
                .await
                .map_err(DbError::from)
        })
        .await?;

        row.map(Ingredient::try_from).transpose()
    }

    /// Gets an ingredient by its ID, failing with `NotFound`.
    pub async fn get(&self, owner: Option<&str>, id: &str) -> DbResult<Ingredient> {
        self.get_by_id(owner, id)
            .await?
            .ok_or_else(|| DbError::not_found(ENTITY, id))
    }

    /// Loads the ingredients with the given ids, keyed by id.
    ///
    /// Unknown ids are left out; the engine reports them when it looks them up.
    pub async fn find_many<'a, I>(&self, owner: Option<&str>, ids: I) -> DbResult<HashMap<String, Ingredient>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut found = HashMap::new();
        for id in ids {
            if found.contains_key(id) {
                continue;
            }
            if let Some(ingredient) = self.get_by_id(owner, id).await? {
                found.insert(ingredient.id.clone(), ingredient);
            }
        }
        Ok(found)
    }

    /// Counts ingredients for an owner.
    pub async fn count(&self, owner: Option<&str>) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ingredients WHERE owner_id IS ?1")
            .bind(owner)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Validates and inserts a new ingredient.
    ///
    /// ## Returns
    /// * `Ok(Ingredient)` - Stored ingredient with generated id and timestamps
    /// * `Err(DbError::Core(_))` - Draft failed validation
    /// * `Err(DbError::DuplicateName)` - Name already used by this owner
    pub async fn create(&self, owner: Option<&str>, draft: IngredientDraft) -> DbResult<Ingredient> {
        let new = draft.validate()?;
        let id = new_id();
        let now = Utc::now();

        debug!(id = %id, name = %new.name, "Inserting ingredient");

        sqlx::query(
            r#"
            INSERT INTO ingredients (
                id, owner_id, name, category, description, properties, notes,
                measurement_type, drops_per_ml, price_per_unit_micros, stock_amount,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)
            "#,
        )
        .bind(&id)
        .bind(owner)
        .bind(&new.name)
        .bind(&new.category)
        .bind(&new.description)
        .bind(&new.properties)
        .bind(&new.notes)
        .bind(new.measurement.kind().as_str())
        .bind(new.measurement.drops_per_ml())
        .bind(new.price_per_unit)
        .bind(new.stock_amount)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from(e).on_duplicate(ENTITY, &new.name))?;

        Ok(into_record(id, owner, new, now, now))
    }

    /// Validates and replaces an existing ingredient.
    ///
    /// Recipes using the ingredient pick up the new price the next time they
    /// are read.
    pub async fn update(&self, owner: Option<&str>, id: &str, draft: IngredientDraft) -> DbResult<Ingredient> {
        let new = draft.validate()?;
        let now = Utc::now();

        debug!(id = %id, name = %new.name, "Updating ingredient");

        let result = sqlx::query(
            r#"
            UPDATE ingredients SET
                name = ?3,
                category = ?4,
                description = ?5,
                properties = ?6,
                notes = ?7,
                measurement_type = ?8,
                drops_per_ml = ?9,
                price_per_unit_micros = ?10,
                stock_amount = ?11,
                updated_at = ?12
            WHERE id = ?1 AND owner_id IS ?2
            "#,
        )
        .bind(id)
        .bind(owner)
        .bind(&new.name)
        .bind(&new.category)
        .bind(&new.description)
        .bind(&new.properties)
        .bind(&new.notes)
        .bind(new.measurement.kind().as_str())
        .bind(new.measurement.drops_per_ml())
        .bind(new.price_per_unit)
        .bind(new.stock_amount)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from(e).on_duplicate(ENTITY, &new.name))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(ENTITY, id));
        }

        self.get(owner, id).await
    }

    /// Deletes an ingredient.
    ///
    /// ## Returns
    /// * `Err(DbError::InUse)` - A recipe still uses it
    /// * `Err(DbError::NotFound)` - No such ingredient for this owner
    pub async fn delete(&self, owner: Option<&str>, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting ingredient");

        let result = sqlx::query("DELETE FROM ingredients WHERE id = ?1 AND owner_id IS ?2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await
            .map_err(|e| DbError::from(e).on_restrict(ENTITY, id))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(ENTITY, id));
        }

        Ok(())
    }
}

fn into_record(
    id: String,
    owner: Option<&str>,
    new: NewIngredient,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
) -> Ingredient {
    Ingredient {
        id,
        owner_id: owner.map(str::to_string),
        name: new.name,
        category: new.category,
        description: new.description,
        properties: new.properties,
        notes: new.notes,
        measurement: new.measurement,
        price_per_unit: new.price_per_unit,
        stock_amount: new.stock_amount,
        created_at,
        updated_at,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
