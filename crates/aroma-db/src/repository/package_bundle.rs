//! # Package Bundle Repository
//!
//! Database operations for package bundles and their item links.
//!
//! ## Storage Shape
//! ```text
//! ┌──────────────────┐     ┌────────────────────────┐     ┌──────────────────┐
//! │ package_bundles  │ 1─* │ package_bundle_items   │ *─1 │ packaging_items  │
//! │  id, capacity_ml │     │  bundle_id  (CASCADE)  │     │  id, price       │
//! │  total_price     │     │  item_id    (RESTRICT) │     │                  │
//! └──────────────────┘     │  position              │     └──────────────────┘
//!                          └────────────────────────┘
//! ```
//!
//! The bundle and its links are written in one transaction. `total_price` is
//! stored at write time and recomputed from the current item prices whenever
//! a bundle is read, so a price change on an item shows up immediately.
//!
//! An update that lowers `capacity_ml` is checked against the recipes filled
//! into the bundle in the same transaction:
//!
//! ```text
//! UPDATE package_bundles SET capacity_ml = 10
//!      │
//!      ▼
//! SELECT MAX(total_volume_ml) FROM recipes WHERE package_bundle_id = ?   ── 28
//!      │
//!      ├── Enforce ──► RecipeInvalid(VolumeExceedsCapacity), ROLLBACK
//!      └── Warn ─────► COMMIT, violation returned as a warning
//! ```

use std::collections::HashMap;

use aroma_core::pricing::bundle_total_price;
use aroma_core::validation::check_bundle_capacity;
use aroma_core::{
    CapacityPolicy, NewPackageBundle, PackageBundle, PackageBundleDraft, PackagingItem, Page,
    RecipeViolation,
};
use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, warn};

use super::new_id;
use super::packaging_item::{PackagingItemRepository, PackagingItemRow, SELECT_PACKAGING_ITEM};
use crate::error::{DbError, DbResult};
use crate::retry::{retry_read, RetryPolicy};

const ENTITY: &str = "PackageBundle";

const SELECT_BUNDLE: &str = r#"
    SELECT
        id, owner_id, name, description, capacity_ml, notes, created_at, updated_at
    FROM package_bundles
"#;

#[derive(Debug, sqlx::FromRow)]
struct BundleRow {
    id: String,
    owner_id: Option<String>,
    name: String,
    description: String,
    capacity_ml: f64,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BundleRow {
    fn into_bundle(self, items: Vec<PackagingItem>) -> DbResult<PackageBundle> {
        Ok(PackageBundle {
            id: self.id,
            owner_id: self.owner_id,
            name: self.name,
            description: self.description,
            capacity_ml: self.capacity_ml,
            total_price: bundle_total_price(&items)?,
            notes: self.notes,
            items,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// An updated bundle plus the recipes that no longer fit, when the policy
/// lets the update through anyway.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedBundle {
    pub bundle: PackageBundle,
    pub warnings: Vec<RecipeViolation>,
}

/// Repository for package bundle database operations.
///
/// ## Usage
/// ```rust,ignore
/// let bundle = db
///     .package_bundles()
///     .create(None, PackageBundleDraft { item_ids: vec![bottle.id, cap.id], ..draft })
///     .await?;
/// assert_eq!(bundle.total_price, bottle.price + cap.price);
/// ```
#[derive(Debug, Clone)]
pub struct PackageBundleRepository {
    pool: SqlitePool,
    retry: RetryPolicy,
}

impl PackageBundleRepository {
    /// Creates a new PackageBundleRepository.
    pub fn new(pool: SqlitePool, retry: RetryPolicy) -> Self {
        PackageBundleRepository { pool, retry }
    }

    fn items(&self) -> PackagingItemRepository {
        PackagingItemRepository::new(self.pool.clone(), self.retry.clone())
    }

    /// Lists bundles in insertion order, each with its items.
    pub async fn list(&self, owner: Option<&str>, page: Page) -> DbResult<Vec<PackageBundle>> {
        debug!(owner = ?owner, skip = page.skip, limit = page.limit, "Listing package bundles");

        let sql = format!("{SELECT_BUNDLE} WHERE owner_id IS ?1 ORDER BY rowid LIMIT ?2 OFFSET ?3");
        let (sql, pool) = (sql.as_str(), &self.pool);
        let rows = retry_read(&self.retry, "list_package_bundles", move || async move {
            sqlx::query_as::<_, BundleRow>(sql)
                .bind(owner)
                .bind(i64::from(page.limit))
                .bind(i64::from(page.skip))
                .fetch_all(pool)
                .await
                .map_err(DbError::from)
        })
        .await?;

        let mut bundles = Vec::with_capacity(rows.len());
        for row in rows {
            let items = self.load_items(&row.id).await?;
            bundles.push(row.into_bundle(items)?);
        }
        Ok(bundles)
    }

    /// Gets a bundle by its ID, with its items in link order.
    pub async fn get_by_id(&self, owner: Option<&str>, id: &str) -> DbResult<Option<PackageBundle>> {
        let sql = format!("{SELECT_BUNDLE} WHERE id = ?1 AND owner_id IS ?2");
        let (sql, pool) = (sql.as_str(), &self.pool);
        let row = retry_read(&self.retry, "get_package_bundle", move || async move {
            sqlx::query_as::<_, BundleRow>(sql)
                .bind(id)
                .bind(owner)
                .fetch_optional(pool)
                .await
                .map_err(DbError::from)
        })
        .await?;

        match row {
            Some(row) => {
                let items = self.load_items(&row.id).await?;
                Ok(Some(row.into_bundle(items)?))
            }
            None => Ok(None),
        }
    }

    /// Gets a bundle by its ID, failing with `NotFound`.
    pub async fn get(&self, owner: Option<&str>, id: &str) -> DbResult<PackageBundle> {
        self.get_by_id(owner, id)
            .await?
            .ok_or_else(|| DbError::not_found(ENTITY, id))
    }

    /// Counts bundles for an owner.
    pub async fn count(&self, owner: Option<&str>) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM package_bundles WHERE owner_id IS ?1")
                .bind(owner)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// Validates and inserts a new bundle with its item links.
    ///
    /// ## Returns
    /// * `Err(DbError::Core(CoreError::UnknownPackagingItem))` - An item id
    ///   does not exist for this owner
    /// * `Err(DbError::Core(CoreError::AmountOverflow))` - The item prices
    ///   do not sum to a representable amount
    pub async fn create(&self, owner: Option<&str>, draft: PackageBundleDraft) -> DbResult<PackageBundle> {
        let new = draft.validate()?;
        let items = self.resolve(owner, &new).await?;
        let total_price = bundle_total_price(&items)?;
        let id = new_id();
        let now = Utc::now();

        debug!(id = %id, name = %new.name, items = items.len(), "Inserting package bundle");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO package_bundles (
                id, owner_id, name, description, capacity_ml, total_price_micros,
                notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
            "#,
        )
        .bind(&id)
        .bind(owner)
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.capacity_ml)
        .bind(total_price)
        .bind(&new.notes)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| DbError::from(e).on_duplicate(ENTITY, &new.name))?;

        insert_links(&mut tx, &id, &new.item_ids).await?;
        tx.commit().await?;

        Ok(PackageBundle {
            id,
            owner_id: owner.map(str::to_string),
            name: new.name,
            description: new.description,
            capacity_ml: new.capacity_ml,
            total_price,
            notes: new.notes,
            items,
            created_at: now,
            updated_at: now,
        })
    }

    /// Validates and replaces a bundle, including its full item list.
    ///
    /// ## Returns
    /// * `Ok(SavedBundle)` - Updated bundle, plus a capacity warning under
    ///   `CapacityPolicy::Warn` when a recipe no longer fits
    /// * `Err(DbError::Core(CoreError::RecipeInvalid(_)))` - The new capacity
    ///   is below the volume of a recipe using the bundle, under `Enforce`
    /// * `Err(DbError::NotFound)` - No such bundle for this owner
    pub async fn update(
        &self,
        owner: Option<&str>,
        id: &str,
        draft: PackageBundleDraft,
        policy: CapacityPolicy,
    ) -> DbResult<SavedBundle> {
        let new = draft.validate()?;
        let items = self.resolve(owner, &new).await?;
        let total_price = bundle_total_price(&items)?;
        let now = Utc::now();

        debug!(id = %id, name = %new.name, items = items.len(), "Updating package bundle");

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE package_bundles SET
                name = ?3,
                description = ?4,
                capacity_ml = ?5,
                total_price_micros = ?6,
                notes = ?7,
                updated_at = ?8
            WHERE id = ?1 AND owner_id IS ?2
            "#,
        )
        .bind(id)
        .bind(owner)
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.capacity_ml)
        .bind(total_price)
        .bind(&new.notes)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| DbError::from(e).on_duplicate(ENTITY, &new.name))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(ENTITY, id));
        }

        let largest_volume_ml: Option<f64> = sqlx::query_scalar(
            "SELECT MAX(total_volume_ml) FROM recipes WHERE package_bundle_id = ?1",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        // dropping tx on error rolls the capacity change back
        let warnings = check_bundle_capacity(new.capacity_ml, largest_volume_ml, policy)?;
        if !warnings.is_empty() {
            warn!(id = %id, capacity_ml = new.capacity_ml, "Bundle capacity is below a recipe volume");
        }

        sqlx::query("DELETE FROM package_bundle_items WHERE bundle_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        insert_links(&mut tx, id, &new.item_ids).await?;
        tx.commit().await?;

        Ok(SavedBundle {
            bundle: self.get(owner, id).await?,
            warnings,
        })
    }

    /// Deletes a bundle and its item links.
    ///
    /// ## Returns
    /// * `Err(DbError::InUse)` - A recipe still references it
    pub async fn delete(&self, owner: Option<&str>, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting package bundle");

        let result = sqlx::query("DELETE FROM package_bundles WHERE id = ?1 AND owner_id IS ?2")
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

    /// Loads the bundles with the given ids, keyed by id.
    ///
    /// Unknown ids are left out.
    pub async fn find_many<'a, I>(&self, owner: Option<&str>, ids: I) -> DbResult<HashMap<String, PackageBundle>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut found = HashMap::new();
        for id in ids {
            if found.contains_key(id) {
                continue;
            }
            if let Some(bundle) = self.get_by_id(owner, id).await? {
                found.insert(bundle.id.clone(), bundle);
            }
        }
        Ok(found)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn resolve(&self, owner: Option<&str>, new: &NewPackageBundle) -> DbResult<Vec<PackagingItem>> {
        let known = self
            .items()
            .find_many(owner, new.item_ids.iter().map(String::as_str))
            .await?;
        Ok(new.resolve_items(&known)?)
    }

    async fn load_items(&self, bundle_id: &str) -> DbResult<Vec<PackagingItem>> {
        let sql = format!(
            "{SELECT_PACKAGING_ITEM} JOIN package_bundle_items bi ON bi.item_id = p.id \
             WHERE bi.bundle_id = ?1 ORDER BY bi.position"
        );
        let (sql, pool) = (sql.as_str(), &self.pool);
        let rows = retry_read(&self.retry, "load_bundle_items", move || async move {
            sqlx::query_as::<_, PackagingItemRow>(sql)
                .bind(bundle_id)
                .fetch_all(pool)
                .await
                .map_err(DbError::from)
        })
        .await?;

        Ok(rows.into_iter().map(PackagingItem::from).collect())
    }
}

async fn insert_links(tx: &mut Transaction<'_, Sqlite>, bundle_id: &str, item_ids: &[String]) -> DbResult<()> {
    for (position, item_id) in item_ids.iter().enumerate() {
        sqlx::query(
            "INSERT INTO package_bundle_items (bundle_id, item_id, position) VALUES (?1, ?2, ?3)",
        )
        .bind(bundle_id)
        .bind(item_id)
        .bind(position as i64)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}
