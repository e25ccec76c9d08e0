//! # Packaging Item Repository
//!
//! Database operations for packaging items (bottles, caps, labels, boxes).
//!
//! A packaging item that belongs to a bundle cannot be deleted; remove it
//! from the bundle first. Price changes flow into bundle totals the next
//! time a bundle is read.

use std::collections::HashMap;

use aroma_core::{Money, NewPackagingItem, Page, PackagingItem, PackagingItemDraft};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use super::new_id;
use crate::error::{DbError, DbResult};
use crate::retry::{retry_read, RetryPolicy};

const ENTITY: &str = "PackagingItem";

pub(crate) const SELECT_PACKAGING_ITEM: &str = r#"
    SELECT
        p.id, p.owner_id, p.name, p.item_type, p.material, p.description,
        p.price_micros, p.stock_amount, p.capacity_ml, p.color, p.notes,
        p.created_at, p.updated_at
    FROM packaging_items p
"#;

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PackagingItemRow {
    id: String,
    owner_id: Option<String>,
    name: String,
    item_type: String,
    material: String,
    description: String,
    price_micros: Money,
    stock_amount: i64,
    capacity_ml: Option<f64>,
    color: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PackagingItemRow> for PackagingItem {
    fn from(row: PackagingItemRow) -> Self {
        PackagingItem {
            id: row.id,
            owner_id: row.owner_id,
            name: row.name,
            item_type: row.item_type,
            material: row.material,
            description: row.description,
            price: row.price_micros,
            stock_amount: row.stock_amount,
            capacity_ml: row.capacity_ml,
            color: row.color,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for packaging item database operations.
#[derive(Debug, Clone)]
pub struct PackagingItemRepository {
    pool: SqlitePool,
    retry: RetryPolicy,
}

impl PackagingItemRepository {
    /// Creates a new PackagingItemRepository.
    pub fn new(pool: SqlitePool, retry: RetryPolicy) -> Self {
        PackagingItemRepository { pool, retry }
    }

    /// Lists packaging items in insertion order.
    pub async fn list(&self, owner: Option<&str>, page: Page) -> DbResult<Vec<PackagingItem>> {
        debug!(owner = ?owner, skip = page.skip, limit = page.limit, "Listing packaging items");

        let sql = format!(
            "{SELECT_PACKAGING_ITEM} WHERE p.owner_id IS ?1 ORDER BY p.rowid LIMIT ?2 OFFSET ?3"
        );
        let (sql, pool) = (sql.as_str(), &self.pool);
        let rows = retry_read(&self.retry, "list_packaging_items", move || async move {
            sqlx::query_as::<_, PackagingItemRow>(sql)
                .bind(owner)
                .bind(i64::from(page.limit))
                .bind(i64::from(page.skip))
                .fetch_all(pool)
                .await
                .map_err(DbError::from)
        })
        .await?;

        Ok(rows.into_iter().map(PackagingItem::from).collect())
    }

    /// Gets a packaging item by its ID.
    pub async fn get_by_id(&self, owner: Option<&str>, id: &str) -> DbResult<Option<PackagingItem>> {
        let sql = format!("{SELECT_PACKAGING_ITEM} WHERE p.id = ?1 AND p.owner_id IS ?2");
        let (sql, pool) = (sql.as_str(), &self.pool);
        let row = retry_read(&self.retry, "get_packaging_item", move || async move {
            sqlx::query_as::<_, PackagingItemRow>(sql)
                .bind(id)
                .bind(owner)
                .fetch_optional(pool)
                .await
                .map_err(DbError::from)
        })
        .await?;

        Ok(row.map(PackagingItem::from))
    }

    /// Gets a packaging item by its ID, failing with `NotFound`.
    pub async fn get(&self, owner: Option<&str>, id: &str) -> DbResult<PackagingItem> {
        self.get_by_id(owner, id)
            .await?
            .ok_or_else(|| DbError::not_found(ENTITY, id))
    }

    /// Loads the packaging items with the given ids, keyed by id.
    ///
    /// Unknown ids are left out.
    pub async fn find_many<'a, I>(&self, owner: Option<&str>, ids: I) -> DbResult<HashMap<String, PackagingItem>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut found = HashMap::new();
        for id in ids {
            if found.contains_key(id) {
                continue;
            }
            if let Some(item) = self.get_by_id(owner, id).await? {
                found.insert(item.id.clone(), item);
            }
        }
        Ok(found)
    }

    /// Counts packaging items for an owner.
    pub async fn count(&self, owner: Option<&str>) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM packaging_items WHERE owner_id IS ?1")
                .bind(owner)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// Validates and inserts a new packaging item.
    pub async fn create(&self, owner: Option<&str>, draft: PackagingItemDraft) -> DbResult<PackagingItem> {
        let new = draft.validate()?;
        let id = new_id();
        let now = Utc::now();

        debug!(id = %id, name = %new.name, "Inserting packaging item");

        sqlx::query(
            r#"
            INSERT INTO packaging_items (
                id, owner_id, name, item_type, material, description,
                price_micros, stock_amount, capacity_ml, color, notes,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)
            "#,
        )
        .bind(&id)
        .bind(owner)
        .bind(&new.name)
        .bind(&new.item_type)
        .bind(&new.material)
        .bind(&new.description)
        .bind(new.price)
        .bind(new.stock_amount)
        .bind(new.capacity_ml)
        .bind(&new.color)
        .bind(&new.notes)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from(e).on_duplicate(ENTITY, &new.name))?;

        Ok(into_record(id, owner, new, now))
    }

    /// Validates and replaces an existing packaging item.
    pub async fn update(
        &self,
        owner: Option<&str>,
        id: &str,
        draft: PackagingItemDraft,
    ) -> DbResult<PackagingItem> {
        let new = draft.validate()?;
        let now = Utc::now();

        debug!(id = %id, name = %new.name, "Updating packaging item");

        let result = sqlx::query(
            r#"
            UPDATE packaging_items SET
                name = ?3,
                item_type = ?4,
                material = ?5,
                description = ?6,
                price_micros = ?7,
                stock_amount = ?8,
                capacity_ml = ?9,
                color = ?10,
                notes = ?11,
                updated_at = ?12
            WHERE id = ?1 AND owner_id IS ?2
            "#,
        )
        .bind(id)
        .bind(owner)
        .bind(&new.name)
        .bind(&new.item_type)
        .bind(&new.material)
        .bind(&new.description)
        .bind(new.price)
        .bind(new.stock_amount)
        .bind(new.capacity_ml)
        .bind(&new.color)
        .bind(&new.notes)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from(e).on_duplicate(ENTITY, &new.name))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(ENTITY, id));
        }

        self.get(owner, id).await
    }

    /// Deletes a packaging item.
    ///
    /// ## Returns
    /// * `Err(DbError::InUse)` - A bundle still contains it
    pub async fn delete(&self, owner: Option<&str>, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting packaging item");

        let result = sqlx::query("DELETE FROM packaging_items WHERE id = ?1 AND owner_id IS ?2")
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

fn into_record(id: String, owner: Option<&str>, new: NewPackagingItem, now: DateTime<Utc>) -> PackagingItem {
    PackagingItem {
        id,
        owner_id: owner.map(str::to_string),
        name: new.name,
        item_type: new.item_type,
        material: new.material,
        description: new.description,
        price: new.price,
        stock_amount: new.stock_amount,
        capacity_ml: new.capacity_ml,
        color: new.color,
        notes: new.notes,
        created_at: now,
        updated_at: now,
    }
}
