//! # Schema Migrations
//!
//! The SQL files under `migrations/sqlite/` are compiled into the binary and
//! applied when a [`Database`](crate::Database) is opened.
//!
//! ```text
//! migrations/sqlite/
//!   001_initial_schema.sql   ingredients, packaging_items, package_bundles,
//!                            package_bundle_items, recipes, recipe_ingredients
//!
//! open ──► embedded vs _sqlx_migrations ──► apply the missing ones in order
//! ```
//!
//! Applied files are checksummed by sqlx. A schema change is a new numbered
//! file (`002_...sql`), never an edit to an applied one.

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies every embedded migration the database has not seen yet.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    let (embedded, applied) = schema_version(pool).await?;
    if applied >= embedded {
        debug!(applied, "Schema is up to date");
        return Ok(());
    }

    info!(pending = embedded - applied, "Applying migrations");
    MIGRATOR.run(pool).await?;
    Ok(())
}

/// Returns `(embedded, applied)` migration counts.
///
/// A fresh database has no bookkeeping table yet and reports zero applied.
pub async fn schema_version(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let embedded = MIGRATOR.migrations.len();

    let has_table: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations'",
    )
    .fetch_one(pool)
    .await?;
    if has_table == 0 {
        return Ok((embedded, 0));
    }

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
        .fetch_one(pool)
        .await?;

    Ok((embedded, usize::try_from(applied).unwrap_or_default()))
}
