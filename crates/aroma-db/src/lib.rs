//! # aroma-db: Database Layer for AromaDB
//!
//! This crate provides database access for AromaDB.
//! It uses SQLite for storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          AromaDB Data Flow                              │
//! │                                                                         │
//! │  HTTP handler (POST /recipes)                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     aroma-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │    │  (embedded)  │  │   │
//! │  │   │               │    │ Ingredient     │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ PackagingItem  │    │ 001_initial_ │  │   │
//! │  │   │ Read retry    │    │ PackageBundle  │    │   schema.sql │  │   │
//! │  │   │               │    │ Recipe         │    │              │  │   │
//! │  │   └───────────────┘    └────────────────┘    └──────────────┘  │   │
//! │  │                               │                                 │   │
//! │  │                               ▼                                 │   │
//! │  │                   aroma-core (costing, validation)              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   ./aroma.db (WAL, foreign keys on)                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`retry`] - Backoff for transient read failures
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use aroma_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/aroma.db")).await?;
//!
//! let ingredients = db.ingredients().list(None, Page::default()).await?;
//! let saved = db.recipes().create(None, draft, CapacityPolicy::Enforce).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod retry;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use retry::RetryPolicy;

// Repository re-exports for convenience
pub use repository::ingredient::IngredientRepository;
pub use repository::package_bundle::{PackageBundleRepository, SavedBundle};
pub use repository::packaging_item::PackagingItemRepository;
pub use repository::recipe::{RecipeDetails, RecipeRepository, SavedRecipe};
