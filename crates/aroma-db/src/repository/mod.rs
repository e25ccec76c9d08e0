//! # Repository Module
//!
//! Database repository implementations for AromaDB.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  HTTP handler                                                          │
//! │       │                                                                 │
//! │       │  db.recipes().create(owner, draft, policy)                     │
//! │       ▼                                                                 │
//! │  RecipeRepository                                                      │
//! │  ├── load references (bundle, ingredients)  ◄── owner-scoped reads     │
//! │  ├── aroma_core::accept_recipe(...)         ◄── pure engine            │
//! │  └── INSERT recipe + entries                ◄── one transaction        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ownership
//! Every method takes `owner: Option<&str>`. `None` is the shared bucket
//! (`owner_id IS NULL`); `Some(sub)` sees only that user's rows. The filter
//! is `owner_id IS ?`, SQLite's NULL-safe equality.
//!
//! ## Available Repositories
//!
//! - [`IngredientRepository`](ingredient::IngredientRepository) - Ingredient CRUD
//! - [`PackagingItemRepository`](packaging_item::PackagingItemRepository) - Packaging item CRUD
//! - [`PackageBundleRepository`](package_bundle::PackageBundleRepository) - Bundles and their item links
//! - [`RecipeRepository`](recipe::RecipeRepository) - Recipes, costing and validation on write

pub mod ingredient;
pub mod package_bundle;
pub mod packaging_item;
pub mod recipe;

use uuid::Uuid;

/// Generates a new primary key.
pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Test Fixtures
// =============================================================================
