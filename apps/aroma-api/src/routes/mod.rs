//! # HTTP Routes
//!
//! One module per collection, each exposing a `router()` that is nested
//! into the application in [`crate::app`].
//!
//! ```text
//! /health                    health.rs
//! /ingredients[/{id}]        ingredients.rs
//! /packaging-items[/{id}]    packaging_items.rs
//! /package-bundles[/{id}]    package_bundles.rs
//! /recipes[/{id}]            recipes.rs
//! /recipes/validate          recipes.rs (dry run)
//! /conversions/to-ml         conversions.rs
//! /conversions/to-display    conversions.rs
//! ```
//!
//! Every collection handler takes a [`UserContext`](crate::auth::UserContext)
//! and passes its owner to the repository.

use serde::{Deserialize, Serialize};

use aroma_core::Page;

pub mod conversions;
pub mod health;
pub mod ingredients;
pub mod package_bundles;
pub mod packaging_items;
pub mod recipes;

/// `?skip=&limit=` on list endpoints.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub skip: Option<u32>,
    pub limit: Option<u32>,
}

impl From<PageQuery> for Page {
    fn from(query: PageQuery) -> Self {
        Page::new(query.skip, query.limit)
    }
}

/// Body returned by delete endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedResponse {
    pub message: String,
}

impl DeletedResponse {
    pub fn new(entity: &str) -> Self {
        DeletedResponse {
            message: format!("{} deleted successfully", entity),
        }
    }
}
