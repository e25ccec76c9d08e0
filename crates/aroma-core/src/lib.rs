//! # aroma-core: Pricing & Validation Engine for AromaDB
//!
//! This crate is the **heart** of AromaDB. It contains all business logic
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        AromaDB Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Frontend (React)                             │   │
//! │  │  Ingredients ──► Packaging ──► Bundles ──► Recipes              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ REST (JSON)                            │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    aroma-api (axum)                             │   │
//! │  │    CRUD routes, auth context, error mapping                     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ aroma-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │conversion │  │ validation│  │   │
//! │  │   │ Ingredient│  │   Money   │  │ drops↔ml  │  │  recipes  │  │   │
//! │  │   │  Recipe   │  │  pricing  │  │           │  │  drafts   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    aroma-db (Database Layer)                    │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Ingredient, PackagingItem, PackageBundle, Recipe)
//! - [`money`] - Money type with integer micro-unit arithmetic
//! - [`conversion`] - Drops ↔ milliliter conversion
//! - [`pricing`] - Bundle pricing and recipe costing
//! - [`validation`] - Recipe validation and draft acceptance
//! - [`lookup`] - Id-keyed lookups the engine reads referenced records from
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are integer micro-units
//! 4. **Typed Units**: A drops-measured ingredient always carries its conversion factor
//! 5. **Explicit Errors**: Missing references fail, they never cost zero
//!
//! ## Example Usage
//!
//! ```rust
//! use aroma_core::money::Money;
//! use aroma_core::types::{DropsPerMl, Measurement};
//!
//! let lavender = Measurement::Drops { drops_per_ml: DropsPerMl::new(20.0).unwrap() };
//!
//! // 10 drops of a 20 drops/ml oil is half a milliliter
//! let amount_ml = lavender.to_canonical_ml(10.0);
//! assert_eq!(amount_ml, 0.5);
//!
//! // At 0.50 per ml that half milliliter costs 0.25
//! let cost = Money::from_cents(50).multiply_ml(amount_ml);
//! assert_eq!(cost, Some(Money::from_cents(25)));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod conversion;
pub mod error;
pub mod lookup;
pub mod money;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use lookup::Lookup;
pub use money::Money;
pub use types::*;
pub use validation::{CapacityPolicy, RecipeViolation, ViolationClass};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum length of any entity name.
pub const MAX_NAME_LEN: usize = 200;

/// Page size used when a list request does not specify one.
pub const DEFAULT_PAGE_LIMIT: u32 = 100;

/// Upper bound on a single list request.
pub const MAX_PAGE_LIMIT: u32 = 1000;
