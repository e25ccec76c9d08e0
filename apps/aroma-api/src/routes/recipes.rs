//! # Recipe Routes
//!
//! CRUD plus a dry-run validation endpoint for the recipe editor.
//!
//! ## Write Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    POST /recipes                                        │
//! │                                                                         │
//! │  RecipeDraft (JSON)                                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  RecipeRepository::create(owner, draft, config.capacity_policy)         │
//! │       │                                                                 │
//! │       ├── blocking violations ──► 422 RECIPE_INVALID + violations       │
//! │       ├── unknown ingredient ───► 400 UNKNOWN_INGREDIENT                │
//! │       ├── not enough stock ─────► 409 INSUFFICIENT_STOCK                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  RecipeView { ..recipe, package_bundle, recipe_ingredients,             │
//! │               cost, margin, warnings }                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `total_cost` is the ingredient-only cost. `cost` adds the bundle price so
//! the editor can show the unit cost and margin.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tracing::{info, warn};

use aroma_core::pricing::{CostBreakdown, Margin};
use aroma_core::validation::RecipeAssessment;
use aroma_core::{PackageBundle, Recipe, RecipeDraft, RecipeIngredientDetail, RecipeViolation};
use aroma_db::SavedRecipe;

use crate::auth::UserContext;
use crate::error::ApiResult;
use crate::routes::{DeletedResponse, PageQuery};
use crate::state::AppState;

/// A recipe with the records it points at and its cost at current prices.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeView {
    #[serde(flatten)]
    pub recipe: Recipe,

    pub package_bundle: PackageBundle,

    /// `ingredients` with each ingredient record resolved, in entry order.
    pub recipe_ingredients: Vec<RecipeIngredientDetail>,

    pub cost: CostBreakdown,

    pub margin: Option<Margin>,

    /// Capacity violations saved under `CapacityPolicy::Warn`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<RecipeViolation>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/recipes", get(list).post(create))
        .route("/recipes/validate", post(validate))
        .route("/recipes/{id}", get(read).put(update).delete(remove))
}

// =============================================================================
// Handlers
// =============================================================================

async fn list(
    State(state): State<AppState>,
    user: UserContext,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<RecipeView>>> {
    let Query(query) = query?;
    let recipes = state.db.recipes().list(user.owner(), query.into()).await?;

    let mut views = Vec::with_capacity(recipes.len());
    for recipe in recipes {
        views.push(view(&state, &user, recipe, Vec::new()).await?);
    }
    Ok(Json(views))
}

async fn read(
    State(state): State<AppState>,
    user: UserContext,
    Path(id): Path<String>,
) -> ApiResult<Json<RecipeView>> {
    let recipe = state.db.recipes().get(user.owner(), &id).await?;
    Ok(Json(view(&state, &user, recipe, Vec::new()).await?))
}

async fn create(
    State(state): State<AppState>,
    user: UserContext,
    body: Result<Json<RecipeDraft>, JsonRejection>,
) -> ApiResult<Json<RecipeView>> {
    let Json(draft) = body?;
    let saved = state
        .db
        .recipes()
        .create(user.owner(), draft, state.config.capacity_policy)
        .await?;
    info!(id = %saved.recipe.id, total_cost = %saved.recipe.total_cost, "Recipe created");
    Ok(Json(saved_view(&state, &user, saved).await?))
}

async fn update(
    State(state): State<AppState>,
    user: UserContext,
    Path(id): Path<String>,
    body: Result<Json<RecipeDraft>, JsonRejection>,
) -> ApiResult<Json<RecipeView>> {
    let Json(draft) = body?;
    let saved = state
        .db
        .recipes()
        .update(user.owner(), &id, draft, state.config.capacity_policy)
        .await?;
    Ok(Json(saved_view(&state, &user, saved).await?))
}

async fn remove(
    State(state): State<AppState>,
    user: UserContext,
    Path(id): Path<String>,
) -> ApiResult<Json<DeletedResponse>> {
    state.db.recipes().delete(user.owner(), &id).await?;
    info!(id = %id, "Recipe deleted");
    Ok(Json(DeletedResponse::new("Recipe")))
}

/// Dry run: every check `create` would make, reported without storing.
async fn validate(
    State(state): State<AppState>,
    user: UserContext,
    body: Result<Json<RecipeDraft>, JsonRejection>,
) -> ApiResult<Json<RecipeAssessment>> {
    let Json(draft) = body?;
    let assessment = state
        .db
        .recipes()
        .assess(user.owner(), &draft, state.config.capacity_policy)
        .await?;
    Ok(Json(assessment))
}

// =============================================================================
// Helpers
// =============================================================================

async fn view(
    state: &AppState,
    user: &UserContext,
    recipe: Recipe,
    warnings: Vec<RecipeViolation>,
) -> ApiResult<RecipeView> {
    let details = state.db.recipes().details(user.owner(), &recipe).await?;
    let margin = details.cost.margin(recipe.retail_price);
    Ok(RecipeView {
        recipe,
        package_bundle: details.package_bundle,
        recipe_ingredients: details.recipe_ingredients,
        cost: details.cost,
        margin,
        warnings,
    })
}

async fn saved_view(state: &AppState, user: &UserContext, saved: SavedRecipe) -> ApiResult<RecipeView> {
    for warning in &saved.warnings {
        warn!(id = %saved.recipe.id, code = warning.code(), "Recipe saved with warning");
    }
    view(state, user, saved.recipe, saved.warnings).await
}
