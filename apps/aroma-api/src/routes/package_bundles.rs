//! Package bundle CRUD.
//!
//! Bundles are returned with their items expanded and `total_price`
//! recomputed from the current item prices.
//!
//! Lowering a bundle's capacity below the volume of a recipe that uses it is
//! a 422 `RECIPE_INVALID` under `capacity_policy = "enforce"`, and a saved
//! bundle with `warnings` under `"warn"`.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tracing::{info, warn};

use aroma_core::{PackageBundle, PackageBundleDraft, RecipeViolation};

use crate::auth::UserContext;
use crate::error::ApiResult;
use crate::routes::{DeletedResponse, PageQuery};
use crate::state::AppState;

/// A bundle as returned by an update.
#[derive(Debug, Clone, Serialize)]
pub struct BundleView {
    #[serde(flatten)]
    pub bundle: PackageBundle,

    /// Recipes that no longer fit, saved under `CapacityPolicy::Warn`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<RecipeViolation>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/package-bundles", get(list).post(create))
        .route("/package-bundles/{id}", get(read).put(update).delete(remove))
}

async fn list(
    State(state): State<AppState>,
    user: UserContext,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<PackageBundle>>> {
    let Query(query) = query?;
    let bundles = state.db.package_bundles().list(user.owner(), query.into()).await?;
    Ok(Json(bundles))
}

async fn read(
    State(state): State<AppState>,
    user: UserContext,
    Path(id): Path<String>,
) -> ApiResult<Json<PackageBundle>> {
    Ok(Json(state.db.package_bundles().get(user.owner(), &id).await?))
}

async fn create(
    State(state): State<AppState>,
    user: UserContext,
    body: Result<Json<PackageBundleDraft>, JsonRejection>,
) -> ApiResult<Json<PackageBundle>> {
    let Json(draft) = body?;
    let bundle = state.db.package_bundles().create(user.owner(), draft).await?;
    info!(
        id = %bundle.id,
        items = bundle.items.len(),
        total_price = %bundle.total_price,
        "Package bundle created"
    );
    Ok(Json(bundle))
}

async fn update(
    State(state): State<AppState>,
    user: UserContext,
    Path(id): Path<String>,
    body: Result<Json<PackageBundleDraft>, JsonRejection>,
) -> ApiResult<Json<BundleView>> {
    let Json(draft) = body?;
    let saved = state
        .db
        .package_bundles()
        .update(user.owner(), &id, draft, state.config.capacity_policy)
        .await?;
    for warning in &saved.warnings {
        warn!(id = %id, code = warning.code(), "Package bundle saved with warning");
    }
    Ok(Json(BundleView {
        bundle: saved.bundle,
        warnings: saved.warnings,
    }))
}

async fn remove(
    State(state): State<AppState>,
    user: UserContext,
    Path(id): Path<String>,
) -> ApiResult<Json<DeletedResponse>> {
    state.db.package_bundles().delete(user.owner(), &id).await?;
    info!(id = %id, "Package bundle deleted");
    Ok(Json(DeletedResponse::new("Package bundle")))
}
