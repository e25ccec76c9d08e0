//! Packaging item CRUD.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use tracing::info;

use aroma_core::{PackagingItem, PackagingItemDraft};

use crate::auth::UserContext;
use crate::error::ApiResult;
use crate::routes::{DeletedResponse, PageQuery};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/packaging-items", get(list).post(create))
        .route("/packaging-items/{id}", get(read).put(update).delete(remove))
}

async fn list(
    State(state): State<AppState>,
    user: UserContext,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<PackagingItem>>> {
    let Query(query) = query?;
    let items = state.db.packaging_items().list(user.owner(), query.into()).await?;
    Ok(Json(items))
}

async fn read(
    State(state): State<AppState>,
    user: UserContext,
    Path(id): Path<String>,
) -> ApiResult<Json<PackagingItem>> {
    Ok(Json(state.db.packaging_items().get(user.owner(), &id).await?))
}

async fn create(
    State(state): State<AppState>,
    user: UserContext,
    body: Result<Json<PackagingItemDraft>, JsonRejection>,
) -> ApiResult<Json<PackagingItem>> {
    let Json(draft) = body?;
    let item = state.db.packaging_items().create(user.owner(), draft).await?;
    info!(id = %item.id, name = %item.name, "Packaging item created");
    Ok(Json(item))
}

/// Bundles pick up the new price on their next read.
async fn update(
    State(state): State<AppState>,
    user: UserContext,
    Path(id): Path<String>,
    body: Result<Json<PackagingItemDraft>, JsonRejection>,
) -> ApiResult<Json<PackagingItem>> {
    let Json(draft) = body?;
    let item = state.db.packaging_items().update(user.owner(), &id, draft).await?;
    Ok(Json(item))
}

async fn remove(
    State(state): State<AppState>,
    user: UserContext,
    Path(id): Path<String>,
) -> ApiResult<Json<DeletedResponse>> {
    state.db.packaging_items().delete(user.owner(), &id).await?;
    info!(id = %id, "Packaging item deleted");
    Ok(Json(DeletedResponse::new("Packaging item")))
}
