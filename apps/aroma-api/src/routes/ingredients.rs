//! Ingredient CRUD.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use tracing::info;

use aroma_core::{Ingredient, IngredientDraft};

use crate::auth::UserContext;
use crate::error::ApiResult;
use crate::routes::{DeletedResponse, PageQuery};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ingredients", get(list).post(create))
        .route("/ingredients/{id}", get(read).put(update).delete(remove))
}

async fn list(
    State(state): State<AppState>,
    user: UserContext,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Ingredient>>> {
    let Query(query) = query?;
    let ingredients = state.db.ingredients().list(user.owner(), query.into()).await?;
    Ok(Json(ingredients))
}

async fn read(
    State(state): State<AppState>,
    user: UserContext,
    Path(id): Path<String>,
) -> ApiResult<Json<Ingredient>> {
    Ok(Json(state.db.ingredients().get(user.owner(), &id).await?))
}

async fn create(
    State(state): State<AppState>,
    user: UserContext,
    body: Result<Json<IngredientDraft>, JsonRejection>,
) -> ApiResult<Json<Ingredient>> {
    let Json(draft) = body?;
    let ingredient = state.db.ingredients().create(user.owner(), draft).await?;
    info!(id = %ingredient.id, name = %ingredient.name, "Ingredient created");
    Ok(Json(ingredient))
}

async fn update(
    State(state): State<AppState>,
    user: UserContext,
    Path(id): Path<String>,
    body: Result<Json<IngredientDraft>, JsonRejection>,
) -> ApiResult<Json<Ingredient>> {
    let Json(draft) = body?;
    let ingredient = state.db.ingredients().update(user.owner(), &id, draft).await?;
    Ok(Json(ingredient))
}

async fn remove(
    State(state): State<AppState>,
    user: UserContext,
    Path(id): Path<String>,
) -> ApiResult<Json<DeletedResponse>> {
    state.db.ingredients().delete(user.owner(), &id).await?;
    info!(id = %id, "Ingredient deleted");
    Ok(Json(DeletedResponse::new("Ingredient")))
}
