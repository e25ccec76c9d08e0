//! Unit conversion for the recipe editor.
//!
//! Recipes store every amount in ml. Drops-measured ingredients are entered
//! and shown in drops, so the editor converts on the way in and out.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use aroma_core::conversion::{checked_to_canonical_ml, checked_to_display_amount};
use aroma_core::{CoreError, Ingredient};

use crate::auth::UserContext;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ToMlRequest {
    pub ingredient_id: String,
    /// Amount in the ingredient's own unit.
    pub amount: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToMlResponse {
    pub amount_ml: f64,
}

#[derive(Debug, Deserialize)]
pub struct ToDisplayRequest {
    pub ingredient_id: String,
    pub amount_ml: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToDisplayResponse {
    pub amount: f64,
    /// `"ml"` or `"drops"`.
    pub unit: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/conversions/to-ml", post(to_ml))
        .route("/conversions/to-display", post(to_display))
}

async fn to_ml(
    State(state): State<AppState>,
    user: UserContext,
    body: Result<Json<ToMlRequest>, JsonRejection>,
) -> ApiResult<Json<ToMlResponse>> {
    let Json(request) = body?;
    let ingredient = ingredient(&state, &user, &request.ingredient_id).await?;
    let amount_ml = checked_to_canonical_ml(&ingredient, request.amount)?;
    Ok(Json(ToMlResponse { amount_ml }))
}

async fn to_display(
    State(state): State<AppState>,
    user: UserContext,
    body: Result<Json<ToDisplayRequest>, JsonRejection>,
) -> ApiResult<Json<ToDisplayResponse>> {
    let Json(request) = body?;
    let ingredient = ingredient(&state, &user, &request.ingredient_id).await?;
    let amount = checked_to_display_amount(&ingredient, request.amount_ml)?;
    Ok(Json(ToDisplayResponse {
        amount,
        unit: ingredient.measurement.unit_label().to_string(),
    }))
}

/// An unknown id is a bad request here, not a missing resource.
async fn ingredient(state: &AppState, user: &UserContext, id: &str) -> ApiResult<Ingredient> {
    state
        .db
        .ingredients()
        .get_by_id(user.owner(), id)
        .await?
        .ok_or_else(|| CoreError::UnknownIngredient(id.to_string()).into())
}
