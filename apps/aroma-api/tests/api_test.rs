//! HTTP tests driving the router with `tower::ServiceExt::oneshot`.

use aroma_api::auth::JwtManager;
use aroma_api::{app, ApiConfig, AppState, AuthMode};
use aroma_core::CapacityPolicy;
use aroma_db::{Database, DbConfig};
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

const SECRET: &str = "test-secret";

/// Well-formed id that matches no record.
const MISSING_ID: &str = "00000000-0000-4000-8000-000000000000";

// =============================================================================
// Helpers
// =============================================================================

async fn test_app(config: ApiConfig) -> Router {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    app(AppState::new(db, config))
}

async fn open_app() -> Router {
    test_app(ApiConfig::default()).await
}

async fn send(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None, None).await
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, uri, None, Some(body)).await
}

fn assert_money(value: &Value, expected: f64) {
    let actual = value.as_f64().unwrap();
    assert!((actual - expected).abs() < 1e-6, "expected {expected}, got {actual}");
}

fn lavender() -> Value {
    json!({
        "name": "Lavender",
        "type": "Essential Oil",
        "price_per_unit": 0.85,
        "stock_amount": 2000,
        "measurement_type": "drops",
        "drops_per_ml": 20
    })
}

fn almond() -> Value {
    json!({
        "name": "Sweet Almond",
        "type": "Carrier Oil",
        "price_per_unit": 0.15,
        "stock_amount": 500,
        "measurement_type": "ml"
    })
}

fn bottle() -> Value {
    json!({
        "name": "Amber Bottle",
        "type": "Bottle",
        "material": "Glass",
        "price": 2.50,
        "stock_amount": 100,
        "capacity": 30
    })
}

struct Catalog {
    lavender: String,
    almond: String,
    bottle: String,
    bundle: String,
}

async fn catalog(app: &Router) -> Catalog {
    let (_, lavender) = post(app, "/ingredients", lavender()).await;
    let (_, almond) = post(app, "/ingredients", almond()).await;
    let (_, bottle) = post(app, "/packaging-items", bottle()).await;
    let bottle = bottle["id"].as_str().unwrap().to_string();
    let (status, bundle) = post(
        app,
        "/package-bundles",
        json!({ "name": "30ml Package", "capacity": 30, "item_ids": [bottle] }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    Catalog {
        lavender: lavender["id"].as_str().unwrap().to_string(),
        almond: almond["id"].as_str().unwrap().to_string(),
        bottle,
        bundle: bundle["id"].as_str().unwrap().to_string(),
    }
}

fn blend(c: &Catalog, volume: f64) -> Value {
    json!({
        "name": "Sleep Blend",
        "total_volume_ml": volume,
        "retail_price": 45.0,
        "package_bundle_id": c.bundle,
        "ingredients": [
            { "ingredient_id": c.lavender, "amount_ml": 3.0 },
            { "ingredient_id": c.almond, "amount_ml": 25.0 }
        ]
    })
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health() {
    let app = open_app().await;
    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "connected");
}

// =============================================================================
// Collections
// =============================================================================

#[tokio::test]
async fn test_ingredient_crud() {
    let app = open_app().await;

    let (status, created) = post(&app, "/ingredients", lavender()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["type"], "Essential Oil");
    assert_eq!(created["measurement_type"], "drops");
    assert_eq!(created["drops_per_ml"], 20.0);
    let id = created["id"].as_str().unwrap().to_string();

    let (status, fetched) = get(&app, &format!("/ingredients/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], "Lavender");

    let mut changed = lavender();
    changed["price_per_unit"] = json!(1.10);
    let (status, updated) = send(&app, Method::PUT, &format!("/ingredients/{}", id), None, Some(changed)).await;
    assert_eq!(status, StatusCode::OK);
    assert_money(&updated["price_per_unit"], 1.10);

    let (status, body) = send(&app, Method::DELETE, &format!("/ingredients/{}", id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Ingredient deleted successfully");

    let (status, body) = get(&app, &format!("/ingredients/{}", id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_ingredient_edit_keeps_drops_unit() {
    let app = open_app().await;
    let (_, created) = post(&app, "/ingredients", lavender()).await;
    let uri = format!("/ingredients/{}", created["id"].as_str().unwrap());

    // Edit form: fetch, change one field, send the whole record back.
    let (_, mut form) = get(&app, &uri).await;
    form["stock_amount"] = json!(1500);
    let (status, updated) = send(&app, Method::PUT, &uri, None, Some(form)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["stock_amount"], 1500.0);
    assert_eq!(updated["measurement_type"], "drops");
    assert_eq!(updated["drops_per_ml"], 20.0);

    let (_, fetched) = get(&app, &uri).await;
    assert_eq!(fetched["measurement_type"], "drops");
    assert_eq!(fetched["drops_per_ml"], 20.0);
}

#[tokio::test]
async fn test_list_paging() {
    let app = open_app().await;
    post(&app, "/ingredients", lavender()).await;
    post(&app, "/ingredients", almond()).await;

    let (_, all) = get(&app, "/ingredients").await;
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (_, page) = get(&app, "/ingredients?skip=1&limit=1").await;
    assert_eq!(page.as_array().unwrap().len(), 1);

    let (status, body) = get(&app, "/ingredients?limit=lots").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_duplicate_name_is_conflict() {
    let app = open_app().await;
    post(&app, "/ingredients", lavender()).await;

    let (status, body) = post(&app, "/ingredients", lavender()).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "DUPLICATE_NAME");
}

#[tokio::test]
async fn test_invalid_fields_are_bad_request() {
    let app = open_app().await;

    let mut negative = bottle();
    negative["price"] = json!(-1.0);
    let (status, body) = post(&app, "/packaging-items", negative).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = send(&app, Method::POST, "/ingredients", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_bundle_total_follows_item_prices() {
    let app = open_app().await;
    let c = catalog(&app).await;

    let (_, bundle) = get(&app, &format!("/package-bundles/{}", c.bundle)).await;
    assert_money(&bundle["total_price"], 2.50);
    assert_eq!(bundle["items"][0]["name"], "Amber Bottle");

    let mut pricier = bottle();
    pricier["price"] = json!(3.00);
    send(&app, Method::PUT, &format!("/packaging-items/{}", c.bottle), None, Some(pricier)).await;

    let (_, bundle) = get(&app, &format!("/package-bundles/{}", c.bundle)).await;
    assert_money(&bundle["total_price"], 3.00);
}

#[tokio::test]
async fn test_price_above_maximum_is_rejected() {
    let app = open_app().await;

    let mut gold = bottle();
    gold["price"] = json!(1e13);
    let (status, body) = post(&app, "/packaging-items", gold).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let mut rose = lavender();
    rose["price_per_unit"] = json!(1e13);
    let (status, _) = post(&app, "/ingredients", rose).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, items) = get(&app, "/packaging-items").await;
    assert!(items.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_bundle_cannot_shrink_below_recipe() {
    let app = open_app().await;
    let c = catalog(&app).await;
    let (status, _) = post(&app, "/recipes", blend(&c, 28.0)).await;
    assert_eq!(status, StatusCode::OK);

    let uri = format!("/package-bundles/{}", c.bundle);
    let smaller = json!({ "name": "30ml Package", "capacity": 10, "item_ids": [c.bottle] });
    let (status, body) = send(&app, Method::PUT, &uri, None, Some(smaller)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "RECIPE_INVALID");
    assert_eq!(body["violations"][0]["kind"], "volume_exceeds_capacity");
    assert_eq!(body["violations"][0]["total_volume_ml"], 28.0);
    assert_eq!(body["violations"][0]["capacity_ml"], 10.0);

    let (_, bundle) = get(&app, &uri).await;
    assert_eq!(bundle["capacity"], 30.0);
}

#[tokio::test]
async fn test_bundle_shrink_warns_when_configured() {
    let app = test_app(ApiConfig {
        capacity_policy: CapacityPolicy::Warn,
        ..ApiConfig::default()
    })
    .await;
    let c = catalog(&app).await;
    post(&app, "/recipes", blend(&c, 28.0)).await;

    let smaller = json!({ "name": "30ml Package", "capacity": 10, "item_ids": [c.bottle] });
    let (status, bundle) = send(&app, Method::PUT, &format!("/package-bundles/{}", c.bundle), None, Some(smaller)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bundle["capacity"], 10.0);
    assert_eq!(bundle["warnings"][0]["kind"], "volume_exceeds_capacity");
}

#[tokio::test]
async fn test_unknown_packaging_item() {
    let app = open_app().await;
    let (status, body) = post(
        &app,
        "/package-bundles",
        json!({ "name": "Broken", "capacity": 30, "item_ids": [MISSING_ID] }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "UNKNOWN_PACKAGING_ITEM");
}

#[tokio::test]
async fn test_referenced_item_is_in_use() {
    let app = open_app().await;
    let c = catalog(&app).await;

    let (status, body) = send(&app, Method::DELETE, &format!("/packaging-items/{}", c.bottle), None, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "IN_USE");

    let (status, _) = send(&app, Method::DELETE, &format!("/package-bundles/{}", c.bundle), None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, Method::DELETE, &format!("/packaging-items/{}", c.bottle), None, None).await;
    assert_eq!(status, StatusCode::OK);
}

// =============================================================================
// Recipes
// =============================================================================

#[tokio::test]
async fn test_recipe_create_returns_cost_and_margin() {
    let app = open_app().await;
    let c = catalog(&app).await;

    let (status, recipe) = post(&app, "/recipes", blend(&c, 30.0)).await;
    assert_eq!(status, StatusCode::OK);
    assert_money(&recipe["total_cost"], 6.30);
    assert_money(&recipe["cost"]["packaging_cost"], 2.50);
    assert_money(&recipe["cost"]["unit_cost"], 8.80);
    assert_money(&recipe["margin"]["profit"], 36.20);
    assert!(recipe.get("warnings").is_none());

    assert_eq!(recipe["package_bundle"]["name"], "30ml Package");
    assert_eq!(recipe["package_bundle"]["items"][0]["name"], "Amber Bottle");

    let id = recipe["id"].as_str().unwrap();
    let (status, fetched) = get(&app, &format!("/recipes/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["ingredients"].as_array().unwrap().len(), 2);
    assert_eq!(fetched["package_bundle"]["id"], c.bundle.as_str());
    let details = fetched["recipe_ingredients"].as_array().unwrap();
    assert_eq!(details.len(), 2);
    assert_eq!(details[0]["ingredient"]["name"], "Lavender");
    assert_eq!(details[0]["ingredient"]["measurement_type"], "drops");
    assert_eq!(details[0]["amount_ml"], 3.0);
    assert_eq!(details[1]["ingredient"]["name"], "Sweet Almond");

    let (status, body) = send(&app, Method::DELETE, &format!("/ingredients/{}", c.lavender), None, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "IN_USE");
}

#[tokio::test]
async fn test_recipe_violations_are_listed() {
    let app = open_app().await;

    let (status, body) = post(&app, "/recipes", json!({ "name": "  " })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "RECIPE_INVALID");

    let kinds: Vec<&str> = body["violations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["kind"].as_str().unwrap())
        .collect();
    assert_eq!(
        kinds,
        vec!["empty_name", "no_package_bundle", "no_ingredients", "non_positive_volume"]
    );
}

#[tokio::test]
async fn test_over_capacity_is_rejected_by_default() {
    let app = open_app().await;
    let c = catalog(&app).await;

    let (status, body) = post(&app, "/recipes", blend(&c, 50.0)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["violations"].as_array().unwrap().len(), 1);
    assert_eq!(body["violations"][0]["kind"], "volume_exceeds_capacity");
    assert_eq!(body["violations"][0]["capacity_ml"], 30.0);
}

#[tokio::test]
async fn test_over_capacity_warns_when_configured() {
    let app = test_app(ApiConfig {
        capacity_policy: CapacityPolicy::Warn,
        ..ApiConfig::default()
    })
    .await;
    let c = catalog(&app).await;

    let (status, recipe) = post(&app, "/recipes", blend(&c, 50.0)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(recipe["warnings"][0]["kind"], "volume_exceeds_capacity");
}

#[tokio::test]
async fn test_recipe_stock_and_references() {
    let app = open_app().await;
    let c = catalog(&app).await;

    let mut greedy = blend(&c, 30.0);
    greedy["ingredients"][1]["amount_ml"] = json!(600.0);
    let (status, body) = post(&app, "/recipes", greedy).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INSUFFICIENT_STOCK");

    let mut unknown = blend(&c, 30.0);
    unknown["ingredients"][0]["ingredient_id"] = json!(MISSING_ID);
    let (status, body) = post(&app, "/recipes", unknown).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "UNKNOWN_INGREDIENT");
}

#[tokio::test]
async fn test_update_missing_recipe() {
    let app = open_app().await;
    let c = catalog(&app).await;

    let (status, body) = send(&app, Method::PUT, &format!("/recipes/{}", MISSING_ID), None, Some(blend(&c, 30.0))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_validate_is_a_dry_run() {
    let app = open_app().await;
    let c = catalog(&app).await;

    let (status, report) = post(&app, "/recipes/validate", blend(&c, 30.0)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["accepted"], true);
    assert_money(&report["cost"]["unit_cost"], 8.80);

    let (status, report) = post(&app, "/recipes/validate", blend(&c, 50.0)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["accepted"], false);
    assert_eq!(report["errors"][0]["kind"], "volume_exceeds_capacity");

    let (_, recipes) = get(&app, "/recipes").await;
    assert!(recipes.as_array().unwrap().is_empty());
}

// =============================================================================
// Conversions
// =============================================================================

#[tokio::test]
async fn test_conversions() {
    let app = open_app().await;
    let c = catalog(&app).await;

    let (status, body) = post(
        &app,
        "/conversions/to-ml",
        json!({ "ingredient_id": c.lavender, "amount": 10 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["amount_ml"], 0.5);

    let (status, body) = post(
        &app,
        "/conversions/to-display",
        json!({ "ingredient_id": c.lavender, "amount_ml": 0.5 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["amount"], 10.0);
    assert_eq!(body["unit"], "drops");

    let (_, body) = post(
        &app,
        "/conversions/to-display",
        json!({ "ingredient_id": c.almond, "amount_ml": 12.5 }),
    )
    .await;
    assert_eq!(body["unit"], "ml");

    let (status, body) = post(
        &app,
        "/conversions/to-ml",
        json!({ "ingredient_id": MISSING_ID, "amount": 1 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "UNKNOWN_INGREDIENT");
}

// =============================================================================
// Authentication
// =============================================================================

fn per_user_config() -> ApiConfig {
    ApiConfig {
        auth_mode: AuthMode::PerUser,
        jwt_secret: Some(SECRET.to_string()),
        ..ApiConfig::default()
    }
}

#[tokio::test]
async fn test_token_required_when_auth_enabled() {
    let app = test_app(per_user_config()).await;

    let (status, body) = get(&app, "/ingredients").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = send(&app, Method::GET, "/ingredients", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Health stays open without a token
    let (status, _) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_per_user_records_are_scoped() {
    let app = test_app(per_user_config()).await;
    let jwt = JwtManager::new(SECRET);
    let alice = jwt.issue_token("alice", 3600).unwrap();
    let bob = jwt.issue_token("bob", 3600).unwrap();

    let (status, created) = send(&app, Method::POST, "/ingredients", Some(&alice), Some(lavender())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["owner_id"], "alice");
    let id = created["id"].as_str().unwrap().to_string();

    let (_, listed) = send(&app, Method::GET, "/ingredients", Some(&bob), None).await;
    assert!(listed.as_array().unwrap().is_empty());

    let (status, _) = send(&app, Method::GET, &format!("/ingredients/{}", id), Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Same name is free in another user's collection
    let (status, _) = send(&app, Method::POST, "/ingredients", Some(&bob), Some(lavender())).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_shared_mode_uses_one_collection() {
    let app = test_app(ApiConfig {
        auth_mode: AuthMode::Shared,
        ..per_user_config()
    })
    .await;
    let jwt = JwtManager::new(SECRET);
    let alice = jwt.issue_token("alice", 3600).unwrap();
    let bob = jwt.issue_token("bob", 3600).unwrap();

    let (_, created) = send(&app, Method::POST, "/ingredients", Some(&alice), Some(lavender())).await;
    assert!(created["owner_id"].is_null());

    let (_, listed) = send(&app, Method::GET, "/ingredients", Some(&bob), None).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
}
