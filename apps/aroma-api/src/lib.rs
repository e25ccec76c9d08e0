//! # AromaDB API
//!
//! REST server for the AromaDB catalog: ingredients, packaging items,
//! package bundles and recipes.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        AromaDB API Server                               │
//! │                                                                         │
//! │  Browser (Vite frontend)                                                │
//! │       │  JSON over HTTP, optional Bearer token                          │
//! │       ▼                                                                 │
//! │  ┌────────────────────────────────────────────────────────────────┐    │
//! │  │  tower-http: CorsLayer ─► TraceLayer                           │    │
//! │  └────────────────────────────────────────────────────────────────┘    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌────────────────┐   ┌────────────────┐   ┌────────────────────────┐  │
//! │  │  UserContext   │──►│  routes/*      │──►│  aroma-db repositories │  │
//! │  │  (auth.rs)     │   │  ApiError      │   │  aroma-core engine     │  │
//! │  └────────────────┘   └────────────────┘   └────────────────────────┘  │
//! │                                                       │                 │
//! │                                                       ▼                 │
//! │                                                  SQLite (WAL)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! See [`config::ApiConfig`]. Every field can be set in `aroma.toml` or with
//! an `AROMA_` environment variable.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use axum::http::HeaderValue;
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::{ApiConfig, AuthMode, ConfigError};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use state::AppState;

/// Builds the application router.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .merge(routes::health::router())
        .merge(routes::ingredients::router())
        .merge(routes::packaging_items::router())
        .merge(routes::package_bundles::router())
        .merge(routes::recipes::router())
        .merge(routes::conversions::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}
