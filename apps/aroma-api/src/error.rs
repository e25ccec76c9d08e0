//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in AromaDB                                │
//! │                                                                         │
//! │  Frontend                    Rust Backend                               │
//! │  ────────                    ────────────                               │
//! │                                                                         │
//! │  POST /recipes                                                          │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Handler                                                         │  │
//! │  │  Result<Json<T>, ApiError>                                       │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Database Error? ─── DbError::InUse { .. } ────────┐            │  │
//! │  │         │                                          │            │  │
//! │  │         ▼                                          ▼            │  │
//! │  │  Engine Error? ───── CoreError::RecipeInvalid ── ApiError ─────►│  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Success ──────────────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  ◄── 422 { "code": "RECIPE_INVALID",                                   │
//! │            "message": "Recipe is invalid: ...",                         │
//! │            "violations": [{ "kind": "no_ingredients" }] }               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Storage failures are logged with their details and reach the client as a
//! generic message.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use aroma_core::{CoreError, RecipeViolation};
use aroma_db::DbError;

/// API error returned from handlers.
///
/// ## Serialization
/// ```json
/// {
///   "code": "NOT_FOUND",
///   "message": "Ingredient not found: 0b7c..."
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,

    /// Every blocking recipe violation, for `RECIPE_INVALID`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violations: Option<Vec<RecipeViolation>>,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found (404)
    NotFound,

    /// Name already used in the collection (409)
    DuplicateName,

    /// Still referenced by another record (409)
    InUse,

    /// A recipe needs more than is stocked (409)
    InsufficientStock,

    /// Recipe rules failed (422)
    RecipeInvalid,

    /// Input validation failed (400)
    ValidationError,

    /// Referenced ingredient does not exist (400)
    UnknownIngredient,

    /// Referenced packaging item does not exist (400)
    UnknownPackagingItem,

    /// Measurement could not be converted (400)
    InvalidConversion,

    /// Missing or invalid bearer token (401)
    Unauthorized,

    /// Storage could not be reached (503)
    BackendUnavailable,

    /// Internal server error (500)
    Internal,
}

impl ErrorCode {
    pub fn http_status(self) -> StatusCode {
        match self {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::DuplicateName | ErrorCode::InUse | ErrorCode::InsufficientStock => {
                StatusCode::CONFLICT
            }
            ErrorCode::RecipeInvalid => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::ValidationError
            | ErrorCode::UnknownIngredient
            | ErrorCode::UnknownPackagingItem
            | ErrorCode::InvalidConversion => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::BackendUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            violations: None,
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// Creates an unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Unauthorized, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::DuplicateName { entity, name } => ApiError::new(
                ErrorCode::DuplicateName,
                format!("{} named '{}' already exists", entity, name),
            ),
            DbError::InUse { entity, id } => ApiError::new(
                ErrorCode::InUse,
                format!("{} {} is still in use", entity, id),
            ),
            DbError::ForeignKeyViolation { message } => {
                tracing::warn!("Foreign key violation: {}", message);
                ApiError::validation("Invalid reference")
            }
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                ApiError::new(ErrorCode::BackendUnavailable, "Database unavailable")
            }
            DbError::PoolExhausted => {
                tracing::error!("Database pool exhausted");
                ApiError::new(ErrorCode::BackendUnavailable, "Database busy, try again")
            }
            DbError::MigrationFailed(e) => {
                tracing::error!("Database migration failed: {}", e);
                ApiError::internal("Database operation failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                ApiError::internal("Database operation failed")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::internal("Database operation failed")
            }
            DbError::Core(e) => ApiError::from(e),
        }
    }
}

/// Converts engine errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::InvalidConversion { .. } => {
                ApiError::new(ErrorCode::InvalidConversion, message)
            }
            CoreError::UnknownIngredient(_) => ApiError::new(ErrorCode::UnknownIngredient, message),
            CoreError::UnknownPackagingItem(_) => {
                ApiError::new(ErrorCode::UnknownPackagingItem, message)
            }
            CoreError::InsufficientStock { .. } => {
                ApiError::new(ErrorCode::InsufficientStock, message)
            }
            CoreError::RecipeInvalid(violations) => ApiError {
                code: ErrorCode::RecipeInvalid,
                message,
                violations: Some(violations),
            },
            CoreError::AmountOverflow { .. } | CoreError::Validation(_) => {
                ApiError::validation(message)
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code.http_status(), Json(self)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ErrorCode::NotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::InUse.http_status(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::RecipeInvalid.http_status(), 422);
        assert_eq!(ErrorCode::UnknownPackagingItem.http_status(), 400);
        assert_eq!(ErrorCode::BackendUnavailable.http_status(), 503);
    }

    #[test]
    fn test_recipe_invalid_carries_violations() {
        let err = ApiError::from(CoreError::RecipeInvalid(vec![RecipeViolation::NoIngredients]));
        assert_eq!(err.code, ErrorCode::RecipeInvalid);

        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "RECIPE_INVALID");
        assert_eq!(json["violations"][0]["kind"], "no_ingredients");
    }

    #[test]
    fn test_storage_details_are_not_leaked() {
        let err = ApiError::from(DbError::QueryFailed("near \"SELEC\": syntax error".to_string()));
        assert_eq!(err.code, ErrorCode::Internal);
        assert!(!err.message.contains("SELEC"));

        let json = serde_json::to_value(&err).unwrap();
        assert!(json.get("violations").is_none());
    }

    #[test]
    fn test_transient_db_errors_are_unavailable() {
        let err = ApiError::from(DbError::PoolExhausted);
        assert_eq!(err.code.http_status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_core_errors_pass_through_db_layer() {
        let err = ApiError::from(DbError::Core(CoreError::UnknownIngredient("abc".to_string())));
        assert_eq!(err.code, ErrorCode::UnknownIngredient);
        assert_eq!(err.message, "Ingredient not found: abc");
    }

    #[test]
    fn test_amount_overflow_is_bad_request() {
        let err = ApiError::from(CoreError::AmountOverflow {
            what: "bundle total price".to_string(),
        });
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.code.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Amount out of range: bundle total price is too large");
    }
}
