//! Bearer token authentication.
//!
//! Tokens are HS256 JWTs signed by the identity provider with the secret
//! from `jwt_secret`. The verified identity reaches handlers as a
//! [`UserContext`] extractor, and its `owner()` is what repositories filter on.
//!
//! ```text
//! Authorization: Bearer <jwt>
//!        │
//!        ▼
//!  auth_mode ── disabled ──► UserContext { subject: None, owner: None }
//!        │
//!        ├──── shared ────► validate ──► UserContext { subject, owner: None }
//!        │
//!        └──── per_user ──► validate ──► UserContext { subject, owner: subject }
//! ```

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::AuthMode;
use crate::error::ApiError;
use crate::state::AppState;

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// JWT token manager.
pub struct JwtManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtManager {
    pub fn new(secret: &str) -> Self {
        JwtManager {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Signs a token for `subject`, valid for `lifetime_secs`.
    ///
    /// Used by tooling and tests; production tokens come from the identity
    /// provider.
    pub fn issue_token(&self, subject: &str, lifetime_secs: i64) -> Result<String, ApiError> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(lifetime_secs)).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ApiError::internal(format!("Failed to generate token: {}", e)))
    }

    /// Validates signature and expiry and returns the claims.
    pub fn validate_token(&self, token: &str) -> Result<Claims, ApiError> {
        let validation = Validation::new(Algorithm::HS256);

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| ApiError::unauthorized(format!("Invalid token: {}", e)))
    }
}

/// Extract bearer token from Authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

// =============================================================================
// User Context
// =============================================================================

/// Who is calling, and which records they may see.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserContext {
    /// Token subject, if a token was presented and verified.
    pub subject: Option<String>,

    /// Owner bucket for repository calls. `None` is the shared bucket.
    pub owner: Option<String>,
}

impl UserContext {
    pub fn anonymous() -> Self {
        UserContext::default()
    }

    /// Builds the context for a verified subject under `mode`.
    pub fn for_subject(mode: AuthMode, subject: String) -> Self {
        let owner = match mode {
            AuthMode::PerUser => Some(subject.clone()),
            AuthMode::Disabled | AuthMode::Shared => None,
        };
        UserContext {
            subject: Some(subject),
            owner,
        }
    }

    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }
}

impl FromRequestParts<AppState> for UserContext {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let mode = state.config.auth_mode;
        if !mode.requires_token() {
            return Ok(UserContext::anonymous());
        }

        let jwt = state
            .jwt
            .as_ref()
            .ok_or_else(|| ApiError::internal("Authentication is not configured"))?;

        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(extract_bearer_token)
            .ok_or_else(|| ApiError::unauthorized("Missing bearer token"))?;

        let claims = jwt.validate_token(token)?;
        tracing::debug!(subject = %claims.sub, "Authenticated request");

        Ok(UserContext::for_subject(mode, claims.sub))
    }
}
