//! Shared handler state.

use std::sync::Arc;

use aroma_db::Database;

use crate::auth::JwtManager;
use crate::config::ApiConfig;

/// Cloned into every handler. All fields are cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<ApiConfig>,
    /// Present whenever the auth mode requires a token.
    pub jwt: Option<Arc<JwtManager>>,
}

impl AppState {
    pub fn new(db: Database, config: ApiConfig) -> Self {
        let jwt = config
            .jwt_secret
            .as_deref()
            .filter(|_| config.auth_mode.requires_token())
            .map(|secret| Arc::new(JwtManager::new(secret)));

        AppState {
            db,
            config: Arc::new(config),
            jwt,
        }
    }
}
