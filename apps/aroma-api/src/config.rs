//! API server configuration.
//!
//! ## Sources (later wins)
//! ```text
//! defaults (this file)
//!    │
//!    ▼
//! aroma.toml        (path from AROMA_CONFIG, optional)
//!    │
//!    ▼
//! AROMA_* env vars  (AROMA_BIND_ADDR, AROMA_AUTH_MODE, AROMA_CORS_ORIGINS=a,b ...)
//! ```

use std::env;
use std::time::Duration;

use aroma_core::CapacityPolicy;
use aroma_db::{DbConfig, RetryPolicy};
use serde::{Deserialize, Serialize};

/// Environment variable naming the config file.
pub const CONFIG_PATH_VAR: &str = "AROMA_CONFIG";

/// Config file read when `AROMA_CONFIG` is unset.
pub const DEFAULT_CONFIG_FILE: &str = "aroma.toml";

/// Prefix for environment overrides.
const ENV_PREFIX: &str = "AROMA";

/// Development frontends allowed by default.
const DEFAULT_CORS_ORIGINS: &[&str] = &[
    "http://localhost:5173",
    "http://localhost:4173",
    "http://localhost:3000",
];

/// Who may call the API and whose records they see.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// Anonymous access, shared storage.
    #[default]
    Disabled,
    /// A valid token is required; everyone sees every record.
    Shared,
    /// A valid token is required; records are scoped to the token subject.
    PerUser,
}

impl AuthMode {
    pub fn requires_token(self) -> bool {
        !matches!(self, AuthMode::Disabled)
    }
}

/// API server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Socket address to listen on.
    pub bind_addr: String,

    /// SQLite database file.
    pub database_path: String,

    /// Pool size.
    pub max_connections: u32,

    pub auth_mode: AuthMode,

    /// HS256 secret shared with the identity provider.
    pub jwt_secret: Option<String>,

    /// What to do with a recipe whose volume exceeds its bundle capacity.
    pub capacity_policy: CapacityPolicy,

    /// Time budget for retrying a failed read, in milliseconds. 0 disables retries.
    pub read_retry_max_elapsed_ms: u64,

    /// Origins allowed by CORS.
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            bind_addr: "127.0.0.1:8000".to_string(),
            database_path: "./aroma.db".to_string(),
            max_connections: 5,
            auth_mode: AuthMode::Disabled,
            jwt_secret: None,
            capacity_policy: CapacityPolicy::Enforce,
            read_retry_max_elapsed_ms: 2000,
            cors_origins: DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect(),
        }
    }
}

impl ApiConfig {
    /// Loads configuration from the config file named by `AROMA_CONFIG`
    /// (default `aroma.toml`, optional) and `AROMA_*` environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let path = env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(&path)
    }

    /// Loads configuration with an explicit config file path.
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let defaults = ApiConfig::default();

        let settings = config::Config::builder()
            .set_default("bind_addr", defaults.bind_addr)?
            .set_default("database_path", defaults.database_path)?
            .set_default("max_connections", i64::from(defaults.max_connections))?
            .set_default("auth_mode", "disabled")?
            .set_default("capacity_policy", "enforce")?
            .set_default("read_retry_max_elapsed_ms", defaults.read_retry_max_elapsed_ms as i64)?
            .set_default("cors_origins", defaults.cors_origins)?
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("cors_origins"),
            )
            .build()?;

        let config: ApiConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Checks settings that depend on each other.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let has_secret = self
            .jwt_secret
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty());

        if self.auth_mode.requires_token() && !has_secret {
            return Err(ConfigError::MissingRequired("jwt_secret".to_string()));
        }

        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue("max_connections".to_string()));
        }

        Ok(())
    }

    /// Database settings derived from this configuration.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path)
            .max_connections(self.max_connections)
            .read_retry(RetryPolicy::with_max_elapsed(Duration::from_millis(
                self.read_retry_max_elapsed_ms,
            )))
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}
