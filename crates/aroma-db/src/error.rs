//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)          Engine Error (CoreError)          │
//! │       │                                    │                            │
//! │       ▼                                    ▼                            │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ApiError (in aroma-api) ← Serialized for the frontend                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Transient vs Permanent
//! Only failures to reach the database ([`DbError::is_transient`]) are worth
//! retrying. A constraint violation will fail the same way every time.

use aroma_core::CoreError;
use thiserror::Error;

/// Database operation errors.
///
/// These errors wrap sqlx errors and provide additional context
/// for debugging and user feedback.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    ///
    /// ## When This Occurs
    /// - ID doesn't exist
    /// - Record belongs to another owner
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A record with this name already exists for the owner.
    ///
    /// ## When This Occurs
    /// - Creating "Lavender" twice
    /// - Renaming a recipe to the name of another recipe
    #[error("{entity} named '{name}' already exists")]
    DuplicateName { entity: String, name: String },

    /// The record is still referenced and cannot be deleted.
    ///
    /// ## When This Occurs
    /// - Deleting a packaging item that is part of a bundle
    /// - Deleting an ingredient or bundle used by a recipe
    #[error("{entity} {id} is still in use")]
    InUse { entity: String, id: String },

    /// Foreign key constraint violation outside of a delete.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file can't be opened or created
    /// - Pool has been closed
    /// - Database is locked by another writer
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// SQL query failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// No connection became free before the acquire timeout.
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// A stored row could not be turned back into a domain value.
    #[error("Internal database error: {0}")]
    Internal(String),

    /// The engine rejected the write (validation, unknown reference, stock).
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl DbError {
    /// Creates a NotFound error.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Whether the operation may succeed if tried again.
    pub fn is_transient(&self) -> bool {
        matches!(self, DbError::PoolExhausted | DbError::ConnectionFailed(_))
    }

    /// Fills in the entity and name of a unique-constraint failure.
    ///
    /// ## Example
    /// ```rust,ignore
    /// query.execute(&pool).await
    ///     .map_err(|e| DbError::from(e).on_duplicate("Ingredient", &name))?;
    /// ```
    pub fn on_duplicate(self, entity: &str, name: &str) -> Self {
        match self {
            DbError::DuplicateName { .. } => DbError::DuplicateName {
                entity: entity.to_string(),
                name: name.to_string(),
            },
            other => other,
        }
    }

    /// Turns a foreign key failure during a delete into `InUse`.
    pub fn on_restrict(self, entity: &str, id: &str) -> Self {
        match self {
            DbError::ForeignKeyViolation { .. } => DbError::InUse {
                entity: entity.to_string(),
                id: id.to_string(),
            },
            other => other,
        }
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound                     → DbError::NotFound
/// UNIQUE constraint failed                     → DbError::DuplicateName
/// FOREIGN KEY constraint failed                → DbError::ForeignKeyViolation
/// database is locked / busy                    → DbError::ConnectionFailed
/// sqlx::Error::PoolTimedOut                    → DbError::PoolExhausted
/// sqlx::Error::PoolClosed / Io                 → DbError::ConnectionFailed
/// Other                                        → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite error messages for constraints:
                // UNIQUE: "UNIQUE constraint failed: index 'idx_..._owner_name'"
                // FK:     "FOREIGN KEY constraint failed"
                if msg.contains("UNIQUE constraint failed") {
                    DbError::DuplicateName {
                        entity: "Record".to_string(),
                        name: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("database is locked") || msg.contains("database is busy") {
                    DbError::ConnectionFailed(msg.to_string())
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            sqlx::Error::Io(e) => DbError::ConnectionFailed(e.to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(DbError::PoolExhausted.is_transient());
        assert!(DbError::ConnectionFailed("locked".into()).is_transient());
        assert!(!DbError::not_found("Recipe", "x").is_transient());
        assert!(!DbError::QueryFailed("syntax".into()).is_transient());
    }

    #[test]
    fn test_context_helpers() {
        let err = DbError::DuplicateName {
            entity: "Record".into(),
            name: "unknown".into(),
        }
        .on_duplicate("Ingredient", "Lavender");
        assert_eq!(err.to_string(), "Ingredient named 'Lavender' already exists");

        let err = DbError::ForeignKeyViolation {
            message: "FOREIGN KEY constraint failed".into(),
        }
        .on_restrict("PackagingItem", "abc");
        assert!(matches!(err, DbError::InUse { .. }));

        // Helpers leave unrelated errors alone
        let err = DbError::PoolExhausted.on_duplicate("Ingredient", "Lavender");
        assert!(matches!(err, DbError::PoolExhausted));
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: DbError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, DbError::NotFound { .. }));

        let err: DbError = sqlx::Error::PoolTimedOut.into();
        assert!(err.is_transient());
    }
}
