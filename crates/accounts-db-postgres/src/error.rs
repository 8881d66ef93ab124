//! Error types for the PostgreSQL storage backend.

use accounts_storage::StorageError;
use sqlx_core::error::Error as SqlxError;

/// PostgreSQL error code for undefined table (42P01).
pub const PG_UNDEFINED_TABLE: &str = "42P01";

/// Checks if a sqlx error has a specific PostgreSQL error code.
pub fn has_pg_error_code(err: &SqlxError, code: &str) -> bool {
    if let SqlxError::Database(db_err) = err {
        db_err.code().as_deref() == Some(code)
    } else {
        false
    }
}

/// Errors specific to the PostgreSQL storage backend.
#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    /// Database connection or query error.
    #[error("Database error: {0}")]
    Connection(#[from] SqlxError),

    #[error("Migration error: {0}")]
    Migration(String),

    /// A stored row could not be turned into an account.
    #[error("Invalid row: {message}")]
    InvalidRow { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl PostgresError {
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid_row(message: impl Into<String>) -> Self {
        Self::InvalidRow {
            message: message.into(),
        }
    }
}

impl From<PostgresError> for StorageError {
    fn from(err: PostgresError) -> Self {
        match err {
            PostgresError::Connection(e) => {
                if matches!(
                    e,
                    SqlxError::PoolTimedOut | SqlxError::PoolClosed | SqlxError::Io(_)
                ) {
                    StorageError::connection_error(e.to_string())
                } else if has_pg_error_code(&e, PG_UNDEFINED_TABLE) {
                    StorageError::internal(format!("schema is not migrated: {e}"))
                } else {
                    StorageError::internal(e.to_string())
                }
            }
            PostgresError::Migration(e) => StorageError::internal(format!("Migration error: {e}")),
            PostgresError::InvalidRow { message } => {
                StorageError::internal(format!("Invalid row: {message}"))
            }
            PostgresError::Config { message } => {
                StorageError::internal(format!("Configuration error: {message}"))
            }
        }
    }
}

/// Result type alias for PostgreSQL operations.
pub type Result<T> = std::result::Result<T, PostgresError>;
