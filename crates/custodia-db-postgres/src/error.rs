//! Error types for the PostgreSQL storage backend.

use sqlx_core::error::Error as SqlxError;

/// PostgreSQL error code for undefined table (42P01).
pub const PG_UNDEFINED_TABLE: &str = "42P01";

/// PostgreSQL error code for unique violation (23505).
pub const PG_UNIQUE_VIOLATION: &str = "23505";

/// Checks if a sqlx error has a specific PostgreSQL error code.
pub fn has_pg_error_code(err: &SqlxError, code: &str) -> bool {
    if let SqlxError::Database(db_err) = err {
        db_err.code().as_deref() == Some(code)
    } else {
        false
    }
}

/// Checks if a sqlx error is "undefined table" (42P01).
pub fn is_undefined_table(err: &SqlxError) -> bool {
    has_pg_error_code(err, PG_UNDEFINED_TABLE)
}

/// Checks if a sqlx error is "unique violation" (23505).
pub fn is_unique_violation(err: &SqlxError) -> bool {
    has_pg_error_code(err, PG_UNIQUE_VIOLATION)
}

/// Errors specific to the PostgreSQL backend.
#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    /// Database connection error.
    #[error("Database connection error: {0}")]
    Connection(#[from] SqlxError),

    /// All dial attempts failed; terminal result of the retry loop.
    #[error("Postgres max number of connection attempts reached ({attempts})")]
    RetriesExhausted { attempts: u32 },

    /// A migration step's up procedure failed.
    #[error("cannot run migration '{name}': {message}")]
    Migration { name: String, message: String },

    /// A migration step's down procedure failed.
    #[error("cannot run rollback '{name}': {message}")]
    Rollback { name: String, message: String },

    /// A step exceeded its deadline.
    #[error("migration step '{name}' timed out after {secs}s")]
    StepTimeout { name: String, secs: u64 },

    /// Two registered steps resolved to the same ledger name.
    #[error("duplicate migration step name '{0}'")]
    DuplicateStep(String),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl PostgresError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a new migration error for the named up procedure.
    #[must_use]
    pub fn migration(name: impl Into<String>, message: impl ToString) -> Self {
        Self::Migration {
            name: name.into(),
            message: message.to_string(),
        }
    }

    /// Creates a new rollback error for the named down procedure.
    #[must_use]
    pub fn rollback(name: impl Into<String>, message: impl ToString) -> Self {
        Self::Rollback {
            name: name.into(),
            message: message.to_string(),
        }
    }
}

/// Result type alias for PostgreSQL operations.
pub type Result<T> = std::result::Result<T, PostgresError>;
