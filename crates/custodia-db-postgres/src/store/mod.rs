//! Data-access stores for the identity tables.
//!
//! Stores borrow the pool and expose CRUD plus the incremental diff-based
//! UPDATE: only columns whose values differ from the stored row make it into
//! the SET clause.

mod account;
mod profile;
mod user;

pub use account::AccountStore;
pub use profile::ProfileStore;
pub use user::UserStore;

use custodia_core::CoreError;

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx_core::error::Error),

    /// Domain-level error (validation, conflict, not found).
    #[error(transparent)]
    Domain(#[from] CoreError),
}

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
