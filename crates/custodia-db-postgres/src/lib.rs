//! PostgreSQL storage backend for the Custodia identity server.
//!
//! Provides:
//!
//! - Connection pool management with a retry/backoff dialer for databases
//!   that come up after this process does (container startup ordering)
//! - The schema migration engine: ordered, idempotent, resumable application
//!   of named up/down steps recorded in a ledger table
//! - Data-access stores for users, accounts and profiles, including the
//!   incremental diff-based UPDATE builder

pub mod config;
pub mod error;
pub mod migrate;
pub mod pool;
pub mod store;

pub use config::PostgresConfig;
pub use error::{PostgresError, Result};
pub use migrate::{MigrationStep, Migrator, register_steps};
pub use pool::{create_pool, dial_with_retry, spawn_dial};
pub use store::{AccountStore, ProfileStore, StoreError, UserStore};

/// PostgreSQL connection pool type alias.
pub type PgPool = sqlx_postgres::PgPool;
