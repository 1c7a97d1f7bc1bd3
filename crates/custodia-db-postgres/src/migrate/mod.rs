//! Schema migration engine.
//!
//! Migrations are an ordered list of named steps, each a paired up/down
//! procedure run inside its own transaction. Applied steps are recorded in a
//! ledger table (`migrations`) in the same transaction as the schema change
//! itself, so the ledger can never disagree with the schema. Re-running
//! [`Migrator::migrate`] against an already-migrated database is a no-op.

mod migrator;
mod step;
mod steps;

pub use migrator::{LedgerRecord, Migrator};
pub use step::{MigrationStep, StepProc, StepResult, to_snake_case};
pub use steps::register_steps;
