use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "custodia")]
#[command(about = "Custodia CLI — provision and inspect the identity database")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (overrides CUSTODIA_CONFIG env var)
    #[arg(short, long, global = true, env = "CUSTODIA_CONFIG")]
    pub config: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Apply all pending migration steps
    Migrate,
    /// Roll back the most recently applied steps
    Rollback(RollbackArgs),
    /// Roll everything back, then re-apply from the start
    SoftReset,
    /// Drop and recreate the database, then migrate from empty
    Reset,
    /// Show the migrations ledger
    Status,
}

#[derive(clap::Args)]
pub struct RollbackArgs {
    /// Number of steps to roll back
    #[arg(long, default_value_t = 1)]
    pub steps: usize,
}
