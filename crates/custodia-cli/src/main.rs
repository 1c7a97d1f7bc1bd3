mod cli;

use anyhow::{Context, Result};
use clap::Parser;

use custodia_db_postgres::{Migrator, register_steps};
use custodia_server::config::loader::load_config;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Provisioning-time connection failures are terminal by design: there is
    // nothing to retry against at this point.
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let cfg = load_config(cli.config.as_deref()).map_err(|e| anyhow::anyhow!(e))?;

    let mut migrator = Migrator::connect(cfg.storage.postgres.clone())
        .await
        .context("cannot connect to the database server")?;
    register_steps(&mut migrator)?;

    match cli.command {
        Commands::Migrate => {
            migrator.migrate().await?;
            println!("Migrated ({} steps registered)", migrator.step_count());
        }
        Commands::Rollback(args) => {
            migrator.rollback(args.steps).await?;
            println!("Rolled back {} step(s)", args.steps);
        }
        Commands::SoftReset => {
            migrator.soft_reset().await?;
            println!("Soft reset complete");
        }
        Commands::Reset => {
            migrator.reset().await?;
            println!("Reset complete");
        }
        Commands::Status => {
            let ledger = migrator.status().await?;
            if ledger.is_empty() {
                println!("No migrations applied");
            } else {
                for record in ledger {
                    println!(
                        "{}  {}  (up: {}, down: {})",
                        record.created_at, record.name, record.up_fx, record.down_fx
                    );
                }
            }
        }
    }

    Ok(())
}
