//! Server assembly: database provisioning, shared state and the run loop.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use custodia_db_postgres::{Migrator, PgPool, register_steps, spawn_dial};
use custodia_notifications::{Mailer, mailer_from_config};

use crate::config::AppConfig;
use crate::routes::api_router;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub mailer: Option<Arc<dyn Mailer>>,
    pub config: Arc<AppConfig>,
}

/// The assembled HTTP server.
pub struct Server {
    state: AppState,
    config: AppConfig,
}

impl Server {
    /// Provisions the database and assembles the shared state.
    ///
    /// The runtime pool is dialed on a background task with retry/backoff
    /// while migrations run on the migrator's own connections; the dial
    /// result is awaited only once it is actually needed.
    ///
    /// # Errors
    ///
    /// Returns an error if provisioning, migration or the dial fail.
    pub async fn build(config: AppConfig) -> anyhow::Result<Self> {
        // Kick off the runtime dial first; it retries while we provision.
        let dial = spawn_dial(config.storage.postgres.clone());

        let mut migrator = Migrator::connect(config.storage.postgres.clone())
            .await
            .context("migrator connect failed")?;
        register_steps(&mut migrator).context("step registration failed")?;
        migrator.migrate().await.context("migration failed")?;
        info!("Database migrated");

        let pool = dial
            .await
            .context("dial task panicked")?
            .context("database dial failed")?;

        let mailer = match mailer_from_config(&config.mailer) {
            Ok(mailer) => Some(Arc::from(mailer)),
            Err(err) => {
                info!(reason = %err, "Mailer disabled");
                None
            }
        };

        let state = AppState {
            pool,
            mailer,
            config: Arc::new(config.clone()),
        };

        Ok(Self { state, config })
    }

    /// Serves until interrupted.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound or the server
    /// fails while running.
    pub async fn run(self) -> anyhow::Result<()> {
        let addr = self.config.addr();
        let router = api_router().with_state(self.state);

        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("cannot bind {addr}"))?;

        info!(%addr, "Server listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("server error")?;

        info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
    }
}
