//! Migrator orchestration: ordered, idempotent apply and rollback.

use std::time::Duration;

use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_postgres::PgPool;
use time::OffsetDateTime;
use tokio::time::timeout;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::PostgresConfig;
use crate::error::{PostgresError, Result, is_undefined_table};
use crate::migrate::step::MigrationStep;
use crate::pool::{create_admin_pool, create_pool_lazy};

const LEDGER_TABLE: &str = "migrations";

/// A row of the migrations ledger.
#[derive(Debug, Clone)]
pub struct LedgerRecord {
    pub id: Uuid,
    pub name: String,
    pub up_fx: String,
    pub down_fx: String,
    pub is_applied: bool,
    pub created_at: OffsetDateTime,
}

/// Owns the migration step list, the control connections and the ledger.
///
/// Not designed for concurrent invocation: `migrate`, `rollback` and `reset`
/// assume a single caller against the target database. Steps are applied
/// strictly in registration order and rolled back in the exact reverse
/// order; later steps may depend on earlier steps' schema.
pub struct Migrator {
    cfg: PostgresConfig,
    /// Target application database.
    conn: PgPool,
    /// Server maintenance database, used only to create/drop the target.
    admin_conn: PgPool,
    schema: String,
    db: String,
    steps: Vec<MigrationStep>,
}

impl Migrator {
    /// Establishes the migrator's connections.
    ///
    /// The admin connection is opened and pinged eagerly; provisioning runs
    /// once at startup, so there is no retry here (contrast with the
    /// runtime dialer in [`crate::pool::dial_with_retry`]). The target
    /// database may not exist yet, so its pool connects lazily.
    ///
    /// # Errors
    ///
    /// Returns an error if configured names are not valid identifiers or if
    /// the admin connection cannot be established. Callers treat this as
    /// terminal.
    pub async fn connect(cfg: PostgresConfig) -> Result<Self> {
        cfg.validate_identifiers()?;

        let admin_conn = create_admin_pool(&cfg).await?;
        let conn = create_pool_lazy(&cfg)?;

        Ok(Self {
            schema: cfg.schema.clone(),
            db: cfg.database.clone(),
            cfg,
            conn,
            admin_conn,
            steps: Vec::new(),
        })
    }

    /// Appends a step to the ordered list.
    ///
    /// # Errors
    ///
    /// Returns an error if another registered step has the same ledger name.
    pub fn add(&mut self, step: MigrationStep) -> Result<()> {
        if self.steps.iter().any(|s| s.name() == step.name()) {
            return Err(PostgresError::DuplicateStep(step.name().to_string()));
        }
        self.steps.push(step);
        Ok(())
    }

    /// Number of registered steps.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Pool on the target database.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.conn
    }

    /// Idempotently ensures the target database and the ledger table exist.
    ///
    /// Safe to call on every startup.
    ///
    /// # Errors
    ///
    /// Returns an error if a catalog probe or a create statement fails.
    pub async fn pre_setup(&self) -> Result<()> {
        if !self.db_exists().await? {
            self.create_db().await?;
        }

        if !self.ledger_table_exists().await? {
            self.create_ledger_table().await?;
        }

        Ok(())
    }

    /// Applies all pending steps in registration order.
    ///
    /// Steps already recorded in the ledger are skipped. Each pending step
    /// runs inside its own transaction; the ledger insert commits together
    /// with the step's schema change. The first failure rolls its
    /// transaction back and aborts the run; previously committed steps stay
    /// applied, so a rerun resumes where this one stopped.
    ///
    /// # Errors
    ///
    /// Returns an error naming the failing procedure.
    #[instrument(skip(self), fields(db = %self.db))]
    pub async fn migrate(&self) -> Result<()> {
        self.pre_setup().await?;

        for step in &self.steps {
            if self.is_applied(step.name()).await? {
                info!(step = step.name(), "Migration already applied, skipping");
                continue;
            }

            self.apply_step(step).await?;
        }

        Ok(())
    }

    /// Rolls back the most recently registered `steps` applied steps, in
    /// reverse registration order.
    ///
    /// The count is clamped to the number of registered steps. Steps without
    /// a ledger row are skipped without invoking their down procedure. The
    /// first down failure aborts the loop, matching `migrate`'s contract.
    ///
    /// # Errors
    ///
    /// Returns an error naming the failing procedure.
    #[instrument(skip(self), fields(db = %self.db))]
    pub async fn rollback(&self, steps: usize) -> Result<()> {
        let count = self.steps.len();
        if count == 0 {
            return Ok(());
        }

        let steps = steps.clamp(1, count);
        let stop_at = count - steps;

        for step in self.steps[stop_at..].iter().rev() {
            if !self.is_applied(step.name()).await? {
                info!(step = step.name(), "Rollback already executed, skipping");
                continue;
            }

            self.rollback_step(step).await?;
        }

        Ok(())
    }

    /// Rolls back every applied step.
    ///
    /// # Errors
    ///
    /// Returns an error naming the failing procedure.
    pub async fn rollback_all(&self) -> Result<()> {
        self.rollback(self.steps.len()).await
    }

    /// Rolls everything back and re-applies from the start.
    ///
    /// The first error aborts without attempting the second phase.
    ///
    /// # Errors
    ///
    /// Returns the first error from either phase.
    pub async fn soft_reset(&self) -> Result<()> {
        self.rollback_all().await?;
        self.migrate().await
    }

    /// Drops and recreates the target database, then migrates from empty.
    ///
    /// Other connections to the target database are forcibly terminated
    /// first. A drop failure is tolerated (the database may simply not
    /// exist yet); create and migrate failures are not.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be recreated or migrated.
    #[instrument(skip(self), fields(db = %self.db))]
    pub async fn reset(&self) -> Result<()> {
        if let Err(err) = self.drop_db().await {
            warn!(error = %err, "Drop database failed, continuing");
        }

        self.create_db().await?;
        self.migrate().await
    }

    /// Reads the ledger, oldest first.
    ///
    /// Returns an empty list when the ledger table does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails for any other reason.
    pub async fn status(&self) -> Result<Vec<LedgerRecord>> {
        let st = format!(
            "SELECT id, name, up_fx, down_fx, is_applied, created_at
             FROM {}.{} ORDER BY created_at",
            self.schema, LEDGER_TABLE
        );

        let rows: Vec<(Uuid, String, String, String, bool, OffsetDateTime)> =
            match query_as(&st).fetch_all(&self.conn).await {
                Ok(rows) => rows,
                Err(err) if is_undefined_table(&err) => return Ok(Vec::new()),
                Err(err) => return Err(err.into()),
            };

        Ok(rows
            .into_iter()
            .map(|(id, name, up_fx, down_fx, is_applied, created_at)| LedgerRecord {
                id,
                name,
                up_fx,
                down_fx,
                is_applied,
                created_at,
            })
            .collect())
    }

    async fn apply_step(&self, step: &MigrationStep) -> Result<()> {
        let deadline = Duration::from_secs(self.cfg.step_timeout_secs);
        let mut tx = self.conn.begin().await?;

        match timeout(deadline, (step.up())(&mut *tx)).await {
            Err(_) => {
                tx.rollback().await.ok();
                return Err(PostgresError::StepTimeout {
                    name: step.up_fx().to_string(),
                    secs: self.cfg.step_timeout_secs,
                });
            }
            Ok(Err(err)) => {
                tx.rollback().await.ok();
                return Err(PostgresError::migration(step.up_fx(), err));
            }
            Ok(Ok(())) => {}
        }

        // Ledger insert rides the step's own transaction: the record and the
        // schema change commit or roll back together.
        let st = format!(
            "INSERT INTO {}.{} (id, name, up_fx, down_fx, is_applied, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
            self.schema, LEDGER_TABLE
        );

        let recorded = query(&st)
            .bind(Uuid::new_v4())
            .bind(step.name())
            .bind(step.up_fx())
            .bind(step.down_fx())
            .bind(true)
            .bind(OffsetDateTime::now_utc())
            .execute(&mut *tx)
            .await;

        if let Err(err) = recorded {
            tx.rollback().await.ok();
            return Err(PostgresError::migration(step.up_fx(), err));
        }

        tx.commit().await?;
        info!(step = step.up_fx(), "Migration executed");
        Ok(())
    }

    async fn rollback_step(&self, step: &MigrationStep) -> Result<()> {
        let deadline = Duration::from_secs(self.cfg.step_timeout_secs);
        let mut tx = self.conn.begin().await?;

        match timeout(deadline, (step.down())(&mut *tx)).await {
            Err(_) => {
                tx.rollback().await.ok();
                return Err(PostgresError::StepTimeout {
                    name: step.down_fx().to_string(),
                    secs: self.cfg.step_timeout_secs,
                });
            }
            Ok(Err(err)) => {
                tx.rollback().await.ok();
                return Err(PostgresError::rollback(step.down_fx(), err));
            }
            Ok(Ok(())) => {}
        }

        let st = format!(
            "DELETE FROM {}.{} WHERE name = $1 AND is_applied = true",
            self.schema, LEDGER_TABLE
        );

        let deleted = query(&st).bind(step.name()).execute(&mut *tx).await;
        if let Err(err) = deleted {
            tx.rollback().await.ok();
            return Err(PostgresError::rollback(step.down_fx(), err));
        }

        tx.commit().await?;
        info!(step = step.down_fx(), "Rollback executed");
        Ok(())
    }

    async fn is_applied(&self, name: &str) -> Result<bool> {
        let st = format!(
            "SELECT is_applied FROM {}.{} WHERE name = $1 AND is_applied = true",
            self.schema, LEDGER_TABLE
        );

        let row: Option<(bool,)> = query_as(&st).bind(name).fetch_optional(&self.conn).await?;

        Ok(row.is_some())
    }

    async fn db_exists(&self) -> Result<bool> {
        let (exists,): (bool,) = query_as(
            "SELECT EXISTS (
                SELECT datname FROM pg_catalog.pg_database
                WHERE lower(datname) = lower($1)
            )",
        )
        .bind(&self.db)
        .fetch_one(&self.admin_conn)
        .await?;

        Ok(exists)
    }

    async fn ledger_table_exists(&self) -> Result<bool> {
        let (exists,): (bool,) = query_as(
            "SELECT EXISTS (
                SELECT 1
                FROM pg_catalog.pg_class c
                JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
                WHERE n.nspname = $1
                AND c.relname = $2
                AND c.relkind = 'r'
            )",
        )
        .bind(&self.schema)
        .bind(LEDGER_TABLE)
        .fetch_one(&self.conn)
        .await?;

        Ok(exists)
    }

    async fn create_db(&self) -> Result<()> {
        self.terminate_backends().await?;

        let st = format!("CREATE DATABASE {}", self.db);
        query(&st).execute(&self.admin_conn).await?;

        info!(db = %self.db, "Database created");
        Ok(())
    }

    async fn drop_db(&self) -> Result<()> {
        self.terminate_backends().await?;

        let st = format!("DROP DATABASE {}", self.db);
        query(&st).execute(&self.admin_conn).await?;

        info!(db = %self.db, "Database dropped");
        Ok(())
    }

    async fn terminate_backends(&self) -> Result<()> {
        query(
            "SELECT pg_terminate_backend(pid) FROM pg_stat_activity
             WHERE datname = $1 AND pid <> pg_backend_pid()",
        )
        .bind(&self.db)
        .execute(&self.admin_conn)
        .await?;

        Ok(())
    }

    async fn create_ledger_table(&self) -> Result<()> {
        let st = format!(
            "CREATE TABLE {}.{} (
                id UUID PRIMARY KEY,
                name VARCHAR(64),
                up_fx VARCHAR(64),
                down_fx VARCHAR(64),
                is_applied BOOLEAN,
                created_at TIMESTAMPTZ
            )",
            self.schema, LEDGER_TABLE
        );

        let mut tx = self.conn.begin().await?;
        query(&st).execute(&mut *tx).await?;
        tx.commit().await?;

        info!(table = LEDGER_TABLE, "Migrations ledger created");
        Ok(())
    }
}
