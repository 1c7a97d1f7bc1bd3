//! Migration engine integration tests.
//!
//! Each test provisions its own PostgreSQL container and verifies one of the
//! engine's contracts: idempotent apply, strict ordering, per-step atomicity,
//! reverse-order rollback, full round-trips and skip-on-missing rollback.

mod common;

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::future::BoxFuture;
use sqlx_core::query::query;
use sqlx_postgres::PgConnection;

use custodia_db_postgres::migrate::StepResult;
use custodia_db_postgres::{MigrationStep, Migrator, PostgresError, register_steps};

use common::{start_postgres, table_names};

fn create_alpha(conn: &mut PgConnection) -> BoxFuture<'_, StepResult> {
    Box::pin(async move {
        query("CREATE TABLE alpha (id INT PRIMARY KEY)")
            .execute(&mut *conn)
            .await?;
        Ok(())
    })
}

fn drop_alpha(conn: &mut PgConnection) -> BoxFuture<'_, StepResult> {
    Box::pin(async move {
        query("DROP TABLE alpha").execute(&mut *conn).await?;
        Ok(())
    })
}

fn create_beta(conn: &mut PgConnection) -> BoxFuture<'_, StepResult> {
    Box::pin(async move {
        query("CREATE TABLE beta (id INT PRIMARY KEY, alpha_id INT REFERENCES alpha(id))")
            .execute(&mut *conn)
            .await?;
        Ok(())
    })
}

fn drop_beta(conn: &mut PgConnection) -> BoxFuture<'_, StepResult> {
    Box::pin(async move {
        query("DROP TABLE beta").execute(&mut *conn).await?;
        Ok(())
    })
}

fn create_gamma(conn: &mut PgConnection) -> BoxFuture<'_, StepResult> {
    Box::pin(async move {
        query("CREATE TABLE gamma (id INT PRIMARY KEY, beta_id INT REFERENCES beta(id))")
            .execute(&mut *conn)
            .await?;
        Ok(())
    })
}

fn drop_gamma(conn: &mut PgConnection) -> BoxFuture<'_, StepResult> {
    Box::pin(async move {
        query("DROP TABLE gamma").execute(&mut *conn).await?;
        Ok(())
    })
}

fn alpha_step() -> MigrationStep {
    MigrationStep::new("CreateAlphaTable", "DropAlphaTable", create_alpha, drop_alpha)
}

fn beta_step() -> MigrationStep {
    MigrationStep::new("CreateBetaTable", "DropBetaTable", create_beta, drop_beta)
}

fn gamma_step() -> MigrationStep {
    MigrationStep::new("CreateGammaTable", "DropGammaTable", create_gamma, drop_gamma)
}

#[tokio::test]
async fn test_migrate_applies_registered_steps() {
    let (_container, config) = start_postgres("custodia_test").await;

    let mut migrator = Migrator::connect(config).await.expect("connect");
    register_steps(&mut migrator).expect("register");

    migrator.migrate().await.expect("migrate");

    let tables = table_names(migrator.pool()).await;
    assert!(tables.contains(&"users".to_string()), "Missing users table");
    assert!(tables.contains(&"accounts".to_string()), "Missing accounts table");
    assert!(tables.contains(&"profiles".to_string()), "Missing profiles table");
    assert!(tables.contains(&"migrations".to_string()), "Missing ledger table");

    let ledger = migrator.status().await.expect("status");
    let names: Vec<&str> = ledger.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(
        names,
        ["create_users_table", "create_accounts_table", "create_profiles_table"]
    );
    assert!(ledger.iter().all(|r| r.is_applied));
}

static APPLY_COUNT: AtomicUsize = AtomicUsize::new(0);

fn create_counted(conn: &mut PgConnection) -> BoxFuture<'_, StepResult> {
    Box::pin(async move {
        APPLY_COUNT.fetch_add(1, Ordering::SeqCst);
        query("CREATE TABLE counted (id INT)").execute(&mut *conn).await?;
        Ok(())
    })
}

fn drop_counted(conn: &mut PgConnection) -> BoxFuture<'_, StepResult> {
    Box::pin(async move {
        query("DROP TABLE counted").execute(&mut *conn).await?;
        Ok(())
    })
}

#[tokio::test]
async fn test_idempotent_apply() {
    let (_container, config) = start_postgres("custodia_test").await;

    let mut migrator = Migrator::connect(config).await.expect("connect");
    migrator
        .add(MigrationStep::new(
            "CreateCountedTable",
            "DropCountedTable",
            create_counted,
            drop_counted,
        ))
        .expect("add");

    migrator.migrate().await.expect("first migrate");
    let first_ledger = migrator.status().await.expect("status");
    assert_eq!(first_ledger.len(), 1);
    assert_eq!(APPLY_COUNT.load(Ordering::SeqCst), 1);

    // Second run: same schema, same ledger rows, zero step executions.
    migrator.migrate().await.expect("second migrate");
    let second_ledger = migrator.status().await.expect("status");

    assert_eq!(APPLY_COUNT.load(Ordering::SeqCst), 1, "Step must not re-run");
    assert_eq!(second_ledger.len(), 1);
    assert_eq!(second_ledger[0].id, first_ledger[0].id, "Ledger row must be untouched");
}

#[tokio::test]
async fn test_strict_ordering_applies_dependencies_first() {
    let (_container, config) = start_postgres("custodia_test").await;

    let mut migrator = Migrator::connect(config).await.expect("connect");
    migrator.add(alpha_step()).expect("add");
    migrator.add(beta_step()).expect("add");
    migrator.add(gamma_step()).expect("add");

    migrator.migrate().await.expect("migrate");

    let ledger = migrator.status().await.expect("status");
    let names: Vec<&str> = ledger.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(
        names,
        ["create_alpha_table", "create_beta_table", "create_gamma_table"]
    );
}

#[tokio::test]
async fn test_reversed_registration_fails_on_missing_dependency() {
    let (_container, config) = start_postgres("custodia_test").await;

    let mut migrator = Migrator::connect(config).await.expect("connect");
    migrator.add(gamma_step()).expect("add");
    migrator.add(beta_step()).expect("add");
    migrator.add(alpha_step()).expect("add");

    // Gamma references beta, which does not exist yet: ordering is
    // load-bearing, not incidental.
    let err = migrator.migrate().await.expect_err("must fail");
    assert!(matches!(err, PostgresError::Migration { .. }));
    assert!(err.to_string().contains("CreateGammaTable"));

    let tables = table_names(migrator.pool()).await;
    assert!(!tables.contains(&"gamma".to_string()));

    // Nothing was recorded for the failing step.
    let ledger = migrator.status().await.expect("status");
    assert!(ledger.is_empty());
}

fn create_atomic_partial(conn: &mut PgConnection) -> BoxFuture<'_, StepResult> {
    Box::pin(async move {
        query("CREATE TABLE atomic_probe (id INT)")
            .execute(&mut *conn)
            .await?;
        // Second statement fails: the whole step must roll back.
        query("INSERT INTO no_such_table VALUES (1)")
            .execute(&mut *conn)
            .await?;
        Ok(())
    })
}

fn drop_atomic_partial(conn: &mut PgConnection) -> BoxFuture<'_, StepResult> {
    Box::pin(async move {
        query("DROP TABLE atomic_probe").execute(&mut *conn).await?;
        Ok(())
    })
}

#[tokio::test]
async fn test_atomic_step_rolls_back_partial_changes() {
    let (_container, config) = start_postgres("custodia_test").await;

    let mut migrator = Migrator::connect(config).await.expect("connect");
    migrator.add(alpha_step()).expect("add");
    migrator
        .add(MigrationStep::new(
            "CreateAtomicProbe",
            "DropAtomicProbe",
            create_atomic_partial,
            drop_atomic_partial,
        ))
        .expect("add");

    let err = migrator.migrate().await.expect_err("must fail");
    assert!(err.to_string().contains("CreateAtomicProbe"));

    // First statement's table is gone with the transaction.
    let tables = table_names(migrator.pool()).await;
    assert!(tables.contains(&"alpha".to_string()));
    assert!(!tables.contains(&"atomic_probe".to_string()));

    // Ledger shows the failed step as not applied, the earlier one as applied.
    let ledger = migrator.status().await.expect("status");
    let names: Vec<&str> = ledger.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["create_alpha_table"]);
}

static ROLLBACK_ORDER: Mutex<Vec<&'static str>> = Mutex::new(Vec::new());

fn drop_beta_recorded(conn: &mut PgConnection) -> BoxFuture<'_, StepResult> {
    Box::pin(async move {
        query("DROP TABLE beta").execute(&mut *conn).await?;
        ROLLBACK_ORDER.lock().unwrap().push("beta");
        Ok(())
    })
}

fn drop_gamma_recorded(conn: &mut PgConnection) -> BoxFuture<'_, StepResult> {
    Box::pin(async move {
        query("DROP TABLE gamma").execute(&mut *conn).await?;
        ROLLBACK_ORDER.lock().unwrap().push("gamma");
        Ok(())
    })
}

#[tokio::test]
async fn test_rollback_reverse_order() {
    let (_container, config) = start_postgres("custodia_test").await;

    let mut migrator = Migrator::connect(config).await.expect("connect");
    migrator.add(alpha_step()).expect("add");
    migrator
        .add(MigrationStep::new(
            "CreateBetaTable",
            "DropBetaTable",
            create_beta,
            drop_beta_recorded,
        ))
        .expect("add");
    migrator
        .add(MigrationStep::new(
            "CreateGammaTable",
            "DropGammaTable",
            create_gamma,
            drop_gamma_recorded,
        ))
        .expect("add");

    migrator.migrate().await.expect("migrate");
    migrator.rollback(2).await.expect("rollback");

    // Gamma undone before beta.
    assert_eq!(*ROLLBACK_ORDER.lock().unwrap(), ["gamma", "beta"]);

    let tables = table_names(migrator.pool()).await;
    assert!(tables.contains(&"alpha".to_string()), "Alpha must survive");
    assert!(!tables.contains(&"beta".to_string()));
    assert!(!tables.contains(&"gamma".to_string()));

    let ledger = migrator.status().await.expect("status");
    let names: Vec<&str> = ledger.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["create_alpha_table"]);
}

#[tokio::test]
async fn test_migrate_rollback_migrate_round_trip() {
    let (_container, config) = start_postgres("custodia_test").await;

    let mut migrator = Migrator::connect(config).await.expect("connect");
    register_steps(&mut migrator).expect("register");

    migrator.migrate().await.expect("migrate");
    migrator.rollback_all().await.expect("rollback all");

    let tables = table_names(migrator.pool()).await;
    assert!(!tables.contains(&"users".to_string()));
    assert!(migrator.status().await.expect("status").is_empty());

    migrator.migrate().await.expect("re-migrate");

    let tables = table_names(migrator.pool()).await;
    assert!(tables.contains(&"users".to_string()));
    assert!(tables.contains(&"accounts".to_string()));
    assert!(tables.contains(&"profiles".to_string()));
    assert_eq!(migrator.status().await.expect("status").len(), 3);
}

static SKIPPED_DOWN_CALLS: AtomicUsize = AtomicUsize::new(0);

fn create_unapplied(conn: &mut PgConnection) -> BoxFuture<'_, StepResult> {
    Box::pin(async move {
        query("CREATE TABLE unapplied (id INT)").execute(&mut *conn).await?;
        Ok(())
    })
}

fn drop_unapplied(conn: &mut PgConnection) -> BoxFuture<'_, StepResult> {
    Box::pin(async move {
        SKIPPED_DOWN_CALLS.fetch_add(1, Ordering::SeqCst);
        query("DROP TABLE unapplied").execute(&mut *conn).await?;
        Ok(())
    })
}

#[tokio::test]
async fn test_rollback_skips_unapplied_step() {
    let (_container, config) = start_postgres("custodia_test").await;

    let mut migrator = Migrator::connect(config).await.expect("connect");
    migrator
        .add(MigrationStep::new(
            "CreateUnappliedTable",
            "DropUnappliedTable",
            create_unapplied,
            drop_unapplied,
        ))
        .expect("add");

    // Ledger exists but the step was never applied: rollback must be a
    // no-op that never invokes the down procedure.
    migrator.pre_setup().await.expect("pre_setup");
    migrator.rollback(1).await.expect("rollback");
    assert_eq!(SKIPPED_DOWN_CALLS.load(Ordering::SeqCst), 0);

    // Applied then rolled back twice: the second rollback is a no-op too.
    migrator.migrate().await.expect("migrate");
    migrator.rollback(1).await.expect("rollback");
    migrator.rollback(1).await.expect("rollback again");
    assert_eq!(SKIPPED_DOWN_CALLS.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_soft_reset_reapplies_everything() {
    let (_container, config) = start_postgres("custodia_test").await;

    let mut migrator = Migrator::connect(config).await.expect("connect");
    register_steps(&mut migrator).expect("register");

    migrator.migrate().await.expect("migrate");
    migrator.soft_reset().await.expect("soft reset");

    let ledger = migrator.status().await.expect("status");
    assert_eq!(ledger.len(), 3);
    let tables = table_names(migrator.pool()).await;
    assert!(tables.contains(&"users".to_string()));
}

#[tokio::test]
async fn test_reset_recreates_database() {
    let (_container, config) = start_postgres("custodia_test").await;

    let mut migrator = Migrator::connect(config).await.expect("connect");
    register_steps(&mut migrator).expect("register");

    migrator.migrate().await.expect("migrate");

    // Dirty the schema outside the migration flow, then reset.
    query("CREATE TABLE stray (id INT)")
        .execute(migrator.pool())
        .await
        .expect("create stray");

    migrator.reset().await.expect("reset");

    let tables = table_names(migrator.pool()).await;
    assert!(!tables.contains(&"stray".to_string()), "Reset must start from empty");
    assert!(tables.contains(&"users".to_string()));
    assert_eq!(migrator.status().await.expect("status").len(), 3);
}

#[tokio::test]
async fn test_duplicate_step_name_rejected() {
    let (_container, config) = start_postgres("custodia_test").await;

    let mut migrator = Migrator::connect(config).await.expect("connect");
    migrator.add(alpha_step()).expect("add");

    let err = migrator.add(alpha_step()).expect_err("duplicate must fail");
    assert!(matches!(err, PostgresError::DuplicateStep(_)));
}

fn hang_forever(conn: &mut PgConnection) -> BoxFuture<'_, StepResult> {
    Box::pin(async move {
        query("SELECT pg_sleep(30)").execute(&mut *conn).await?;
        Ok(())
    })
}

fn noop(conn: &mut PgConnection) -> BoxFuture<'_, StepResult> {
    let _ = conn;
    Box::pin(async { Ok(()) })
}

#[tokio::test]
async fn test_step_deadline_aborts_hung_statement() {
    let (_container, mut config) = start_postgres("custodia_test").await;
    config.step_timeout_secs = 1;

    let mut migrator = Migrator::connect(config).await.expect("connect");
    migrator
        .add(MigrationStep::new("HangForever", "NoOp", hang_forever, noop))
        .expect("add");

    let err = migrator.migrate().await.expect_err("must time out");
    assert!(matches!(err, PostgresError::StepTimeout { .. }));

    let ledger = migrator.status().await.expect("status");
    assert!(ledger.is_empty());
}
