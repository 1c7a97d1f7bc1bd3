//! Shared test harness: one PostgreSQL container per test.
#![allow(dead_code)]

use custodia_db_postgres::PostgresConfig;
use testcontainers::ContainerAsync;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::postgres::Postgres;

/// Starts a PostgreSQL container and returns it with a config pointing at it.
///
/// The container must be kept alive for the duration of the test.
pub async fn start_postgres(database: &str) -> (ContainerAsync<Postgres>, PostgresConfig) {
    let container = Postgres::default()
        .start()
        .await
        .expect("Failed to start PostgreSQL container");

    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("Failed to get port");

    let config = PostgresConfig {
        host: "localhost".into(),
        port,
        user: "postgres".into(),
        password: "postgres".into(),
        database: database.into(),
        admin_database: "postgres".into(),
        pool_size: 5,
        max_retries: 2,
        retry_base_ms: 100,
        retry_cap_ms: 1000,
        step_timeout_secs: 30,
        ..PostgresConfig::default()
    };

    (container, config)
}

/// Lists table names in the public schema.
pub async fn table_names(pool: &sqlx_postgres::PgPool) -> Vec<String> {
    let rows: Vec<(String,)> = sqlx_core::query_as::query_as(
        "SELECT tablename FROM pg_tables WHERE schemaname = 'public' ORDER BY tablename",
    )
    .fetch_all(pool)
    .await
    .expect("Failed to query tables");

    rows.into_iter().map(|(name,)| name).collect()
}
