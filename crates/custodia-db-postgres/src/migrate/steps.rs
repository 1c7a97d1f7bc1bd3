//! The application's registered schema steps.
//!
//! Order matters: accounts and profiles reference `users(id)`, so the users
//! table must exist first.

use futures_util::future::BoxFuture;
use sqlx_core::query::query;
use sqlx_postgres::PgConnection;

use crate::error::Result;
use crate::migrate::migrator::Migrator;
use crate::migrate::step::{MigrationStep, StepResult};

/// Registers all schema steps on the migrator, in order.
///
/// # Errors
///
/// Returns an error on a duplicate step name.
pub fn register_steps(migrator: &mut Migrator) -> Result<()> {
    migrator.add(MigrationStep::new(
        "CreateUsersTable",
        "DropUsersTable",
        create_users_table,
        drop_users_table,
    ))?;
    migrator.add(MigrationStep::new(
        "CreateAccountsTable",
        "DropAccountsTable",
        create_accounts_table,
        drop_accounts_table,
    ))?;
    migrator.add(MigrationStep::new(
        "CreateProfilesTable",
        "DropProfilesTable",
        create_profiles_table,
        drop_profiles_table,
    ))?;
    Ok(())
}

fn create_users_table(conn: &mut PgConnection) -> BoxFuture<'_, StepResult> {
    Box::pin(async move {
        let st = "CREATE TABLE users
        (
            id UUID PRIMARY KEY,
            tenant_id VARCHAR(128),
            slug VARCHAR(64) UNIQUE,
            username VARCHAR(32) UNIQUE,
            password_digest VARCHAR(128),
            email VARCHAR(255) UNIQUE,
            given_name VARCHAR(32),
            middle_names VARCHAR(32),
            family_name VARCHAR(64)
        )";

        query(st).execute(&mut *conn).await?;

        let st = "ALTER TABLE users
            ADD COLUMN confirmation_token VARCHAR(36),
            ADD COLUMN is_confirmed BOOLEAN NOT NULL DEFAULT false,
            ADD COLUMN locale VARCHAR(32),
            ADD COLUMN base_tz VARCHAR(64),
            ADD COLUMN current_tz VARCHAR(64),
            ADD COLUMN starts_at TIMESTAMPTZ,
            ADD COLUMN ends_at TIMESTAMPTZ,
            ADD COLUMN is_active BOOLEAN NOT NULL DEFAULT true,
            ADD COLUMN is_deleted BOOLEAN NOT NULL DEFAULT false,
            ADD COLUMN created_by_id UUID,
            ADD COLUMN updated_by_id UUID,
            ADD COLUMN created_at TIMESTAMPTZ,
            ADD COLUMN updated_at TIMESTAMPTZ";

        query(st).execute(&mut *conn).await?;

        Ok(())
    })
}

fn drop_users_table(conn: &mut PgConnection) -> BoxFuture<'_, StepResult> {
    Box::pin(async move {
        query("DROP TABLE users").execute(&mut *conn).await?;
        Ok(())
    })
}

fn create_accounts_table(conn: &mut PgConnection) -> BoxFuture<'_, StepResult> {
    Box::pin(async move {
        let st = "CREATE TABLE accounts
        (
            id UUID PRIMARY KEY,
            tenant_id VARCHAR(128),
            slug VARCHAR(64) UNIQUE,
            owner_id UUID REFERENCES users(id) ON DELETE CASCADE,
            parent_id UUID,
            account_type VARCHAR(36),
            name VARCHAR(64),
            email VARCHAR(255)
        )";

        query(st).execute(&mut *conn).await?;

        let st = "ALTER TABLE accounts
            ADD COLUMN locale VARCHAR(32),
            ADD COLUMN base_tz VARCHAR(64),
            ADD COLUMN current_tz VARCHAR(64),
            ADD COLUMN starts_at TIMESTAMPTZ,
            ADD COLUMN ends_at TIMESTAMPTZ,
            ADD COLUMN is_active BOOLEAN NOT NULL DEFAULT true,
            ADD COLUMN is_deleted BOOLEAN NOT NULL DEFAULT false,
            ADD COLUMN created_by_id UUID REFERENCES users(id),
            ADD COLUMN updated_by_id UUID REFERENCES users(id),
            ADD COLUMN created_at TIMESTAMPTZ,
            ADD COLUMN updated_at TIMESTAMPTZ";

        query(st).execute(&mut *conn).await?;

        Ok(())
    })
}

fn drop_accounts_table(conn: &mut PgConnection) -> BoxFuture<'_, StepResult> {
    Box::pin(async move {
        query("DROP TABLE accounts").execute(&mut *conn).await?;
        Ok(())
    })
}

fn create_profiles_table(conn: &mut PgConnection) -> BoxFuture<'_, StepResult> {
    Box::pin(async move {
        let st = "CREATE TABLE profiles
        (
            id UUID PRIMARY KEY,
            tenant_id VARCHAR(128),
            slug VARCHAR(64) UNIQUE,
            owner_id UUID REFERENCES users(id) ON DELETE CASCADE,
            name VARCHAR(64),
            email VARCHAR(255),
            description TEXT,
            location VARCHAR(255),
            bio VARCHAR(255),
            moto VARCHAR(255),
            website VARCHAR(255),
            aniversary_date TIMESTAMPTZ,
            avatar_path VARCHAR(255),
            header_path VARCHAR(255)
        )";

        query(st).execute(&mut *conn).await?;

        let st = "ALTER TABLE profiles
            ADD COLUMN locale VARCHAR(32),
            ADD COLUMN base_tz VARCHAR(64),
            ADD COLUMN current_tz VARCHAR(64),
            ADD COLUMN is_active BOOLEAN NOT NULL DEFAULT true,
            ADD COLUMN is_deleted BOOLEAN NOT NULL DEFAULT false,
            ADD COLUMN created_by_id UUID REFERENCES users(id),
            ADD COLUMN updated_by_id UUID REFERENCES users(id),
            ADD COLUMN created_at TIMESTAMPTZ,
            ADD COLUMN updated_at TIMESTAMPTZ";

        query(st).execute(&mut *conn).await?;

        Ok(())
    })
}

fn drop_profiles_table(conn: &mut PgConnection) -> BoxFuture<'_, StepResult> {
    Box::pin(async move {
        query("DROP TABLE profiles").execute(&mut *conn).await?;
        Ok(())
    })
}
