//! Account storage.

use sqlx_core::query::query;
use sqlx_core::query_builder::QueryBuilder;
use sqlx_core::row::Row;
use sqlx_postgres::{PgPool, PgRow, Postgres};
use uuid::Uuid;

use custodia_core::{Account, Audit, CoreError, Identification};

use crate::error::is_unique_violation;
use crate::store::{StoreError, StoreResult};

const SELECT_COLUMNS: &str = "id, tenant_id, slug, owner_id, parent_id, account_type, name, \
     email, locale, base_tz, current_tz, starts_at, ends_at, is_active, is_deleted, \
     created_by_id, updated_by_id, created_at, updated_at";

/// Account store operations.
pub struct AccountStore<'a> {
    pool: &'a PgPool,
}

impl<'a> AccountStore<'a> {
    /// Create a new account store with a connection pool reference.
    #[must_use]
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new account, assigning id, slug and audit stamps.
    ///
    /// # Errors
    ///
    /// Returns a conflict error when the slug is already taken; any other
    /// database failure is passed through.
    pub async fn create(&self, account: &mut Account) -> StoreResult<()> {
        account.set_create_values()?;

        let st = format!(
            "INSERT INTO accounts ({SELECT_COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                     $15, $16, $17, $18, $19)"
        );

        let res = query(&st)
            .bind(account.identification.id)
            .bind(account.identification.tenant_id.clone())
            .bind(account.identification.slug.clone())
            .bind(account.owner_id)
            .bind(account.parent_id)
            .bind(account.account_type.clone())
            .bind(account.name.clone())
            .bind(account.email.clone())
            .bind(account.locale.clone())
            .bind(account.base_tz.clone())
            .bind(account.current_tz.clone())
            .bind(account.starts_at)
            .bind(account.ends_at)
            .bind(account.is_active)
            .bind(account.is_deleted)
            .bind(account.audit.created_by_id)
            .bind(account.audit.updated_by_id)
            .bind(account.audit.created_at)
            .bind(account.audit.updated_at)
            .execute(self.pool)
            .await;

        match res {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => Err(StoreError::Domain(
                CoreError::conflict("account", account.name.clone()),
            )),
            Err(err) => Err(err.into()),
        }
    }

    /// Fetch all accounts.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get_all(&self) -> StoreResult<Vec<Account>> {
        let st = format!("SELECT {SELECT_COLUMNS} FROM accounts ORDER BY created_at");

        let accounts = query(&st)
            .try_map(from_row)
            .fetch_all(self.pool)
            .await?;

        Ok(accounts)
    }

    /// Find an account by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self, id: Uuid) -> StoreResult<Option<Account>> {
        let st = format!("SELECT {SELECT_COLUMNS} FROM accounts WHERE id = $1");

        let account = query(&st)
            .bind(id)
            .try_map(from_row)
            .fetch_optional(self.pool)
            .await?;

        Ok(account)
    }

    /// Find an account by slug.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get_by_slug(&self, slug: &str) -> StoreResult<Option<Account>> {
        let st = format!("SELECT {SELECT_COLUMNS} FROM accounts WHERE slug = $1");

        let account = query(&st)
            .bind(slug)
            .try_map(from_row)
            .fetch_optional(self.pool)
            .await?;

        Ok(account)
    }

    /// Update an account, writing only the columns that changed.
    ///
    /// Returns `false` without touching the database when nothing changed.
    ///
    /// # Errors
    ///
    /// Returns not-found if the account does not exist, or any database
    /// error.
    pub async fn update(&self, account: &mut Account) -> StoreResult<bool> {
        let id = account.identification.id;
        let reference = self.get(id).await?.ok_or_else(|| {
            StoreError::Domain(CoreError::not_found("account", id.to_string()))
        })?;

        account.set_update_values();

        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE accounts SET ");
        let mut sep = qb.separated(", ");
        let mut changed = false;

        if account.name != reference.name {
            sep.push("name = ");
            sep.push_bind_unseparated(account.name.clone());
            changed = true;
        }
        if account.owner_id != reference.owner_id {
            sep.push("owner_id = ");
            sep.push_bind_unseparated(account.owner_id);
            changed = true;
        }
        if account.parent_id != reference.parent_id {
            sep.push("parent_id = ");
            sep.push_bind_unseparated(account.parent_id);
            changed = true;
        }
        if account.account_type != reference.account_type {
            sep.push("account_type = ");
            sep.push_bind_unseparated(account.account_type.clone());
            changed = true;
        }
        if account.email != reference.email {
            sep.push("email = ");
            sep.push_bind_unseparated(account.email.clone());
            changed = true;
        }
        if account.locale != reference.locale {
            sep.push("locale = ");
            sep.push_bind_unseparated(account.locale.clone());
            changed = true;
        }
        if account.base_tz != reference.base_tz {
            sep.push("base_tz = ");
            sep.push_bind_unseparated(account.base_tz.clone());
            changed = true;
        }
        if account.current_tz != reference.current_tz {
            sep.push("current_tz = ");
            sep.push_bind_unseparated(account.current_tz.clone());
            changed = true;
        }
        if account.starts_at != reference.starts_at {
            sep.push("starts_at = ");
            sep.push_bind_unseparated(account.starts_at);
            changed = true;
        }
        if account.ends_at != reference.ends_at {
            sep.push("ends_at = ");
            sep.push_bind_unseparated(account.ends_at);
            changed = true;
        }
        if account.is_active != reference.is_active {
            sep.push("is_active = ");
            sep.push_bind_unseparated(account.is_active);
            changed = true;
        }
        if account.is_deleted != reference.is_deleted {
            sep.push("is_deleted = ");
            sep.push_bind_unseparated(account.is_deleted);
            changed = true;
        }

        if !changed {
            return Ok(false);
        }

        sep.push("updated_at = ");
        sep.push_bind_unseparated(account.audit.updated_at);

        qb.push(" WHERE id = ");
        qb.push_bind(id);

        qb.build().execute(self.pool).await?;

        Ok(true)
    }

    /// Delete an account by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn delete(&self, id: Uuid) -> StoreResult<()> {
        query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(())
    }

    /// Delete an account by slug.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn delete_by_slug(&self, slug: &str) -> StoreResult<()> {
        query("DELETE FROM accounts WHERE slug = $1")
            .bind(slug)
            .execute(self.pool)
            .await?;

        Ok(())
    }
}

fn from_row(row: PgRow) -> std::result::Result<Account, sqlx_core::error::Error> {
    Ok(Account {
        identification: Identification {
            id: row.try_get("id")?,
            tenant_id: row.try_get("tenant_id")?,
            slug: row.try_get("slug")?,
        },
        owner_id: row.try_get("owner_id")?,
        parent_id: row.try_get("parent_id")?,
        account_type: row.try_get("account_type")?,
        name: row
            .try_get::<Option<String>, _>("name")?
            .unwrap_or_default(),
        email: row.try_get("email")?,
        locale: row.try_get("locale")?,
        base_tz: row.try_get("base_tz")?,
        current_tz: row.try_get("current_tz")?,
        starts_at: row.try_get("starts_at")?,
        ends_at: row.try_get("ends_at")?,
        is_active: row.try_get("is_active")?,
        is_deleted: row.try_get("is_deleted")?,
        audit: Audit {
            created_by_id: row.try_get("created_by_id")?,
            updated_by_id: row.try_get("updated_by_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        },
    })
}
