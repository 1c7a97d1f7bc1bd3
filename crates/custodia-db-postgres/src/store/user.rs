//! User storage.

use sqlx_core::query::query;
use sqlx_core::query_builder::QueryBuilder;
use sqlx_core::row::Row;
use sqlx_postgres::{PgPool, PgRow, Postgres};
use time::OffsetDateTime;
use uuid::Uuid;

use custodia_core::{Audit, CoreError, Identification, User};

use crate::error::is_unique_violation;
use crate::store::{StoreError, StoreResult};

const SELECT_COLUMNS: &str = "id, tenant_id, slug, username, password_digest, email, \
     given_name, middle_names, family_name, confirmation_token, is_confirmed, \
     locale, base_tz, current_tz, starts_at, ends_at, is_active, is_deleted, \
     created_by_id, updated_by_id, created_at, updated_at";

/// User store operations.
pub struct UserStore<'a> {
    pool: &'a PgPool,
}

impl<'a> UserStore<'a> {
    /// Create a new user store with a connection pool reference.
    #[must_use]
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new user, assigning id, slug, digest and audit stamps.
    ///
    /// # Errors
    ///
    /// Returns a conflict error when the username, email or slug is already
    /// taken; any other database failure is passed through.
    pub async fn create(&self, user: &mut User) -> StoreResult<()> {
        user.set_create_values()?;

        let st = format!(
            "INSERT INTO users ({SELECT_COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                     $15, $16, $17, $18, $19, $20, $21, $22)"
        );

        let res = query(&st)
            .bind(user.identification.id)
            .bind(user.identification.tenant_id.clone())
            .bind(user.identification.slug.clone())
            .bind(user.username.clone())
            .bind(user.password_digest.clone())
            .bind(user.email.clone())
            .bind(user.given_name.clone())
            .bind(user.middle_names.clone())
            .bind(user.family_name.clone())
            .bind(user.confirmation_token.clone())
            .bind(user.is_confirmed)
            .bind(user.locale.clone())
            .bind(user.base_tz.clone())
            .bind(user.current_tz.clone())
            .bind(user.starts_at)
            .bind(user.ends_at)
            .bind(user.is_active)
            .bind(user.is_deleted)
            .bind(user.audit.created_by_id)
            .bind(user.audit.updated_by_id)
            .bind(user.audit.created_at)
            .bind(user.audit.updated_at)
            .execute(self.pool)
            .await;

        match res {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => Err(StoreError::Domain(
                CoreError::conflict("user", user.username.clone()),
            )),
            Err(err) => Err(err.into()),
        }
    }

    /// Fetch all users.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get_all(&self) -> StoreResult<Vec<User>> {
        let st = format!("SELECT {SELECT_COLUMNS} FROM users ORDER BY created_at");

        let users = query(&st)
            .try_map(from_row)
            .fetch_all(self.pool)
            .await?;

        Ok(users)
    }

    /// Find a user by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self, id: Uuid) -> StoreResult<Option<User>> {
        let st = format!("SELECT {SELECT_COLUMNS} FROM users WHERE id = $1");

        let user = query(&st)
            .bind(id)
            .try_map(from_row)
            .fetch_optional(self.pool)
            .await?;

        Ok(user)
    }

    /// Find a user by slug.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get_by_slug(&self, slug: &str) -> StoreResult<Option<User>> {
        let st = format!("SELECT {SELECT_COLUMNS} FROM users WHERE slug = $1");

        let user = query(&st)
            .bind(slug)
            .try_map(from_row)
            .fetch_optional(self.pool)
            .await?;

        Ok(user)
    }

    /// Find a user by username.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let st = format!("SELECT {SELECT_COLUMNS} FROM users WHERE username = $1");

        let user = query(&st)
            .bind(username)
            .try_map(from_row)
            .fetch_optional(self.pool)
            .await?;

        Ok(user)
    }

    /// Update a user, writing only the columns that changed.
    ///
    /// Fetches the stored row, diffs it field by field and builds the SET
    /// clause incrementally. Returns `false` without touching the database
    /// when nothing changed.
    ///
    /// # Errors
    ///
    /// Returns not-found if the user does not exist, or any database error.
    pub async fn update(&self, user: &mut User) -> StoreResult<bool> {
        let id = user.identification.id;
        let reference = self.get(id).await?.ok_or_else(|| {
            StoreError::Domain(CoreError::not_found("user", id.to_string()))
        })?;

        user.set_update_values()?;

        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE users SET ");
        let mut sep = qb.separated(", ");
        let mut changed = false;

        if user.username != reference.username {
            sep.push("username = ");
            sep.push_bind_unseparated(user.username.clone());
            changed = true;
        }
        if user.email != reference.email {
            sep.push("email = ");
            sep.push_bind_unseparated(user.email.clone());
            changed = true;
        }
        if user.password_digest != reference.password_digest {
            sep.push("password_digest = ");
            sep.push_bind_unseparated(user.password_digest.clone());
            changed = true;
        }
        if user.given_name != reference.given_name {
            sep.push("given_name = ");
            sep.push_bind_unseparated(user.given_name.clone());
            changed = true;
        }
        if user.middle_names != reference.middle_names {
            sep.push("middle_names = ");
            sep.push_bind_unseparated(user.middle_names.clone());
            changed = true;
        }
        if user.family_name != reference.family_name {
            sep.push("family_name = ");
            sep.push_bind_unseparated(user.family_name.clone());
            changed = true;
        }
        if user.locale != reference.locale {
            sep.push("locale = ");
            sep.push_bind_unseparated(user.locale.clone());
            changed = true;
        }
        if user.base_tz != reference.base_tz {
            sep.push("base_tz = ");
            sep.push_bind_unseparated(user.base_tz.clone());
            changed = true;
        }
        if user.current_tz != reference.current_tz {
            sep.push("current_tz = ");
            sep.push_bind_unseparated(user.current_tz.clone());
            changed = true;
        }
        if user.starts_at != reference.starts_at {
            sep.push("starts_at = ");
            sep.push_bind_unseparated(user.starts_at);
            changed = true;
        }
        if user.ends_at != reference.ends_at {
            sep.push("ends_at = ");
            sep.push_bind_unseparated(user.ends_at);
            changed = true;
        }
        if user.is_active != reference.is_active {
            sep.push("is_active = ");
            sep.push_bind_unseparated(user.is_active);
            changed = true;
        }
        if user.is_deleted != reference.is_deleted {
            sep.push("is_deleted = ");
            sep.push_bind_unseparated(user.is_deleted);
            changed = true;
        }

        if !changed {
            return Ok(false);
        }

        sep.push("updated_at = ");
        sep.push_bind_unseparated(user.audit.updated_at);

        qb.push(" WHERE id = ");
        qb.push_bind(id);

        qb.build().execute(self.pool).await?;

        Ok(true)
    }

    /// Delete a user by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn delete(&self, id: Uuid) -> StoreResult<()> {
        query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(())
    }

    /// Delete a user by slug.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn delete_by_slug(&self, slug: &str) -> StoreResult<()> {
        query("DELETE FROM users WHERE slug = $1")
            .bind(slug)
            .execute(self.pool)
            .await?;

        Ok(())
    }

    /// Confirm a signup: flips `is_confirmed` when the stored token matches.
    ///
    /// Returns `true` if a row was confirmed, `false` when the slug/token
    /// pair did not match an unconfirmed user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn confirm(&self, slug: &str, token: &str) -> StoreResult<bool> {
        let res = query(
            "UPDATE users
             SET is_confirmed = true, confirmation_token = NULL, updated_at = $3
             WHERE slug = $1 AND confirmation_token = $2 AND is_confirmed = false",
        )
        .bind(slug)
        .bind(token)
        .bind(OffsetDateTime::now_utc())
        .execute(self.pool)
        .await?;

        Ok(res.rows_affected() > 0)
    }
}

fn from_row(row: PgRow) -> std::result::Result<User, sqlx_core::error::Error> {
    Ok(User {
        identification: Identification {
            id: row.try_get("id")?,
            tenant_id: row.try_get("tenant_id")?,
            slug: row.try_get("slug")?,
        },
        username: row
            .try_get::<Option<String>, _>("username")?
            .unwrap_or_default(),
        password: String::new(),
        password_digest: row.try_get("password_digest")?,
        email: row
            .try_get::<Option<String>, _>("email")?
            .unwrap_or_default(),
        email_confirmation: String::new(),
        given_name: row.try_get("given_name")?,
        middle_names: row.try_get("middle_names")?,
        family_name: row.try_get("family_name")?,
        confirmation_token: row.try_get("confirmation_token")?,
        is_confirmed: row.try_get("is_confirmed")?,
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
