//! Profile storage.

use sqlx_core::query::query;
use sqlx_core::query_builder::QueryBuilder;
use sqlx_core::row::Row;
use sqlx_postgres::{PgPool, PgRow, Postgres};
use uuid::Uuid;

use custodia_core::{Audit, CoreError, Identification, Profile};

use crate::error::is_unique_violation;
use crate::store::{StoreError, StoreResult};

const SELECT_COLUMNS: &str = "id, tenant_id, slug, owner_id, name, email, description, \
     location, bio, moto, website, aniversary_date, avatar_path, header_path, \
     locale, base_tz, current_tz, is_active, is_deleted, \
     created_by_id, updated_by_id, created_at, updated_at";

/// Profile store operations.
pub struct ProfileStore<'a> {
    pool: &'a PgPool,
}

impl<'a> ProfileStore<'a> {
    /// Create a new profile store with a connection pool reference.
    #[must_use]
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new profile, assigning id, slug and audit stamps.
    ///
    /// # Errors
    ///
    /// Returns a conflict error when the slug is already taken; any other
    /// database failure is passed through.
    pub async fn create(&self, profile: &mut Profile) -> StoreResult<()> {
        profile.set_create_values()?;

        let st = format!(
            "INSERT INTO profiles ({SELECT_COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                     $15, $16, $17, $18, $19, $20, $21, $22, $23)"
        );

        let res = query(&st)
            .bind(profile.identification.id)
            .bind(profile.identification.tenant_id.clone())
            .bind(profile.identification.slug.clone())
            .bind(profile.owner_id)
            .bind(profile.name.clone())
            .bind(profile.email.clone())
            .bind(profile.description.clone())
            .bind(profile.location.clone())
            .bind(profile.bio.clone())
            .bind(profile.moto.clone())
            .bind(profile.website.clone())
            .bind(profile.aniversary_date)
            .bind(profile.avatar_path.clone())
            .bind(profile.header_path.clone())
            .bind(profile.locale.clone())
            .bind(profile.base_tz.clone())
            .bind(profile.current_tz.clone())
            .bind(profile.is_active)
            .bind(profile.is_deleted)
            .bind(profile.audit.created_by_id)
            .bind(profile.audit.updated_by_id)
            .bind(profile.audit.created_at)
            .bind(profile.audit.updated_at)
            .execute(self.pool)
            .await;

        match res {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => Err(StoreError::Domain(
                CoreError::conflict("profile", profile.name.clone()),
            )),
            Err(err) => Err(err.into()),
        }
    }

    /// Fetch all profiles.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get_all(&self) -> StoreResult<Vec<Profile>> {
        let st = format!("SELECT {SELECT_COLUMNS} FROM profiles ORDER BY created_at");

        let profiles = query(&st)
            .try_map(from_row)
            .fetch_all(self.pool)
            .await?;

        Ok(profiles)
    }

    /// Find a profile by its owning user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get_by_owner(&self, owner_id: Uuid) -> StoreResult<Option<Profile>> {
        let st = format!("SELECT {SELECT_COLUMNS} FROM profiles WHERE owner_id = $1");

        let profile = query(&st)
            .bind(owner_id)
            .try_map(from_row)
            .fetch_optional(self.pool)
            .await?;

        Ok(profile)
    }

    /// Find a profile by slug.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get_by_slug(&self, slug: &str) -> StoreResult<Option<Profile>> {
        let st = format!("SELECT {SELECT_COLUMNS} FROM profiles WHERE slug = $1");

        let profile = query(&st)
            .bind(slug)
            .try_map(from_row)
            .fetch_optional(self.pool)
            .await?;

        Ok(profile)
    }

    /// Update a profile, writing only the columns that changed.
    ///
    /// Returns `false` without touching the database when nothing changed.
    ///
    /// # Errors
    ///
    /// Returns not-found if the profile does not exist, or any database
    /// error.
    pub async fn update(&self, profile: &mut Profile) -> StoreResult<bool> {
        let id = profile.identification.id;
        let st = format!("SELECT {SELECT_COLUMNS} FROM profiles WHERE id = $1");
        let reference = query(&st)
            .bind(id)
            .try_map(from_row)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| {
                StoreError::Domain(CoreError::not_found("profile", id.to_string()))
            })?;

        profile.set_update_values();

        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE profiles SET ");
        let mut sep = qb.separated(", ");
        let mut changed = false;

        if profile.name != reference.name {
            sep.push("name = ");
            sep.push_bind_unseparated(profile.name.clone());
            changed = true;
        }
        if profile.email != reference.email {
            sep.push("email = ");
            sep.push_bind_unseparated(profile.email.clone());
            changed = true;
        }
        if profile.description != reference.description {
            sep.push("description = ");
            sep.push_bind_unseparated(profile.description.clone());
            changed = true;
        }
        if profile.location != reference.location {
            sep.push("location = ");
            sep.push_bind_unseparated(profile.location.clone());
            changed = true;
        }
        if profile.bio != reference.bio {
            sep.push("bio = ");
            sep.push_bind_unseparated(profile.bio.clone());
            changed = true;
        }
        if profile.moto != reference.moto {
            sep.push("moto = ");
            sep.push_bind_unseparated(profile.moto.clone());
            changed = true;
        }
        if profile.website != reference.website {
            sep.push("website = ");
            sep.push_bind_unseparated(profile.website.clone());
            changed = true;
        }
        if profile.aniversary_date != reference.aniversary_date {
            sep.push("aniversary_date = ");
            sep.push_bind_unseparated(profile.aniversary_date);
            changed = true;
        }
        if profile.avatar_path != reference.avatar_path {
            sep.push("avatar_path = ");
            sep.push_bind_unseparated(profile.avatar_path.clone());
            changed = true;
        }
        if profile.header_path != reference.header_path {
            sep.push("header_path = ");
            sep.push_bind_unseparated(profile.header_path.clone());
            changed = true;
        }
        if profile.is_active != reference.is_active {
            sep.push("is_active = ");
            sep.push_bind_unseparated(profile.is_active);
            changed = true;
        }
        if profile.is_deleted != reference.is_deleted {
            sep.push("is_deleted = ");
            sep.push_bind_unseparated(profile.is_deleted);
            changed = true;
        }

        if !changed {
            return Ok(false);
        }

        sep.push("updated_at = ");
        sep.push_bind_unseparated(profile.audit.updated_at);

        qb.push(" WHERE id = ");
        qb.push_bind(id);

        qb.build().execute(self.pool).await?;

        Ok(true)
    }

    /// Delete a profile by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn delete(&self, id: Uuid) -> StoreResult<()> {
        query("DELETE FROM profiles WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(())
    }

    /// Delete a profile by slug.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn delete_by_slug(&self, slug: &str) -> StoreResult<()> {
        query("DELETE FROM profiles WHERE slug = $1")
            .bind(slug)
            .execute(self.pool)
            .await?;

        Ok(())
    }
}

fn from_row(row: PgRow) -> std::result::Result<Profile, sqlx_core::error::Error> {
    Ok(Profile {
        identification: Identification {
            id: row.try_get("id")?,
            tenant_id: row.try_get("tenant_id")?,
            slug: row.try_get("slug")?,
        },
        owner_id: row.try_get("owner_id")?,
        name: row
            .try_get::<Option<String>, _>("name")?
            .unwrap_or_default(),
        email: row.try_get("email")?,
        description: row.try_get("description")?,
        location: row.try_get("location")?,
        bio: row.try_get("bio")?,
        moto: row.try_get("moto")?,
        website: row.try_get("website")?,
        aniversary_date: row.try_get("aniversary_date")?,
        avatar_path: row.try_get("avatar_path")?,
        header_path: row.try_get("header_path")?,
        locale: row.try_get("locale")?,
        base_tz: row.try_get("base_tz")?,
        current_tz: row.try_get("current_tz")?,
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
