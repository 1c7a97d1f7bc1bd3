//! User model.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::audit::Audit;
use crate::error::Result;
use crate::id::Identification;
use crate::password::hash_password;

/// A registered user.
///
/// `password` and `email_confirmation` are transient request values; only the
/// digest is persisted and neither is ever serialized back to clients.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    #[serde(flatten)]
    pub identification: Identification,
    #[serde(default)]
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    #[serde(skip)]
    pub password_digest: Option<String>,
    #[serde(default)]
    pub email: String,
    #[serde(rename = "emailConfirmation", skip_serializing, default)]
    pub email_confirmation: String,
    #[serde(rename = "givenName", default)]
    pub given_name: Option<String>,
    #[serde(rename = "middleNames", default)]
    pub middle_names: Option<String>,
    #[serde(rename = "familyName", default)]
    pub family_name: Option<String>,
    #[serde(skip)]
    pub confirmation_token: Option<String>,
    #[serde(rename = "isConfirmed", default)]
    pub is_confirmed: bool,
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(rename = "baseTZ", default)]
    pub base_tz: Option<String>,
    #[serde(rename = "currentTZ", default)]
    pub current_tz: Option<String>,
    #[serde(rename = "startsAt", with = "time::serde::rfc3339::option", default)]
    pub starts_at: Option<OffsetDateTime>,
    #[serde(rename = "endsAt", with = "time::serde::rfc3339::option", default)]
    pub ends_at: Option<OffsetDateTime>,
    #[serde(rename = "isActive", default)]
    pub is_active: bool,
    #[serde(rename = "isDeleted", default)]
    pub is_deleted: bool,
    #[serde(flatten)]
    pub audit: Audit,
}

impl User {
    /// Recompute the password digest if a new plaintext password was supplied.
    ///
    /// # Errors
    ///
    /// Returns an error if hashing fails.
    pub fn update_password_digest(&mut self) -> Result<Option<String>> {
        if self.password.is_empty() {
            return Ok(self.password_digest.clone());
        }

        let digest = hash_password(&self.password)?;
        self.password_digest = Some(digest.clone());
        Ok(Some(digest))
    }

    /// Generate a confirmation token for a signup that has not been
    /// confirmed yet.
    pub fn gen_confirmation_token(&mut self) {
        if self.confirmation_token.is_none() && !self.is_confirmed {
            self.confirmation_token = Some(Uuid::new_v4().to_string());
        }
    }

    /// Assign id, slug, digest, token and audit stamps before insert.
    ///
    /// # Errors
    ///
    /// Returns an error if the username is blank or hashing fails.
    pub fn set_create_values(&mut self) -> Result<()> {
        let prefix = self.username.clone();
        self.identification.set_create_values(&prefix)?;
        self.update_password_digest()?;
        self.gen_confirmation_token();
        self.audit.set_create_values();
        Ok(())
    }

    /// Refresh audit stamps and the digest before update.
    ///
    /// # Errors
    ///
    /// Returns an error if hashing fails.
    pub fn set_update_values(&mut self) -> Result<()> {
        self.update_password_digest()?;
        self.audit.set_update_values();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            username: "wanda".into(),
            password: "a-password".into(),
            email: "wanda@example.com".into(),
            email_confirmation: "wanda@example.com".into(),
            ..User::default()
        }
    }

    #[test]
    fn test_set_create_values() {
        let mut user = sample_user();
        user.set_create_values().unwrap();

        assert!(!user.identification.id.is_nil());
        assert!(user.identification.slug.as_deref().unwrap().starts_with("wanda-"));
        assert!(user.password_digest.as_deref().unwrap().starts_with("$argon2id$"));
        assert!(user.confirmation_token.is_some());
        assert!(user.audit.created_at.is_some());
    }

    #[test]
    fn test_digest_untouched_without_password() {
        let mut user = sample_user();
        user.set_create_values().unwrap();
        let digest = user.password_digest.clone();

        user.password.clear();
        user.set_update_values().unwrap();
        assert_eq!(user.password_digest, digest);
    }

    #[test]
    fn test_no_token_for_confirmed_user() {
        let mut user = sample_user();
        user.is_confirmed = true;
        user.gen_confirmation_token();
        assert!(user.confirmation_token.is_none());
    }

    #[test]
    fn test_password_never_serialized() {
        let mut user = sample_user();
        user.set_create_values().unwrap();

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password").is_none());
        assert!(json.get("password_digest").is_none());
        assert!(json.get("emailConfirmation").is_none());
    }
}
