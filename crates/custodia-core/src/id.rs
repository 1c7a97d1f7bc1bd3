//! Record identification.
//!
//! Every persisted entity carries an id, an optional tenant and a URL-safe
//! slug derived from a human-readable prefix.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, Result};

/// Identity fields shared by all persisted entities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identification {
    /// Record UUID
    pub id: Uuid,
    /// Owning tenant, if any
    #[serde(rename = "tenantID", default)]
    pub tenant_id: Option<String>,
    /// URL-safe identifier used in routes
    #[serde(default)]
    pub slug: Option<String>,
}

impl Identification {
    /// Generate the id if it has not been set yet.
    pub fn gen_id(&mut self) {
        if self.id.is_nil() {
            self.id = Uuid::new_v4();
        }
    }

    /// Returns true while the record has not been assigned an id.
    #[must_use]
    pub fn is_new(&self) -> bool {
        self.id.is_nil()
    }

    /// Set the slug from the given prefix if it was not set.
    ///
    /// # Errors
    ///
    /// Returns an error if the prefix is blank.
    pub fn update_slug(&mut self, prefix: &str) -> Result<String> {
        match &self.slug {
            Some(s) if !s.trim().is_empty() => Ok(s.clone()),
            _ => {
                let slug = gen_slug(prefix)?;
                self.slug = Some(slug.clone());
                Ok(slug)
            }
        }
    }

    /// Assign id and slug for a record about to be inserted.
    ///
    /// # Errors
    ///
    /// Returns an error if the slug prefix is blank.
    pub fn set_create_values(&mut self, slug_prefix: &str) -> Result<()> {
        self.gen_id();
        self.update_slug(slug_prefix)?;
        Ok(())
    }
}

/// Build a slug from a prefix and the trailing segment of a fresh UUID.
///
/// The prefix is lowercased and stripped of dashes and underscores so the
/// UUID segment is unambiguous, e.g. `some_user` becomes `someuser-1a2b3c4d5e6f`.
///
/// # Errors
///
/// Returns an error if the prefix is blank.
pub fn gen_slug(prefix: &str) -> Result<String> {
    if prefix.trim().is_empty() {
        return Err(CoreError::invalid_slug_prefix("no slug prefix defined"));
    }

    let prefix: String = prefix
        .chars()
        .filter(|c| *c != '-' && *c != '_')
        .collect::<String>()
        .to_lowercase();

    let id = Uuid::new_v4().to_string();
    let tail = id.rsplit('-').next().unwrap_or(&id);

    Ok(format!("{prefix}-{tail}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gen_slug_format() {
        let slug = gen_slug("Some_User-Name").unwrap();
        let (prefix, tail) = slug.split_once('-').unwrap();
        assert_eq!(prefix, "someusername");
        assert_eq!(tail.len(), 12);
    }

    #[test]
    fn test_gen_slug_blank_prefix() {
        assert!(gen_slug("  ").is_err());
    }

    #[test]
    fn test_set_create_values_idempotent_slug() {
        let mut ident = Identification {
            slug: Some("fixed-slug".into()),
            ..Identification::default()
        };
        ident.set_create_values("prefix").unwrap();
        assert_eq!(ident.slug.as_deref(), Some("fixed-slug"));
        assert!(!ident.id.is_nil());
    }

    #[test]
    fn test_gen_id_only_once() {
        let mut ident = Identification::default();
        assert!(ident.is_new());
        ident.gen_id();
        let first = ident.id;
        ident.gen_id();
        assert_eq!(first, ident.id);
    }
}
