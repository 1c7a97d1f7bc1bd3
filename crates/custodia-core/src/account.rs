//! Account model.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::audit::Audit;
use crate::error::Result;
use crate::id::Identification;

/// An account owned by a user, optionally nested under a parent account.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Account {
    #[serde(flatten)]
    pub identification: Identification,
    #[serde(rename = "ownerID", default)]
    pub owner_id: Option<Uuid>,
    #[serde(rename = "parentID", default)]
    pub parent_id: Option<Uuid>,
    #[serde(rename = "accountType", default)]
    pub account_type: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
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

impl Account {
    /// Assign id, slug and audit stamps before insert.
    ///
    /// # Errors
    ///
    /// Returns an error if the account name is blank.
    pub fn set_create_values(&mut self) -> Result<()> {
        let prefix = self.name.clone();
        self.identification.set_create_values(&prefix)?;
        self.audit.set_create_values();
        Ok(())
    }

    /// Refresh audit stamps before update.
    pub fn set_update_values(&mut self) {
        self.audit.set_update_values();
    }
}
