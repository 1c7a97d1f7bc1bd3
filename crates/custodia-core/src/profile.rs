//! Profile model.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::audit::Audit;
use crate::error::Result;
use crate::id::Identification;

/// Public-facing profile attached to a user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    #[serde(flatten)]
    pub identification: Identification,
    #[serde(rename = "ownerID", default)]
    pub owner_id: Option<Uuid>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub moto: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(
        rename = "aniversaryDate",
        with = "time::serde::rfc3339::option",
        default
    )]
    pub aniversary_date: Option<OffsetDateTime>,
    #[serde(rename = "avatarPath", default)]
    pub avatar_path: Option<String>,
    #[serde(rename = "headerPath", default)]
    pub header_path: Option<String>,
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(rename = "baseTZ", default)]
    pub base_tz: Option<String>,
    #[serde(rename = "currentTZ", default)]
    pub current_tz: Option<String>,
    #[serde(rename = "isActive", default)]
    pub is_active: bool,
    #[serde(rename = "isDeleted", default)]
    pub is_deleted: bool,
    #[serde(flatten)]
    pub audit: Audit,
}

impl Profile {
    /// Assign id, slug and audit stamps before insert.
    ///
    /// # Errors
    ///
    /// Returns an error if the profile name is blank.
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
