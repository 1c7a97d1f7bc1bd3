//! Audit trail fields shared by persisted entities.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Who touched a record and when.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Audit {
    #[serde(rename = "createdByID", default)]
    pub created_by_id: Option<Uuid>,
    #[serde(rename = "updatedByID", default)]
    pub updated_by_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub created_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub updated_at: Option<OffsetDateTime>,
}

impl Audit {
    /// Stamp a record about to be inserted.
    pub fn set_create_values(&mut self) {
        self.created_at = Some(OffsetDateTime::now_utc());
        self.updated_at = None;
    }

    /// Stamp a record about to be updated.
    pub fn set_update_values(&mut self) {
        self.updated_at = Some(OffsetDateTime::now_utc());
    }
}
