//! Stored registration record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The persisted registration fields.
///
/// Every field is optional because a record may predate a field or be
/// written by an older client. Writers always replace the whole record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRecord {
    /// Canonical comma-separated sender ids the token was issued for.
    #[serde(rename = "sender.ids", default, skip_serializing_if = "Option::is_none")]
    pub sender_ids: Option<String>,

    /// Application version code at registration time.
    #[serde(rename = "version.code", default, skip_serializing_if = "Option::is_none")]
    pub version_code: Option<i32>,

    /// Registration token returned by the messaging backend.
    #[serde(rename = "registration.id", default, skip_serializing_if = "Option::is_none")]
    pub registration_id: Option<String>,

    /// When the record was last written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl RegistrationRecord {
    /// Build a complete record stamped with the current time.
    pub fn new(sender_ids: &str, version_code: i32, registration_id: &str) -> Self {
        Self {
            sender_ids: Some(sender_ids.to_string()),
            version_code: Some(version_code),
            registration_id: Some(registration_id.to_string()),
            updated_at: Some(Utc::now()),
        }
    }

    /// Whether nothing has been stored yet.
    pub fn is_empty(&self) -> bool {
        self.sender_ids.is_none() && self.version_code.is_none() && self.registration_id.is_none()
    }
}
