//! Contact, group, and per-contact delivery status models.

use serde::{Deserialize, Serialize};

use crate::{AppError, Result};

/// Delivery state of a single contact within its group.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// Not yet attempted, or reset for a retry run.
    Pending,
    /// Provider accepted the message.
    Sent,
    /// Provider rejected the message or could not be reached.
    Failed,
}

impl DeliveryStatus {
    /// Persisted string form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }

    /// Parse the persisted string form.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` for an unrecognized value.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "sent" => Ok(Self::Sent),
            "failed" => Ok(Self::Failed),
            other => Err(AppError::Db(format!("invalid delivery status: {other}"))),
        }
    }

    /// Classify a provider status code: 200 and 201 are accepted, anything
    /// else is a failure.
    #[must_use]
    pub fn from_status_code(code: u16) -> Self {
        if matches!(code, 200 | 201) {
            Self::Sent
        } else {
            Self::Failed
        }
    }
}

/// The slice of a contact the dispatcher works with.
///
/// Captured once when a broadcast is accepted; later edits to the group do
/// not affect an in-flight run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContactRow {
    /// Contact identifier in the contact store.
    pub id: i64,
    /// Display name used to fill body placeholders.
    pub name: Option<String>,
    /// Normalized destination phone number.
    pub phone: String,
}

/// A stored contact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Contact {
    /// Contact identifier.
    pub id: i64,
    /// Optional display name.
    pub name: Option<String>,
    /// Normalized destination phone number.
    pub phone: String,
    /// Current delivery status.
    pub status: DeliveryStatus,
    /// Owning group.
    pub group_id: i64,
    /// Name of the owning group.
    pub group_name: String,
}

/// Contact supplied for insertion into a group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewContact {
    /// Optional display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Destination phone number, already normalized by the caller.
    pub phone: String,
}

/// A named group of contacts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContactGroup {
    /// Group identifier; `0` is the built-in `Uncategorized` group.
    pub id: i64,
    /// Unique group name.
    pub name: String,
    /// Number of contacts in the group.
    pub contact_count: i64,
}
