//! Notification kinds and recipient selection.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::roles::Role;
use crate::types::DbId;

pub const KIND_NEW_INTERVENTION: &str = "NEW_INTERVENTION";
pub const KIND_STATUS_CHANGED: &str = "STATUS_CHANGED";
pub const KIND_COMPLIANCE_REPORT: &str = "COMPLIANCE_REPORT";

/// All valid notification kinds.
pub const VALID_KINDS: &[&str] = &[
    KIND_NEW_INTERVENTION,
    KIND_STATUS_CHANGED,
    KIND_COMPLIANCE_REPORT,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    NewIntervention,
    StatusChanged,
    ComplianceReport,
}

impl NotificationKind {
    /// Return the database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NewIntervention => KIND_NEW_INTERVENTION,
            Self::StatusChanged => KIND_STATUS_CHANGED,
            Self::ComplianceReport => KIND_COMPLIANCE_REPORT,
        }
    }

    /// Parse from a string, returning an error for unknown kinds.
    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            KIND_NEW_INTERVENTION => Ok(Self::NewIntervention),
            KIND_STATUS_CHANGED => Ok(Self::StatusChanged),
            KIND_COMPLIANCE_REPORT => Ok(Self::ComplianceReport),
            other => Err(CoreError::Validation(format!(
                "Unknown notification kind '{other}'. Valid kinds: {}",
                VALID_KINDS.join(", ")
            ))),
        }
    }

    /// Whether a best-effort email copy is sent alongside the stored record.
    pub fn sends_email(self) -> bool {
        matches!(self, Self::NewIntervention | Self::StatusChanged)
    }
}

/// Who a notification is addressed to, before resolution against the user
/// directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Recipients {
    /// One explicit user. Resolves to nobody if the user no longer exists.
    User(DbId),
    /// Every active user holding any of these roles.
    Roles(Vec<Role>),
}

impl Recipients {
    /// Staff who receive new-request fan-out.
    pub fn staff() -> Self {
        Self::Roles(vec![Role::Admin, Role::Technician])
    }
}
