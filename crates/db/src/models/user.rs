//! User directory entries.
//!
//! Users are managed by the account service; this subsystem only reads them
//! to resolve notification recipients and to validate references.

use coldline_core::roles::Role;
use coldline_core::types::DbId;
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `users` table, as seen by the intervention subsystem.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DirectoryUser {
    pub id: DbId,
    pub name: String,
    pub email: Option<String>,
    pub role: String,
    pub is_active: bool,
}

impl DirectoryUser {
    /// Whether the user holds `role`.
    pub fn has_role(&self, role: Role) -> bool {
        self.role == role.as_str()
    }

    pub fn to_ref(&self) -> UserRef {
        UserRef {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

/// Lightweight user reference embedded in detail views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRef {
    pub id: DbId,
    pub name: String,
}
