//! Well-known role name constants.
//!
//! These must match the `role` check constraint on the `users` table.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_TECHNICIAN: &str = "technician";
pub const ROLE_CLIENT: &str = "client";

/// All valid role names.
pub const VALID_ROLES: &[&str] = &[ROLE_ADMIN, ROLE_TECHNICIAN, ROLE_CLIENT];

/// Role carried by every authenticated actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Technician,
    Client,
}

impl Role {
    /// Return the database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => ROLE_ADMIN,
            Self::Technician => ROLE_TECHNICIAN,
            Self::Client => ROLE_CLIENT,
        }
    }

    /// Parse from a string, returning an error for unknown roles.
    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            ROLE_ADMIN => Ok(Self::Admin),
            ROLE_TECHNICIAN => Ok(Self::Technician),
            ROLE_CLIENT => Ok(Self::Client),
            other => Err(CoreError::Validation(format!(
                "Unknown role '{other}'. Valid roles: {}",
                VALID_ROLES.join(", ")
            ))),
        }
    }
}
