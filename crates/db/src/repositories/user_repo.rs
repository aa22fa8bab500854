//! Read-only repository for the `users` table.

use coldline_core::types::DbId;
use sqlx::PgPool;

use crate::models::user::DirectoryUser;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, email, role, is_active";

/// Directory lookups used for recipient resolution and reference checks.
pub struct UserRepo;

impl UserRepo {
    /// Find a user by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<DirectoryUser>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, DirectoryUser>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List active users whose role is one of `roles`.
    pub async fn list_active_by_roles(
        pool: &PgPool,
        roles: &[String],
    ) -> Result<Vec<DirectoryUser>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM users \
             WHERE role = ANY($1) AND is_active = true \
             ORDER BY id"
        );
        sqlx::query_as::<_, DirectoryUser>(&query)
            .bind(roles)
            .fetch_all(pool)
            .await
    }
}
