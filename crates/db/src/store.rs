//! Store seams consumed by the lifecycle controller and the outbox worker.
//!
//! PostgreSQL implementations live in [`crate::repositories`]; the in-process
//! implementation in [`crate::memory`] backs tests and local runs.

use async_trait::async_trait;
use coldline_core::change::SideEffect;
use coldline_core::roles::Role;
use coldline_core::types::{DbId, Timestamp};

use crate::models::intervention::{Intervention, InterventionFilter, NewIntervention};
use crate::models::notification::{NewNotification, Notification};
use crate::models::outbox::OutboxTask;
use crate::models::user::DirectoryUser;

/// Error type shared by every store implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A JSON column could not be encoded or decoded.
    #[error("Encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// The backing store refused the operation.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Durable record of intervention documents.
///
/// Writes that carry `effects` persist them to the outbox atomically with the
/// record, so a committed mutation always has its side effects queued.
#[async_trait]
pub trait InterventionStore: Send + Sync {
    /// Insert a new record (status `pending`, no photos) with its effects.
    async fn insert(
        &self,
        input: &NewIntervention,
        effects: &[SideEffect],
    ) -> Result<Intervention, StoreError>;

    async fn find_by_id(&self, id: DbId) -> Result<Option<Intervention>, StoreError>;

    /// Filtered listing, newest first.
    async fn list(&self, filter: &InterventionFilter) -> Result<Vec<Intervention>, StoreError>;

    /// Overwrite every mutable field of `record` and queue `effects`.
    ///
    /// `created_by` and `created_at` are never written. Returns `None` if the
    /// record no longer exists.
    async fn update(
        &self,
        record: &Intervention,
        effects: &[SideEffect],
    ) -> Result<Option<Intervention>, StoreError>;

    /// Hard delete. Returns `true` if a row was removed.
    async fn delete(&self, id: DbId) -> Result<bool, StoreError>;

    /// Cheap reachability probe for health reporting.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Read access to the user directory.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user(&self, id: DbId) -> Result<Option<DirectoryUser>, StoreError>;

    /// Active users holding any of `roles`, each listed once, ordered by id.
    async fn users_with_roles(&self, roles: &[Role]) -> Result<Vec<DirectoryUser>, StoreError>;
}

/// Notification records addressed to users.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Write every notification in one batch; either all rows land or none.
    ///
    /// Entries whose `(source_task_id, recipient_id)` already exists are
    /// skipped. Returns only the rows written by this call.
    async fn insert_batch(
        &self,
        batch: &[NewNotification],
    ) -> Result<Vec<Notification>, StoreError>;

    async fn list_for_user(
        &self,
        user_id: DbId,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>, StoreError>;

    async fn unread_count(&self, user_id: DbId) -> Result<i64, StoreError>;

    /// Flip `is_read`. Returns `false` if the notification is not the user's
    /// or was already read.
    async fn mark_read(&self, notification_id: DbId, user_id: DbId) -> Result<bool, StoreError>;

    async fn mark_all_read(&self, user_id: DbId) -> Result<u64, StoreError>;
}

/// Queue of side-effect tasks written alongside intervention mutations.
#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Claim up to `limit` due pending tasks, oldest first, pushing their
    /// `next_attempt_at` to `lease_until` so concurrent workers skip them.
    async fn claim_due(
        &self,
        limit: i64,
        lease_until: Timestamp,
    ) -> Result<Vec<OutboxTask>, StoreError>;

    async fn mark_done(&self, task_id: DbId) -> Result<(), StoreError>;

    /// Record a failed attempt. `retry_at = None` gives up on the task.
    async fn mark_failed(
        &self,
        task_id: DbId,
        error: &str,
        retry_at: Option<Timestamp>,
    ) -> Result<(), StoreError>;

    async fn find_task(&self, task_id: DbId) -> Result<Option<OutboxTask>, StoreError>;
}
