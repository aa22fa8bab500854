//! Notification entity models and DTOs.

use coldline_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `notifications` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Notification {
    pub id: DbId,
    pub recipient_id: DbId,
    pub kind: String,
    pub payload: serde_json::Value,
    /// Outbox task that wrote this record, if any.
    #[serde(skip)]
    pub source_task_id: Option<DbId>,
    pub is_read: bool,
    pub read_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// A notification about to be written as part of a fan-out batch.
///
/// At most one record exists per `(source_task_id, recipient_id)`, so a
/// re-executed outbox task cannot write its fan-out twice.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub recipient_id: DbId,
    pub kind: String,
    pub payload: serde_json::Value,
    pub source_task_id: Option<DbId>,
}

/// Query parameters for listing the caller's notifications.
#[derive(Debug, Default, Deserialize)]
pub struct NotificationListParams {
    pub unread_only: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
