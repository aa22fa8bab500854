//! Side-effect outbox rows.

use coldline_core::change::SideEffect;
use coldline_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// Task is waiting (or waiting again) to be executed.
pub const OUTBOX_PENDING: &str = "pending";
/// Task executed successfully.
pub const OUTBOX_DONE: &str = "done";
/// Task exhausted its attempts.
pub const OUTBOX_FAILED: &str = "failed";

/// A row from the `side_effect_outbox` table.
///
/// `intervention_id` is not a foreign key: tasks outlive a hard delete of
/// the intervention that produced them.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OutboxTask {
    pub id: DbId,
    pub intervention_id: DbId,
    pub kind: String,
    pub effect: sqlx::types::Json<SideEffect>,
    pub status: String,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub next_attempt_at: Timestamp,
    pub processed_at: Option<Timestamp>,
    pub created_at: Timestamp,
}
