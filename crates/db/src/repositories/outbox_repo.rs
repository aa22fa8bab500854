//! Repository for the `side_effect_outbox` table.

use coldline_core::change::SideEffect;
use coldline_core::types::{DbId, Timestamp};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use crate::models::outbox::{OutboxTask, OUTBOX_DONE, OUTBOX_FAILED, OUTBOX_PENDING};

/// Column list for `side_effect_outbox` queries.
const COLUMNS: &str = "\
    id, intervention_id, kind, effect, status, attempts, last_error, \
    next_attempt_at, processed_at, created_at";

/// Queue operations for side-effect tasks.
pub struct OutboxRepo;

impl OutboxRepo {
    /// Enqueue `effects` for an intervention on the caller's connection
    /// (normally inside the transaction that wrote the intervention).
    pub async fn enqueue(
        conn: &mut PgConnection,
        intervention_id: DbId,
        effects: &[SideEffect],
    ) -> Result<(), sqlx::Error> {
        if effects.is_empty() {
            return Ok(());
        }

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO side_effect_outbox (intervention_id, kind, effect) ");
        builder.push_values(effects, |mut row, effect| {
            row.push_bind(intervention_id)
                .push_bind(effect.name())
                .push_bind(Json(effect));
        });
        builder.build().execute(conn).await?;
        Ok(())
    }

    /// Lease due pending tasks so that concurrent workers skip them.
    pub async fn claim_due(
        pool: &PgPool,
        limit: i64,
        lease_until: Timestamp,
    ) -> Result<Vec<OutboxTask>, sqlx::Error> {
        let query = format!(
            "UPDATE side_effect_outbox SET next_attempt_at = $3 \
             WHERE id IN ( \
                 SELECT id FROM side_effect_outbox \
                 WHERE status = $1 AND next_attempt_at <= NOW() \
                 ORDER BY id \
                 LIMIT $2 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        let mut tasks = sqlx::query_as::<_, OutboxTask>(&query)
            .bind(OUTBOX_PENDING)
            .bind(limit)
            .bind(lease_until)
            .fetch_all(pool)
            .await?;
        // RETURNING does not preserve the subquery order.
        tasks.sort_by_key(|t| t.id);
        Ok(tasks)
    }

    /// Mark a task as executed.
    pub async fn mark_done(pool: &PgPool, task_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE side_effect_outbox \
             SET status = $2, attempts = attempts + 1, last_error = NULL, processed_at = NOW() \
             WHERE id = $1",
        )
        .bind(task_id)
        .bind(OUTBOX_DONE)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Record a failed attempt and either reschedule or give up.
    pub async fn mark_failed(
        pool: &PgPool,
        task_id: DbId,
        error: &str,
        retry_at: Option<Timestamp>,
    ) -> Result<(), sqlx::Error> {
        match retry_at {
            Some(at) => {
                sqlx::query(
                    "UPDATE side_effect_outbox \
                     SET attempts = attempts + 1, last_error = $2, next_attempt_at = $3 \
                     WHERE id = $1",
                )
                .bind(task_id)
                .bind(error)
                .bind(at)
                .execute(pool)
                .await?;
            }
            None => {
                sqlx::query(
                    "UPDATE side_effect_outbox \
                     SET status = $3, attempts = attempts + 1, last_error = $2, \
                         processed_at = NOW() \
                     WHERE id = $1",
                )
                .bind(task_id)
                .bind(error)
                .bind(OUTBOX_FAILED)
                .execute(pool)
                .await?;
            }
        }
        Ok(())
    }

    /// Find a task by ID.
    pub async fn find_by_id(pool: &PgPool, task_id: DbId) -> Result<Option<OutboxTask>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM side_effect_outbox WHERE id = $1");
        sqlx::query_as::<_, OutboxTask>(&query)
            .bind(task_id)
            .fetch_optional(pool)
            .await
    }
}
