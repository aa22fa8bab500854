//! Background processor for the side-effect outbox.
//!
//! Every intervention write stores its side effects as outbox tasks in the
//! same transaction. [`OutboxProcessor`] periodically claims due tasks,
//! executes them, and either marks them done or reschedules them with
//! exponential backoff (`retry_base * 2^attempt`). A task that fails
//! `max_attempts` times is marked `failed` and left for inspection.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use coldline_core::change::SideEffect;
use coldline_core::notification::{NotificationKind, Recipients};
use coldline_db::models::outbox::OutboxTask;
use coldline_db::{OutboxStore, StoreError};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::compliance::{ComplianceReport, ComplianceReportGenerator};
use crate::dispatcher::{Delivery, NotificationDispatcher};

/// Tuning for the outbox processor.
#[derive(Debug, Clone)]
pub struct OutboxConfig {
    /// Maximum tasks claimed per pass.
    pub batch_size: i64,
    /// Attempts before a task is marked failed.
    pub max_attempts: i32,
    /// Delay before the first retry; doubled for each further attempt.
    pub retry_base: Duration,
    /// How long a claimed task is hidden from other workers.
    pub lease: Duration,
    /// Pause between passes.
    pub poll_interval: Duration,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            max_attempts: 5,
            retry_base: Duration::from_secs(2),
            lease: Duration::from_secs(60),
            poll_interval: Duration::from_secs(5),
        }
    }
}

impl OutboxConfig {
    /// Backoff before the retry that follows `attempt` failures so far
    /// (0-based): `retry_base * 2^attempt`.
    pub fn retry_delay(&self, attempt: i32) -> Duration {
        let exponent = attempt.clamp(0, 16) as u32;
        self.retry_base.saturating_mul(1u32 << exponent)
    }
}

/// Outcome counts of one processing pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutboxRunSummary {
    pub done: usize,
    pub retried: usize,
    pub failed: usize,
}

impl OutboxRunSummary {
    pub fn total(&self) -> usize {
        self.done + self.retried + self.failed
    }
}

// ---------------------------------------------------------------------------
// OutboxProcessor
// ---------------------------------------------------------------------------

pub struct OutboxProcessor {
    outbox: Arc<dyn OutboxStore>,
    dispatcher: Arc<NotificationDispatcher>,
    compliance: ComplianceReportGenerator,
    config: OutboxConfig,
}

impl OutboxProcessor {
    pub fn new(
        outbox: Arc<dyn OutboxStore>,
        dispatcher: Arc<NotificationDispatcher>,
        config: OutboxConfig,
    ) -> Self {
        let compliance = ComplianceReportGenerator::new(dispatcher.clone());
        Self {
            outbox,
            dispatcher,
            compliance,
            config,
        }
    }

    /// Run the processing loop until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.poll_interval);
        tracing::info!(
            poll_interval_secs = self.config.poll_interval.as_secs(),
            max_attempts = self.config.max_attempts,
            "Outbox processor started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Outbox processor cancelled");
                    break;
                }
                _ = interval.tick() => {
                    match self.run_once().await {
                        Ok(summary) if summary.total() > 0 => {
                            tracing::info!(
                                done = summary.done,
                                retried = summary.retried,
                                failed = summary.failed,
                                "Processed outbox tasks"
                            );
                        }
                        Ok(_) => {}
                        Err(e) => tracing::error!(error = %e, "Failed to process outbox"),
                    }
                }
            }
        }
    }

    /// Claim and execute one batch of due tasks.
    ///
    /// Email copies are sent after every task in the batch has been settled,
    /// so a slow relay cannot outlive the lease of a task still marked
    /// pending. A failure to settle one task is logged and the batch goes on;
    /// the task is claimed again once its lease lapses.
    pub async fn run_once(&self) -> Result<OutboxRunSummary, StoreError> {
        let lease_until = Utc::now() + to_chrono(self.config.lease);
        let tasks = self
            .outbox
            .claim_due(self.config.batch_size, lease_until)
            .await?;

        let mut summary = OutboxRunSummary::default();
        let mut outgoing = Delivery::default();
        for task in &tasks {
            match self.execute(task).await {
                Ok(delivery) => {
                    outgoing.merge(delivery);
                    match self.outbox.mark_done(task.id).await {
                        Ok(()) => summary.done += 1,
                        Err(e) => tracing::error!(
                            task_id = task.id,
                            error = %e,
                            "Failed to mark outbox task done"
                        ),
                    }
                }
                Err(e) => match self.record_failure(task, &e.to_string()).await {
                    Ok(true) => summary.retried += 1,
                    Ok(false) => summary.failed += 1,
                    Err(e) => tracing::error!(
                        task_id = task.id,
                        error = %e,
                        "Failed to record outbox task failure"
                    ),
                },
            }
        }

        self.dispatcher.send_emails(&outgoing.emails).await;
        Ok(summary)
    }

    /// Returns `true` if the task was rescheduled, `false` if it gave up.
    async fn record_failure(&self, task: &OutboxTask, error: &str) -> Result<bool, StoreError> {
        let attempts = task.attempts + 1;
        if attempts >= self.config.max_attempts {
            tracing::error!(
                task_id = task.id,
                intervention_id = task.intervention_id,
                kind = %task.kind,
                attempts,
                error,
                "Outbox task failed permanently"
            );
            self.outbox.mark_failed(task.id, error, None).await?;
            return Ok(false);
        }

        let delay = self.config.retry_delay(task.attempts);
        tracing::warn!(
            task_id = task.id,
            intervention_id = task.intervention_id,
            kind = %task.kind,
            attempt = attempts,
            retry_in_secs = delay.as_secs(),
            error,
            "Outbox task failed, retrying"
        );
        let retry_at = Utc::now() + to_chrono(delay);
        self.outbox.mark_failed(task.id, error, Some(retry_at)).await?;
        Ok(true)
    }

    /// Write the task's notifications. Re-running a task writes nothing new.
    async fn execute(&self, task: &OutboxTask) -> Result<Delivery, StoreError> {
        let intervention_id = task.intervention_id;
        let source = Some(task.id);
        match &task.effect.0 {
            SideEffect::NewIntervention {
                equipment_category,
                urgency,
            } => {
                let payload = json!({
                    "intervention_id": intervention_id,
                    "equipment_category": equipment_category,
                    "urgency": urgency,
                    "message": format!("New intervention request #{intervention_id}"),
                });
                self.dispatcher
                    .record(
                        NotificationKind::NewIntervention,
                        &Recipients::staff(),
                        payload,
                        source,
                    )
                    .await
            }
            SideEffect::StatusChanged { client_id, from, to } => {
                let payload = json!({
                    "intervention_id": intervention_id,
                    "from": from,
                    "to": to,
                    "message": format!("Intervention #{intervention_id} is now {to}"),
                });
                self.dispatcher
                    .record(
                        NotificationKind::StatusChanged,
                        &Recipients::User(*client_id),
                        payload,
                        source,
                    )
                    .await
            }
            SideEffect::ComplianceAlert {
                client_id,
                temperature_reading,
                haccp_compliant,
            } => {
                let report = ComplianceReport {
                    intervention_id,
                    client_id: *client_id,
                    temperature_reading: *temperature_reading,
                    haccp_compliant: *haccp_compliant,
                };
                self.compliance.record(&report, source).await
            }
        }
    }
}

fn to_chrono(d: Duration) -> chrono::Duration {
    chrono::Duration::milliseconds(i64::try_from(d.as_millis()).unwrap_or(i64::MAX / 1_000))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
