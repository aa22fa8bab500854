//! ComplianceReportGenerator: records an unfavourable HACCP conformance change.
//!
//! The externally observable report is a COMPLIANCE_REPORT notification to
//! the intervention's client. Document rendering is not produced here.

use std::sync::Arc;

use coldline_core::notification::{NotificationKind, Recipients};
use coldline_core::types::DbId;
use coldline_db::models::notification::Notification;
use coldline_db::StoreError;
use serde_json::json;

use crate::dispatcher::{Delivery, NotificationDispatcher};

/// The data a compliance report is generated from.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplianceReport {
    pub intervention_id: DbId,
    pub client_id: DbId,
    pub temperature_reading: Option<f64>,
    pub haccp_compliant: bool,
}

impl ComplianceReport {
    /// Human-readable summary stored in the notification payload.
    pub fn message(&self) -> String {
        let check = if self.haccp_compliant { "passed" } else { "failed" };
        match self.temperature_reading {
            Some(t) => format!(
                "Compliance alert for intervention #{}: HACCP check {check}, recorded temperature {t:.1} °C",
                self.intervention_id
            ),
            None => format!(
                "Compliance alert for intervention #{}: HACCP check {check}",
                self.intervention_id
            ),
        }
    }
}

pub struct ComplianceReportGenerator {
    dispatcher: Arc<NotificationDispatcher>,
}

impl ComplianceReportGenerator {
    pub fn new(dispatcher: Arc<NotificationDispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Persist the report addressed to the client.
    pub async fn generate(&self, report: &ComplianceReport) -> Result<Vec<Notification>, StoreError> {
        let delivery = self.record(report, None).await?;
        self.dispatcher.send_emails(&delivery.emails).await;
        Ok(delivery.notifications)
    }

    /// Write the report notification on behalf of `source_task`, leaving any
    /// email copies to the caller.
    pub async fn record(
        &self,
        report: &ComplianceReport,
        source_task: Option<DbId>,
    ) -> Result<Delivery, StoreError> {
        let payload = json!({
            "intervention_id": report.intervention_id,
            "temperature_reading": report.temperature_reading,
            "haccp_compliant": report.haccp_compliant,
            "message": report.message(),
        });
        let delivery = self
            .dispatcher
            .record(
                NotificationKind::ComplianceReport,
                &Recipients::User(report.client_id),
                payload,
                source_task,
            )
            .await?;

        tracing::info!(
            intervention_id = report.intervention_id,
            client_id = report.client_id,
            "Compliance report generated"
        );
        Ok(delivery)
    }
}
