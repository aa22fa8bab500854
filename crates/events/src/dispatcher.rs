//! NotificationDispatcher: recipient resolution, persistence and email copy.

use std::sync::Arc;

use coldline_core::notification::{NotificationKind, Recipients};
use coldline_core::types::DbId;
use coldline_db::models::notification::{NewNotification, Notification};
use coldline_db::models::user::DirectoryUser;
use coldline_db::{NotificationStore, StoreError, UserDirectory};
use futures::future::join_all;
use serde_json::Value;

use crate::delivery::email::{EmailTransport, OutgoingEmail};

/// Persists one notification per resolved recipient.
pub struct NotificationDispatcher {
    users: Arc<dyn UserDirectory>,
    notifications: Arc<dyn NotificationStore>,
    mailer: Option<Arc<dyn EmailTransport>>,
}

impl NotificationDispatcher {
    pub fn new(users: Arc<dyn UserDirectory>, notifications: Arc<dyn NotificationStore>) -> Self {
        Self {
            users,
            notifications,
            mailer: None,
        }
    }

    /// Attach an email channel for best-effort copies.
    pub fn with_mailer(mut self, mailer: Arc<dyn EmailTransport>) -> Self {
        self.mailer = Some(mailer);
        self
    }

    /// Turn a recipient selector into concrete users.
    ///
    /// A role set resolves to the active users currently holding any of the
    /// roles; an explicit user resolves to nobody if it no longer exists.
    pub async fn resolve(&self, recipients: &Recipients) -> Result<Vec<DirectoryUser>, StoreError> {
        match recipients {
            Recipients::Roles(roles) => self.users.users_with_roles(roles).await,
            Recipients::User(id) => Ok(self.users.find_user(*id).await?.into_iter().collect()),
        }
    }

    /// Resolve `recipients` and write one notification each in a single
    /// batch, then send the email copies. Email outcomes never affect the
    /// result.
    pub async fn dispatch(
        &self,
        kind: NotificationKind,
        recipients: &Recipients,
        payload: Value,
    ) -> Result<Vec<Notification>, StoreError> {
        let delivery = self.record(kind, recipients, payload, None).await?;
        self.send_emails(&delivery.emails).await;
        Ok(delivery.notifications)
    }

    /// Write the notifications without sending anything.
    ///
    /// With `source_task` set, recipients that already hold a record from
    /// that task are skipped, and the returned emails cover only the rows
    /// this call wrote.
    pub async fn record(
        &self,
        kind: NotificationKind,
        recipients: &Recipients,
        payload: Value,
        source_task: Option<DbId>,
    ) -> Result<Delivery, StoreError> {
        let users = self.resolve(recipients).await?;
        if users.is_empty() {
            tracing::debug!(kind = kind.as_str(), ?recipients, "No recipients resolved");
            return Ok(Delivery::default());
        }

        let batch: Vec<NewNotification> = users
            .iter()
            .map(|u| NewNotification {
                recipient_id: u.id,
                kind: kind.as_str().to_string(),
                payload: payload.clone(),
                source_task_id: source_task,
            })
            .collect();
        let created = self.notifications.insert_batch(&batch).await?;

        tracing::info!(
            kind = kind.as_str(),
            recipients = created.len(),
            skipped = batch.len() - created.len(),
            "Notifications recorded"
        );

        let emails = if kind.sends_email() && self.mailer.is_some() {
            created
                .iter()
                .filter_map(|n| users.iter().find(|u| u.id == n.recipient_id))
                .filter_map(|u| u.email.as_deref())
                .map(|to| render_email(kind, to, &payload))
                .collect()
        } else {
            Vec::new()
        };

        Ok(Delivery {
            notifications: created,
            emails,
        })
    }

    /// Send email copies concurrently. Failures are logged and dropped.
    pub async fn send_emails(&self, emails: &[OutgoingEmail]) {
        let Some(mailer) = &self.mailer else {
            return;
        };
        if emails.is_empty() {
            return;
        }

        let results = join_all(emails.iter().map(|e| mailer.send(e))).await;
        for (email, result) in emails.iter().zip(results) {
            if let Err(e) = result {
                tracing::warn!(to = %email.to, subject = %email.subject, error = %e, "Notification email failed");
            }
        }
    }
}

/// Rows written by one dispatch and the email copies still to be sent.
#[derive(Debug, Default)]
pub struct Delivery {
    pub notifications: Vec<Notification>,
    pub emails: Vec<OutgoingEmail>,
}

impl Delivery {
    pub fn merge(&mut self, other: Delivery) {
        self.notifications.extend(other.notifications);
        self.emails.extend(other.emails);
    }
}

fn render_email(kind: NotificationKind, to: &str, payload: &Value) -> OutgoingEmail {
    let subject = match kind {
        NotificationKind::NewIntervention => "[Coldline] New intervention request",
        NotificationKind::StatusChanged => "[Coldline] Intervention status updated",
        NotificationKind::ComplianceReport => "[Coldline] Compliance report",
    };
    let message = payload
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or(subject);
    let body = format!(
        "{message}\n\nDetails:\n{}",
        serde_json::to_string_pretty(payload).unwrap_or_default()
    );
    OutgoingEmail {
        to: to.to_string(),
        subject: subject.to_string(),
        body,
    }
}
