//! In-process implementation of every store trait.
//!
//! One mutex guards all tables, so an intervention write and its outbox
//! tasks become visible together, mirroring the PostgreSQL transaction.
//! Used by the test suites and for running the API without a database.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use coldline_core::change::SideEffect;
use coldline_core::intervention::STATUS_PENDING;
use coldline_core::roles::Role;
use coldline_core::types::{DbId, Timestamp};
use sqlx::types::Json;
use tokio::sync::Mutex;

use crate::models::intervention::{Intervention, InterventionFilter, NewIntervention};
use crate::models::notification::{NewNotification, Notification};
use crate::models::outbox::{OutboxTask, OUTBOX_DONE, OUTBOX_FAILED, OUTBOX_PENDING};
use crate::models::user::DirectoryUser;
use crate::store::{InterventionStore, NotificationStore, OutboxStore, StoreError, UserDirectory};

#[derive(Default)]
struct Tables {
    interventions: BTreeMap<DbId, Intervention>,
    users: BTreeMap<DbId, DirectoryUser>,
    notifications: Vec<Notification>,
    outbox: Vec<OutboxTask>,
    last_intervention_id: DbId,
    last_notification_id: DbId,
    last_task_id: DbId,
    reject_notification_writes: bool,
}

impl Tables {
    fn enqueue(&mut self, intervention_id: DbId, effects: &[SideEffect]) {
        let now = Utc::now();
        for effect in effects {
            self.last_task_id += 1;
            self.outbox.push(OutboxTask {
                id: self.last_task_id,
                intervention_id,
                kind: effect.name().to_string(),
                effect: Json(effect.clone()),
                status: OUTBOX_PENDING.to_string(),
                attempts: 0,
                last_error: None,
                next_attempt_at: now,
                processed_at: None,
                created_at: now,
            });
        }
    }

    fn task_mut(&mut self, task_id: DbId) -> Option<&mut OutboxTask> {
        self.outbox.iter_mut().find(|t| t.id == task_id)
    }
}

/// Thread-safe in-memory store.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a directory user.
    pub async fn add_user(&self, id: DbId, name: &str, email: Option<&str>, role: Role) {
        let mut tables = self.tables.lock().await;
        tables.users.insert(
            id,
            DirectoryUser {
                id,
                name: name.to_string(),
                email: email.map(str::to_string),
                role: role.as_str().to_string(),
                is_active: true,
            },
        );
    }

    /// Mark a directory user inactive; inactive users are skipped by role
    /// fan-out.
    pub async fn deactivate_user(&self, id: DbId) {
        if let Some(user) = self.tables.lock().await.users.get_mut(&id) {
            user.is_active = false;
        }
    }

    /// Make every subsequent notification batch fail, to exercise retries.
    pub async fn reject_notification_writes(&self, reject: bool) {
        self.tables.lock().await.reject_notification_writes = reject;
    }

    /// Every stored notification, in insertion order.
    pub async fn all_notifications(&self) -> Vec<Notification> {
        self.tables.lock().await.notifications.clone()
    }

    /// Every outbox task, in insertion order.
    pub async fn all_tasks(&self) -> Vec<OutboxTask> {
        self.tables.lock().await.outbox.clone()
    }
}

#[async_trait]
impl InterventionStore for MemoryStore {
    async fn insert(
        &self,
        input: &NewIntervention,
        effects: &[SideEffect],
    ) -> Result<Intervention, StoreError> {
        let mut tables = self.tables.lock().await;
        tables.last_intervention_id += 1;
        let now = Utc::now();
        let record = Intervention {
            id: tables.last_intervention_id,
            client_id: input.client_id,
            equipment_category: input.equipment_category.clone(),
            urgency: input.urgency.clone(),
            description: input.description.clone(),
            temperature_reading: input.temperature_reading,
            energy_source: input.energy_source.clone(),
            haccp_compliant: input.haccp_compliant,
            photos: Vec::new(),
            status: STATUS_PENDING.to_string(),
            technician_id: None,
            created_by: input.created_by,
            created_at: now,
            updated_at: now,
        };
        tables.interventions.insert(record.id, record.clone());
        tables.enqueue(record.id, effects);
        Ok(record)
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<Intervention>, StoreError> {
        Ok(self.tables.lock().await.interventions.get(&id).cloned())
    }

    async fn list(&self, filter: &InterventionFilter) -> Result<Vec<Intervention>, StoreError> {
        let tables = self.tables.lock().await;
        let offset = usize::try_from(filter.offset).unwrap_or(0);
        let limit = usize::try_from(filter.limit).unwrap_or(0);
        Ok(tables
            .interventions
            .values()
            .rev()
            .filter(|r| filter.matches(r))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn update(
        &self,
        record: &Intervention,
        effects: &[SideEffect],
    ) -> Result<Option<Intervention>, StoreError> {
        let mut tables = self.tables.lock().await;
        let Some(stored) = tables.interventions.get_mut(&record.id) else {
            return Ok(None);
        };
        stored.client_id = record.client_id;
        stored.equipment_category = record.equipment_category.clone();
        stored.urgency = record.urgency.clone();
        stored.description = record.description.clone();
        stored.temperature_reading = record.temperature_reading;
        stored.energy_source = record.energy_source.clone();
        stored.haccp_compliant = record.haccp_compliant;
        stored.photos = record.photos.clone();
        stored.status = record.status.clone();
        stored.technician_id = record.technician_id;
        stored.updated_at = Utc::now();
        let updated = stored.clone();
        tables.enqueue(updated.id, effects);
        Ok(Some(updated))
    }

    async fn delete(&self, id: DbId) -> Result<bool, StoreError> {
        Ok(self.tables.lock().await.interventions.remove(&id).is_some())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn find_user(&self, id: DbId) -> Result<Option<DirectoryUser>, StoreError> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }

    async fn users_with_roles(&self, roles: &[Role]) -> Result<Vec<DirectoryUser>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .values()
            .filter(|u| u.is_active && roles.iter().any(|r| u.has_role(*r)))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn insert_batch(
        &self,
        batch: &[NewNotification],
    ) -> Result<Vec<Notification>, StoreError> {
        let mut tables = self.tables.lock().await;
        if tables.reject_notification_writes {
            return Err(StoreError::Unavailable(
                "notification writes are disabled".into(),
            ));
        }
        let now = Utc::now();
        let mut created: Vec<Notification> = Vec::with_capacity(batch.len());
        for n in batch {
            let written = |existing: &Notification| {
                n.source_task_id.is_some()
                    && existing.source_task_id == n.source_task_id
                    && existing.recipient_id == n.recipient_id
            };
            if tables.notifications.iter().chain(created.iter()).any(written) {
                continue;
            }
            tables.last_notification_id += 1;
            created.push(Notification {
                id: tables.last_notification_id,
                recipient_id: n.recipient_id,
                kind: n.kind.clone(),
                payload: n.payload.clone(),
                source_task_id: n.source_task_id,
                is_read: false,
                read_at: None,
                created_at: now,
            });
        }
        tables.notifications.extend(created.iter().cloned());
        Ok(created)
    }

    async fn list_for_user(
        &self,
        user_id: DbId,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .notifications
            .iter()
            .rev()
            .filter(|n| n.recipient_id == user_id && (!unread_only || !n.is_read))
            .skip(usize::try_from(offset).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .cloned()
            .collect())
    }

    async fn unread_count(&self, user_id: DbId) -> Result<i64, StoreError> {
        let tables = self.tables.lock().await;
        let count = tables
            .notifications
            .iter()
            .filter(|n| n.recipient_id == user_id && !n.is_read)
            .count();
        Ok(count as i64)
    }

    async fn mark_read(&self, notification_id: DbId, user_id: DbId) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock().await;
        let found = tables
            .notifications
            .iter_mut()
            .find(|n| n.id == notification_id && n.recipient_id == user_id && !n.is_read);
        Ok(match found {
            Some(n) => {
                n.is_read = true;
                n.read_at = Some(Utc::now());
                true
            }
            None => false,
        })
    }

    async fn mark_all_read(&self, user_id: DbId) -> Result<u64, StoreError> {
        let mut tables = self.tables.lock().await;
        let now = Utc::now();
        let mut count = 0;
        for n in tables
            .notifications
            .iter_mut()
            .filter(|n| n.recipient_id == user_id && !n.is_read)
        {
            n.is_read = true;
            n.read_at = Some(now);
            count += 1;
        }
        Ok(count)
    }
}

#[async_trait]
impl OutboxStore for MemoryStore {
    async fn claim_due(
        &self,
        limit: i64,
        lease_until: Timestamp,
    ) -> Result<Vec<OutboxTask>, StoreError> {
        let mut tables = self.tables.lock().await;
        let now = Utc::now();
        let limit = usize::try_from(limit).unwrap_or(0);
        let mut claimed = Vec::new();
        for task in tables
            .outbox
            .iter_mut()
            .filter(|t| t.status == OUTBOX_PENDING && t.next_attempt_at <= now)
            .take(limit)
        {
            task.next_attempt_at = lease_until;
            claimed.push(task.clone());
        }
        Ok(claimed)
    }

    async fn mark_done(&self, task_id: DbId) -> Result<(), StoreError> {
        if let Some(task) = self.tables.lock().await.task_mut(task_id) {
            task.status = OUTBOX_DONE.to_string();
            task.attempts += 1;
            task.last_error = None;
            task.processed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn mark_failed(
        &self,
        task_id: DbId,
        error: &str,
        retry_at: Option<Timestamp>,
    ) -> Result<(), StoreError> {
        if let Some(task) = self.tables.lock().await.task_mut(task_id) {
            task.attempts += 1;
            task.last_error = Some(error.to_string());
            match retry_at {
                Some(at) => task.next_attempt_at = at,
                None => {
                    task.status = OUTBOX_FAILED.to_string();
                    task.processed_at = Some(Utc::now());
                }
            }
        }
        Ok(())
    }

    async fn find_task(&self, task_id: DbId) -> Result<Option<OutboxTask>, StoreError> {
        Ok(self
            .tables
            .lock()
            .await
            .outbox
            .iter()
            .find(|t| t.id == task_id)
            .cloned())
    }
}
