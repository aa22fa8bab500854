//! PostgreSQL implementation of the store traits.

use async_trait::async_trait;
use coldline_core::change::SideEffect;
use coldline_core::roles::Role;
use coldline_core::types::{DbId, Timestamp};

use crate::models::intervention::{Intervention, InterventionFilter, NewIntervention};
use crate::models::notification::{NewNotification, Notification};
use crate::models::outbox::OutboxTask;
use crate::models::user::DirectoryUser;
use crate::repositories::{InterventionRepo, NotificationRepo, OutboxRepo, UserRepo};
use crate::store::{InterventionStore, NotificationStore, OutboxStore, StoreError, UserDirectory};
use crate::DbPool;

/// Every store trait backed by one connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl InterventionStore for PgStore {
    async fn insert(
        &self,
        input: &NewIntervention,
        effects: &[SideEffect],
    ) -> Result<Intervention, StoreError> {
        let mut tx = self.pool.begin().await?;
        let created = InterventionRepo::create(&mut *tx, input).await?;
        OutboxRepo::enqueue(&mut *tx, created.id, effects).await?;
        tx.commit().await?;
        Ok(created)
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<Intervention>, StoreError> {
        Ok(InterventionRepo::find_by_id(&self.pool, id).await?)
    }

    async fn list(&self, filter: &InterventionFilter) -> Result<Vec<Intervention>, StoreError> {
        Ok(InterventionRepo::list_filtered(&self.pool, filter).await?)
    }

    async fn update(
        &self,
        record: &Intervention,
        effects: &[SideEffect],
    ) -> Result<Option<Intervention>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let Some(updated) = InterventionRepo::update(&mut *tx, record).await? else {
            tx.rollback().await?;
            return Ok(None);
        };
        OutboxRepo::enqueue(&mut *tx, updated.id, effects).await?;
        tx.commit().await?;
        Ok(Some(updated))
    }

    async fn delete(&self, id: DbId) -> Result<bool, StoreError> {
        Ok(InterventionRepo::hard_delete(&self.pool, id).await?)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(crate::health_check(&self.pool).await?)
    }
}

#[async_trait]
impl UserDirectory for PgStore {
    async fn find_user(&self, id: DbId) -> Result<Option<DirectoryUser>, StoreError> {
        Ok(UserRepo::find_by_id(&self.pool, id).await?)
    }

    async fn users_with_roles(&self, roles: &[Role]) -> Result<Vec<DirectoryUser>, StoreError> {
        let names: Vec<String> = roles.iter().map(|r| r.as_str().to_string()).collect();
        Ok(UserRepo::list_active_by_roles(&self.pool, &names).await?)
    }
}

#[async_trait]
impl NotificationStore for PgStore {
    async fn insert_batch(
        &self,
        batch: &[NewNotification],
    ) -> Result<Vec<Notification>, StoreError> {
        Ok(NotificationRepo::create_batch(&self.pool, batch).await?)
    }

    async fn list_for_user(
        &self,
        user_id: DbId,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>, StoreError> {
        Ok(NotificationRepo::list_for_user(&self.pool, user_id, unread_only, limit, offset).await?)
    }

    async fn unread_count(&self, user_id: DbId) -> Result<i64, StoreError> {
        Ok(NotificationRepo::unread_count(&self.pool, user_id).await?)
    }

    async fn mark_read(&self, notification_id: DbId, user_id: DbId) -> Result<bool, StoreError> {
        Ok(NotificationRepo::mark_read(&self.pool, notification_id, user_id).await?)
    }

    async fn mark_all_read(&self, user_id: DbId) -> Result<u64, StoreError> {
        Ok(NotificationRepo::mark_all_read(&self.pool, user_id).await?)
    }
}

#[async_trait]
impl OutboxStore for PgStore {
    async fn claim_due(
        &self,
        limit: i64,
        lease_until: Timestamp,
    ) -> Result<Vec<OutboxTask>, StoreError> {
        Ok(OutboxRepo::claim_due(&self.pool, limit, lease_until).await?)
    }

    async fn mark_done(&self, task_id: DbId) -> Result<(), StoreError> {
        Ok(OutboxRepo::mark_done(&self.pool, task_id).await?)
    }

    async fn mark_failed(
        &self,
        task_id: DbId,
        error: &str,
        retry_at: Option<Timestamp>,
    ) -> Result<(), StoreError> {
        Ok(OutboxRepo::mark_failed(&self.pool, task_id, error, retry_at).await?)
    }

    async fn find_task(&self, task_id: DbId) -> Result<Option<OutboxTask>, StoreError> {
        Ok(OutboxRepo::find_by_id(&self.pool, task_id).await?)
    }
}
