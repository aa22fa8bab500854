//! LifecycleController for interventions.
//!
//! Every mutating operation follows the same path: load the record, check it
//! against the access policy, validate the input, compute the side effects of
//! the change, and write record and side effects together. Side effects are
//! executed later by the outbox processor, so a notification failure never
//! turns a committed mutation into an error.

use std::sync::Arc;

use coldline_core::access::{authorize, list_scope, Actor, ListScope, Operation};
use coldline_core::change::{detect_changes, SideEffect};
use coldline_core::error::CoreError;
use coldline_core::intervention::{
    ensure_photo_capacity, validate_description, validate_temperature, validate_transition,
    EnergySource,
    EquipmentCategory, InterventionStatus, Urgency,
};
use coldline_core::roles::Role;
use coldline_core::types::DbId;
use coldline_db::models::intervention::{
    CreateIntervention, EquipmentRef, Intervention, InterventionDetail, InterventionFilter,
    InterventionListParams, NewIntervention, UpdateIntervention,
};
use coldline_db::{InterventionStore, StoreError, UserDirectory};
use futures::future::try_join_all;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::storage::{PhotoStorage, PhotoUpload, StorageError};

/// Default page size for intervention listing.
pub const DEFAULT_LIST_LIMIT: i64 = 50;

/// Maximum page size for intervention listing.
pub const MAX_LIST_LIMIT: i64 = 200;

const ENTITY: &str = "Intervention";

pub struct InterventionLifecycle {
    store: Arc<dyn InterventionStore>,
    users: Arc<dyn UserDirectory>,
    photos: Arc<dyn PhotoStorage>,
}

impl InterventionLifecycle {
    pub fn new(
        store: Arc<dyn InterventionStore>,
        users: Arc<dyn UserDirectory>,
        photos: Arc<dyn PhotoStorage>,
    ) -> Self {
        Self {
            store,
            users,
            photos,
        }
    }

    /// Reachability of the backing store.
    pub async fn ping(&self) -> Result<(), StoreError> {
        self.store.ping().await
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Create a pending intervention and queue the staff fan-out.
    pub async fn create(&self, actor: &Actor, input: CreateIntervention) -> AppResult<Intervention> {
        authorize(actor, Operation::Create, None)?;

        if input.photos.is_some() {
            return Err(CoreError::Validation(
                "photos: photos cannot be supplied at creation; attach them afterwards".into(),
            )
            .into());
        }
        input.validate().map_err(CoreError::from)?;

        let equipment = EquipmentCategory::from_str(required(
            input.equipment_category.as_deref(),
            "equipment_category",
        )?)?;
        let urgency = match input.urgency.as_deref() {
            Some(u) => Urgency::from_str(u)?,
            None => Urgency::default(),
        };
        let energy_source = input
            .energy_source
            .as_deref()
            .map(EnergySource::from_str)
            .transpose()?;
        let description = required(input.description.as_deref(), "description")?;
        validate_description(description)?;

        self.ensure_user_exists("created_by", actor.id).await?;
        let client_id = match input.client_id {
            Some(id) if id != actor.id => {
                self.ensure_user_exists("client_id", id).await?;
                id
            }
            Some(id) => id,
            None => actor.id,
        };

        let new = NewIntervention {
            client_id,
            equipment_category: equipment.as_str().to_string(),
            urgency: urgency.as_str().to_string(),
            description: description.to_string(),
            temperature_reading: input.temperature_reading,
            energy_source: energy_source.map(|e| e.as_str().to_string()),
            haccp_compliant: input.haccp_compliant.unwrap_or(false),
            created_by: actor.id,
        };
        let effects = [SideEffect::NewIntervention {
            equipment_category: new.equipment_category.clone(),
            urgency: new.urgency.clone(),
        }];

        let created = self.store.insert(&new, &effects).await?;

        tracing::info!(
            intervention_id = created.id,
            user_id = actor.id,
            client_id = created.client_id,
            equipment_category = %created.equipment_category,
            urgency = %created.urgency,
            "Intervention created"
        );
        Ok(created)
    }

    /// Fetch one intervention with its references populated.
    pub async fn get(&self, actor: &Actor, id: DbId) -> AppResult<InterventionDetail> {
        let record = self.load_authorized(actor, Operation::Read, id).await?;

        let client = self.users.find_user(record.client_id).await?.map(|u| u.to_ref());
        let technician = match record.technician_id {
            Some(tid) => self.users.find_user(tid).await?.map(|u| u.to_ref()),
            None => None,
        };
        let equipment = EquipmentRef {
            code: record.equipment_category.clone(),
            label: EquipmentCategory::from_str(&record.equipment_category)
                .map(|e| e.label().to_string())
                .unwrap_or_else(|_| record.equipment_category.clone()),
        };

        Ok(InterventionDetail {
            intervention: record,
            client,
            technician,
            equipment,
        })
    }

    /// List interventions visible to `actor`, newest first.
    pub async fn list(
        &self,
        actor: &Actor,
        params: InterventionListParams,
    ) -> AppResult<Vec<Intervention>> {
        if let Some(status) = params.status.as_deref() {
            InterventionStatus::from_str(status)?;
        }
        if let Some(category) = params.equipment_category.as_deref() {
            EquipmentCategory::from_str(category)?;
        }

        let participant = match list_scope(actor) {
            ListScope::All => None,
            ListScope::Participant(user_id) => Some(user_id),
        };
        let filter = InterventionFilter {
            status: params.status,
            client_id: params.client_id,
            technician_id: params.technician_id,
            equipment_category: params.equipment_category,
            participant,
            limit: params
                .limit
                .unwrap_or(DEFAULT_LIST_LIMIT)
                .clamp(1, MAX_LIST_LIMIT),
            offset: params.offset.unwrap_or(0).max(0),
        };

        Ok(self.store.list(&filter).await?)
    }

    /// Apply a partial update.
    pub async fn update(
        &self,
        actor: &Actor,
        id: DbId,
        patch: UpdateIntervention,
    ) -> AppResult<Intervention> {
        let before = self.load_authorized(actor, Operation::Update, id).await?;
        patch.validate().map_err(CoreError::from)?;

        let mut after = before.clone();

        if let Some(client_id) = patch.client_id {
            if client_id != before.client_id {
                self.ensure_user_exists("client_id", client_id).await?;
            }
            after.client_id = client_id;
        }
        if let Some(category) = patch.equipment_category.as_deref() {
            after.equipment_category = EquipmentCategory::from_str(category)?.as_str().to_string();
        }
        if let Some(urgency) = patch.urgency.as_deref() {
            after.urgency = Urgency::from_str(urgency)?.as_str().to_string();
        }
        if let Some(description) = patch.description {
            validate_description(&description)?;
            after.description = description;
        }
        match patch.temperature_reading {
            Some(Some(temperature)) => {
                validate_temperature(temperature)?;
                after.temperature_reading = Some(temperature);
            }
            Some(None) => after.temperature_reading = None,
            None => {}
        }
        if let Some(source) = patch.energy_source.as_deref() {
            after.energy_source = Some(EnergySource::from_str(source)?.as_str().to_string());
        }
        if let Some(compliant) = patch.haccp_compliant {
            after.haccp_compliant = compliant;
        }
        if let Some(photos) = patch.photos {
            ensure_photo_capacity(0, photos.len())?;
            after.photos = photos;
        }
        if let Some(status) = patch.status.as_deref() {
            after.status = transition(&before.status, status)?;
        }
        if let Some(technician_id) = patch.technician_id {
            if let Some(tid) = technician_id.filter(|t| Some(*t) != before.technician_id) {
                self.ensure_technician(tid).await?;
            }
            after.technician_id = technician_id;
        }

        let updated = self.persist(&before, &after).await?;
        tracing::info!(intervention_id = id, user_id = actor.id, "Intervention updated");
        Ok(updated)
    }

    /// Move an intervention to another status.
    pub async fn change_status(
        &self,
        actor: &Actor,
        id: DbId,
        status: &str,
    ) -> AppResult<Intervention> {
        let before = self.load_authorized(actor, Operation::ChangeStatus, id).await?;

        let mut after = before.clone();
        after.status = transition(&before.status, status)?;

        let updated = self.persist(&before, &after).await?;
        tracing::info!(
            intervention_id = id,
            user_id = actor.id,
            from = %before.status,
            to = %updated.status,
            "Intervention status changed"
        );
        Ok(updated)
    }

    /// Upload `files` concurrently and append their references.
    ///
    /// The photo cap and every file type are checked before anything is
    /// uploaded; one failed upload fails the whole call.
    pub async fn attach_photos(
        &self,
        actor: &Actor,
        id: DbId,
        files: Vec<PhotoUpload>,
    ) -> AppResult<Intervention> {
        let before = self.load_authorized(actor, Operation::AttachPhotos, id).await?;

        if files.is_empty() {
            return Err(AppError::BadRequest(
                "photos: at least one photo is required".into(),
            ));
        }
        ensure_photo_capacity(before.photos.len(), files.len())?;
        if let Some(rejected) = files.iter().find(|f| !self.photos.accepts(&f.content_type)) {
            return Err(StorageError::UnsupportedType(rejected.content_type.clone()).into());
        }

        let urls = try_join_all(files.iter().map(|f| self.photos.upload(id, f))).await?;

        let mut after = before.clone();
        after.photos.extend(urls);

        let updated = self.persist(&before, &after).await?;
        tracing::info!(
            intervention_id = id,
            user_id = actor.id,
            added = files.len(),
            total = updated.photos.len(),
            "Photos attached"
        );
        Ok(updated)
    }

    /// Hard-delete an intervention. Admin only.
    pub async fn delete(&self, actor: &Actor, id: DbId) -> AppResult<()> {
        authorize(actor, Operation::Delete, None)?;

        if !self.store.delete(id).await? {
            return Err(not_found(id));
        }
        tracing::info!(intervention_id = id, user_id = actor.id, "Intervention deleted");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    async fn load_authorized(&self, actor: &Actor, op: Operation, id: DbId) -> AppResult<Intervention> {
        let record = self.store.find_by_id(id).await?.ok_or_else(|| not_found(id))?;
        authorize(actor, op, Some(&record.participants()))?;
        Ok(record)
    }

    /// Write `after` together with the side effects of `before -> after`.
    async fn persist(&self, before: &Intervention, after: &Intervention) -> AppResult<Intervention> {
        let effects = detect_changes(&before.snapshot(), &after.snapshot());
        for effect in &effects {
            tracing::debug!(intervention_id = after.id, effect = effect.name(), "Side effect queued");
        }
        self.store
            .update(after, &effects)
            .await?
            .ok_or_else(|| not_found(after.id))
    }

    async fn ensure_user_exists(&self, field: &str, user_id: DbId) -> AppResult<()> {
        if self.users.find_user(user_id).await?.is_none() {
            return Err(CoreError::Validation(format!("{field}: user {user_id} does not exist")).into());
        }
        Ok(())
    }

    async fn ensure_technician(&self, user_id: DbId) -> AppResult<()> {
        match self.users.find_user(user_id).await? {
            Some(user) if user.has_role(Role::Technician) => Ok(()),
            Some(_) => Err(CoreError::Validation(format!(
                "technician_id: user {user_id} is not a technician"
            ))
            .into()),
            None => Err(CoreError::Validation(format!(
                "technician_id: user {user_id} does not exist"
            ))
            .into()),
        }
    }
}

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound { entity: ENTITY, id })
}

fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, CoreError> {
    value.ok_or_else(|| CoreError::Validation(format!("{field}: is required")))
}

/// Validate `requested` against the transition table and return its stored form.
fn transition(current: &str, requested: &str) -> Result<String, CoreError> {
    let next = InterventionStatus::from_str(requested)?;
    let current = InterventionStatus::from_str(current)?;
    validate_transition(current, next)?;
    Ok(next.as_str().to_string())
}
