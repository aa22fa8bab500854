//! Handlers for the `/interventions` resource.
//!
//! Handlers only translate HTTP into [`InterventionLifecycle`] calls; access
//! policy, validation and side effects live in the lifecycle.
//!
//! [`InterventionLifecycle`]: crate::lifecycle::InterventionLifecycle

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use coldline_core::types::DbId;
use coldline_db::models::intervention::{
    ChangeInterventionStatus, CreateIntervention, Intervention, InterventionDetail,
    InterventionListParams, UpdateIntervention,
};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;
use crate::storage::PhotoUpload;

/// Multipart field carrying photo files.
const PHOTOS_FIELD: &str = "photos";

/// GET /api/v1/interventions
pub async fn list(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<InterventionListParams>,
) -> AppResult<Json<DataResponse<Vec<Intervention>>>> {
    let data = state.lifecycle.list(&auth.actor(), params).await?;
    Ok(Json(DataResponse { data }))
}

/// POST /api/v1/interventions
pub async fn create(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateIntervention>,
) -> AppResult<(StatusCode, Json<DataResponse<Intervention>>)> {
    let data = state.lifecycle.create(&auth.actor(), input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data })))
}

/// GET /api/v1/interventions/{id}
pub async fn get_by_id(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<InterventionDetail>>> {
    let data = state.lifecycle.get(&auth.actor(), id).await?;
    Ok(Json(DataResponse { data }))
}

/// PUT /api/v1/interventions/{id}
pub async fn update(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(patch): Json<UpdateIntervention>,
) -> AppResult<Json<DataResponse<Intervention>>> {
    let data = state.lifecycle.update(&auth.actor(), id, patch).await?;
    Ok(Json(DataResponse { data }))
}

/// PUT /api/v1/interventions/{id}/status
pub async fn change_status(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<ChangeInterventionStatus>,
) -> AppResult<Json<DataResponse<Intervention>>> {
    let data = state
        .lifecycle
        .change_status(&auth.actor(), id, &input.status)
        .await?;
    Ok(Json(DataResponse { data }))
}

/// DELETE /api/v1/interventions/{id}
pub async fn delete(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    state.lifecycle.delete(&auth.actor(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/interventions/{id}/photos
///
/// Multipart upload; every part named `photos` is one file. Other parts are
/// ignored.
pub async fn attach_photos(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    mut multipart: Multipart,
) -> AppResult<Json<DataResponse<Intervention>>> {
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some(PHOTOS_FIELD) {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        files.push(PhotoUpload {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }

    let data = state
        .lifecycle
        .attach_photos(&auth.actor(), id, files)
        .await?;
    Ok(Json(DataResponse { data }))
}
