//! Route definitions for the `/interventions` resource.
//!
//! All endpoints require authentication.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::interventions;
use crate::state::AppState;

/// Upper bound on a photo upload request (three photos plus multipart framing).
const PHOTO_UPLOAD_LIMIT_BYTES: usize = 32 * 1024 * 1024;

/// Routes mounted at `/interventions`.
///
/// ```text
/// GET    /               -> list
/// POST   /               -> create
/// GET    /{id}           -> get_by_id
/// PUT    /{id}           -> update
/// DELETE /{id}           -> delete
/// PUT    /{id}/status    -> change_status
/// POST   /{id}/photos    -> attach_photos
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(interventions::list).post(interventions::create))
        .route(
            "/{id}",
            get(interventions::get_by_id)
                .put(interventions::update)
                .delete(interventions::delete),
        )
        .route("/{id}/status", put(interventions::change_status))
        .route(
            "/{id}/photos",
            post(interventions::attach_photos)
                .layer(DefaultBodyLimit::max(PHOTO_UPLOAD_LIMIT_BYTES)),
        )
}
