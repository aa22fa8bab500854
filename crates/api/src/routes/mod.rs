//! Route tree.
//!
//! `/health` is mounted at the root by [`crate::router`]; everything else
//! lives under `/api/v1` via [`api_routes`].

use axum::Router;

use crate::state::AppState;

pub mod health;
pub mod interventions;
pub mod notifications;

/// All versioned API routes, to be nested under `/api/v1`.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/interventions", interventions::router())
        .nest("/notifications", notifications::router())
}
