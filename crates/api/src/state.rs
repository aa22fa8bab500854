use std::sync::Arc;

use coldline_db::NotificationStore;

use crate::config::ServerConfig;
use crate::lifecycle::InterventionLifecycle;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (JWT settings are read by the auth extractor).
    pub config: Arc<ServerConfig>,
    /// Intervention lifecycle controller.
    pub lifecycle: Arc<InterventionLifecycle>,
    /// Notification inbox of the authenticated user.
    pub notifications: Arc<dyn NotificationStore>,
}
