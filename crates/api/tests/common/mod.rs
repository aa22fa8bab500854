#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use coldline_api::auth::jwt::{generate_access_token, JwtConfig};
use coldline_api::config::ServerConfig;
use coldline_api::lifecycle::InterventionLifecycle;
use coldline_api::router::build_app_router;
use coldline_api::state::AppState;
use coldline_api::storage::LocalPhotoStorage;
use coldline_core::access::Actor;
use coldline_core::roles::Role;
use coldline_core::types::DbId;
use coldline_db::memory::MemoryStore;
use coldline_events::{NotificationDispatcher, OutboxConfig, OutboxProcessor};
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

pub const ADMIN: DbId = 1;
pub const TECHNICIAN: DbId = 2;
pub const CLIENT: DbId = 3;
pub const OTHER_CLIENT: DbId = 4;
pub const OTHER_TECHNICIAN: DbId = 5;

pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config(photo_dir: &TempDir) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "integration-test-secret-long-enough".to_string(),
            access_token_expiry_mins: 15,
        },
        photo_storage_dir: photo_dir.path().to_path_buf(),
        photo_public_base_url: "/media/photos".to_string(),
        outbox_poll_interval_secs: 1,
        outbox_max_attempts: 3,
    }
}

/// Application wired to an in-memory store.
///
/// Side effects stay queued until [`TestApp::drain_outbox`] is called.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub lifecycle: Arc<InterventionLifecycle>,
    pub outbox: OutboxProcessor,
    pub config: ServerConfig,
    pub photo_dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let photo_dir = tempfile::tempdir().unwrap();
        let config = test_config(&photo_dir);

        let store = Arc::new(MemoryStore::new());
        store.add_user(ADMIN, "Ada Admin", Some("ada@example.com"), Role::Admin).await;
        store.add_user(TECHNICIAN, "Tom Tech", Some("tom@example.com"), Role::Technician).await;
        store.add_user(CLIENT, "Cleo Client", Some("cleo@example.com"), Role::Client).await;
        store.add_user(OTHER_CLIENT, "Dan Client", None, Role::Client).await;
        store.add_user(OTHER_TECHNICIAN, "Ivo Tech", None, Role::Technician).await;

        let photos = LocalPhotoStorage::new(
            config.photo_storage_dir.clone(),
            config.photo_public_base_url.clone(),
        );
        let lifecycle = Arc::new(InterventionLifecycle::new(
            store.clone(),
            store.clone(),
            Arc::new(photos),
        ));

        let dispatcher = Arc::new(NotificationDispatcher::new(store.clone(), store.clone()));
        let outbox = OutboxProcessor::new(store.clone(), dispatcher, OutboxConfig::default());

        let state = AppState {
            config: Arc::new(config.clone()),
            lifecycle: lifecycle.clone(),
            notifications: store.clone(),
        };
        let router = build_app_router(state, &config);

        Self {
            router,
            store,
            lifecycle,
            outbox,
            config,
            photo_dir,
        }
    }

    /// Execute every queued side effect.
    pub async fn drain_outbox(&self) {
        self.outbox.run_once().await.unwrap();
    }

    pub fn token(&self, user_id: DbId, role: Role) -> String {
        generate_access_token(user_id, role.as_str(), &self.config.jwt).unwrap()
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        auth: Option<(DbId, Role)>,
        body: Option<Value>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some((id, role)) = auth {
            builder = builder.header("authorization", format!("Bearer {}", self.token(id, role)));
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// POST a multipart body with one `photos` part per `(content_type, bytes)`.
    pub async fn upload_photos(
        &self,
        id: DbId,
        auth: (DbId, Role),
        files: &[(&str, &[u8])],
    ) -> Response<Body> {
        let boundary = "coldline-test-boundary";
        let mut body = Vec::new();
        for (i, (content_type, bytes)) in files.iter().enumerate() {
            body.extend_from_slice(
                format!(
                    "--{boundary}\r\nContent-Disposition: form-data; name=\"photos\"; \
                     filename=\"photo{i}\"\r\nContent-Type: {content_type}\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

        let request = Request::builder()
            .method(Method::POST)
            .uri(format!("/api/v1/interventions/{id}/photos"))
            .header("authorization", format!("Bearer {}", self.token(auth.0, auth.1)))
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();
        self.router.clone().oneshot(request).await.unwrap()
    }
}

pub fn actor(id: DbId, role: Role) -> Actor {
    Actor::new(id, role)
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
