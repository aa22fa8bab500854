use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use coldline_api::config::ServerConfig;
use coldline_api::lifecycle::InterventionLifecycle;
use coldline_api::router::build_app_router;
use coldline_api::state::AppState;
use coldline_api::storage::LocalPhotoStorage;
use coldline_db::repositories::PgStore;
use coldline_events::{EmailConfig, NotificationDispatcher, OutboxProcessor, SmtpMailer};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "coldline_api=debug,coldline_events=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = coldline_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    coldline_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    coldline_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    let store = Arc::new(PgStore::new(pool));

    // --- Side effects ---
    let mut dispatcher = NotificationDispatcher::new(store.clone(), store.clone());
    match EmailConfig::from_env() {
        Some(email_config) => {
            let mailer = SmtpMailer::new(email_config).expect("Invalid SMTP configuration");
            dispatcher = dispatcher.with_mailer(Arc::new(mailer));
            tracing::info!("Email delivery enabled");
        }
        None => tracing::info!("SMTP_HOST not set, email delivery disabled"),
    }

    let outbox = OutboxProcessor::new(store.clone(), Arc::new(dispatcher), config.outbox_config());
    let outbox_cancel = CancellationToken::new();
    let outbox_cancel_clone = outbox_cancel.clone();
    let outbox_handle = tokio::spawn(async move {
        outbox.run(outbox_cancel_clone).await;
    });

    // --- App state ---
    let photos = LocalPhotoStorage::new(
        config.photo_storage_dir.clone(),
        config.photo_public_base_url.clone(),
    );
    let lifecycle = InterventionLifecycle::new(store.clone(), store.clone(), Arc::new(photos));
    let state = AppState {
        config: Arc::new(config.clone()),
        lifecycle: Arc::new(lifecycle),
        notifications: store,
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    outbox_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), outbox_handle).await;
    tracing::info!("Outbox processor stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT (Ctrl-C) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
