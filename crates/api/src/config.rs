use std::path::PathBuf;
use std::time::Duration;

use coldline_events::OutboxConfig;

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// JWT token configuration.
    pub jwt: JwtConfig,
    /// Directory uploaded photos are written to.
    pub photo_storage_dir: PathBuf,
    /// URL prefix under which stored photos are served.
    pub photo_public_base_url: String,
    /// Seconds between outbox processing passes (default: `5`).
    pub outbox_poll_interval_secs: u64,
    /// Attempts before an outbox task is marked failed (default: `5`).
    pub outbox_max_attempts: i32,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default                 |
    /// |-----------------------------|-------------------------|
    /// | `HOST`                      | `0.0.0.0`               |
    /// | `PORT`                      | `3000`                  |
    /// | `CORS_ORIGINS`              | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`      | `30`                    |
    /// | `PHOTO_STORAGE_DIR`         | `storage/photos`        |
    /// | `PHOTO_PUBLIC_BASE_URL`     | `/media/photos`         |
    /// | `OUTBOX_POLL_INTERVAL_SECS` | `5`                     |
    /// | `OUTBOX_MAX_ATTEMPTS`       | `5`                     |
    ///
    /// JWT settings are read by [`JwtConfig::from_env`].
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let photo_storage_dir = std::env::var("PHOTO_STORAGE_DIR")
            .unwrap_or_else(|_| "storage/photos".into())
            .into();

        let photo_public_base_url = std::env::var("PHOTO_PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "/media/photos".into())
            .trim_end_matches('/')
            .to_string();

        let outbox_poll_interval_secs: u64 = std::env::var("OUTBOX_POLL_INTERVAL_SECS")
            .unwrap_or_else(|_| "5".into())
            .parse()
            .expect("OUTBOX_POLL_INTERVAL_SECS must be a valid u64");

        let outbox_max_attempts: i32 = std::env::var("OUTBOX_MAX_ATTEMPTS")
            .unwrap_or_else(|_| "5".into())
            .parse()
            .expect("OUTBOX_MAX_ATTEMPTS must be a valid i32");
        assert!(outbox_max_attempts > 0, "OUTBOX_MAX_ATTEMPTS must be positive");

        let jwt = JwtConfig::from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            jwt,
            photo_storage_dir,
            photo_public_base_url,
            outbox_poll_interval_secs,
            outbox_max_attempts,
        }
    }

    /// Outbox processor tuning derived from this configuration.
    pub fn outbox_config(&self) -> OutboxConfig {
        OutboxConfig {
            max_attempts: self.outbox_max_attempts,
            poll_interval: Duration::from_secs(self.outbox_poll_interval_secs.max(1)),
            ..OutboxConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outbox_config_carries_overrides() {
        let config = ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            cors_origins: vec![],
            request_timeout_secs: 30,
            jwt: JwtConfig {
                secret: "s".into(),
                access_token_expiry_mins: 15,
            },
            photo_storage_dir: "storage/photos".into(),
            photo_public_base_url: "/media/photos".into(),
            outbox_poll_interval_secs: 0,
            outbox_max_attempts: 7,
        };
        let outbox = config.outbox_config();
        assert_eq!(outbox.max_attempts, 7);
        assert_eq!(outbox.poll_interval, Duration::from_secs(1));
    }
}
