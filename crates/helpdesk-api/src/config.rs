//! Server configuration from environment variables.
//!
//! | variable | default |
//! |---|---|
//! | `DATABASE_URL` | `postgres://localhost/helpdesk` |
//! | `HOST` / `PORT` | `0.0.0.0` / `3000` |
//! | `UPLOAD_DIR` | `uploads` |
//! | `MAX_UPLOAD_BYTES` | `5242880` |
//! | `ALLOWED_EXTENSIONS` | `png,jpg,jpeg,pdf,zip,txt,log` |
//! | `MAX_BODY_BYTES` | `16777216` |
//! | `DB_MAX_CONNECTIONS` | `10` |
//! | `DB_MIN_CONNECTIONS` | `1` |
//! | `DB_CONNECT_TIMEOUT_SECS` | `30` |
//! | `ALLOWED_ORIGINS` | `http://localhost:3000` |
//!
//! Logging variables (`LOG_FORMAT`, `LOG_FILE`, `LOG_ANSI`, `RUST_LOG`) are
//! read by the binary before this config is built.

use std::str::FromStr;
use std::time::Duration;

use helpdesk_core::{defaults, AttachmentConfig, Error, Result};
use helpdesk_db::PoolConfig;
use tracing::warn;

/// Default CORS origin when `ALLOWED_ORIGINS` is unset or blank.
pub const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000";

/// Runtime configuration, built once at startup.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub attachments: AttachmentConfig,
    /// Request body limit; must exceed the upload limit.
    pub max_body_bytes: usize,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    /// Pool acquire timeout in seconds.
    pub db_connect_timeout_secs: u64,
    /// Raw CORS origins, validated when the router is built.
    pub allowed_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            database_url: defaults::DATABASE_URL.to_string(),
            host: defaults::SERVER_HOST.to_string(),
            port: defaults::SERVER_PORT,
            attachments: AttachmentConfig::default(),
            max_body_bytes: defaults::MAX_BODY_BYTES,
            db_max_connections: defaults::DB_MAX_CONNECTIONS,
            db_min_connections: defaults::DB_MIN_CONNECTIONS,
            db_connect_timeout_secs: defaults::DB_CONNECT_TIMEOUT_SECS,
            allowed_origins: split_list(DEFAULT_ALLOWED_ORIGINS),
        }
    }
}

impl ApiConfig {
    /// Build from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    ///
    /// Unparseable numbers fall back to their defaults with a warning.
    ///
    /// # Errors
    ///
    /// `Error::Config` if the body limit does not exceed the upload limit.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let fallback = Self::default();

        let mut attachments = AttachmentConfig::new(
            lookup("UPLOAD_DIR").unwrap_or_else(|| defaults::UPLOAD_DIR.to_string()),
        )
        .max_size_bytes(parse_or(&lookup, "MAX_UPLOAD_BYTES", defaults::MAX_UPLOAD_BYTES));
        if let Some(raw) = lookup("ALLOWED_EXTENSIONS").filter(|v| !v.trim().is_empty()) {
            attachments = attachments.allowed_extensions(raw.split(','));
        }

        let allowed_origins = lookup("ALLOWED_ORIGINS")
            .map(|raw| split_list(&raw))
            .filter(|origins| !origins.is_empty())
            .unwrap_or(fallback.allowed_origins);

        let config = Self {
            database_url: lookup("DATABASE_URL").unwrap_or(fallback.database_url),
            host: lookup("HOST").unwrap_or(fallback.host),
            port: parse_or(&lookup, "PORT", fallback.port),
            attachments,
            max_body_bytes: parse_or(&lookup, "MAX_BODY_BYTES", fallback.max_body_bytes),
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", fallback.db_max_connections),
            db_min_connections: parse_or(&lookup, "DB_MIN_CONNECTIONS", fallback.db_min_connections),
            db_connect_timeout_secs: parse_or(
                &lookup,
                "DB_CONNECT_TIMEOUT_SECS",
                fallback.db_connect_timeout_secs,
            ),
            allowed_origins,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.max_body_bytes as u64 <= self.attachments.max_size_bytes {
            return Err(Error::Config(format!(
                "MAX_BODY_BYTES ({}) must be larger than MAX_UPLOAD_BYTES ({})",
                self.max_body_bytes, self.attachments.max_size_bytes
            )));
        }
        if self.db_min_connections > self.db_max_connections {
            return Err(Error::Config(format!(
                "DB_MIN_CONNECTIONS ({}) exceeds DB_MAX_CONNECTIONS ({})",
                self.db_min_connections, self.db_max_connections
            )));
        }
        if self.attachments.allowed_extensions.is_empty() {
            return Err(Error::Config("ALLOWED_EXTENSIONS is empty".to_string()));
        }
        Ok(())
    }

    /// Pool settings for `Database::connect`.
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig::new()
            .max_connections(self.db_max_connections)
            .min_connections(self.db_min_connections)
            .connect_timeout(Duration::from_secs(self.db_connect_timeout_secs))
    }

    /// `host:port` for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + std::fmt::Display + Copy,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(
                subsystem = "config",
                key,
                value = %raw,
                default = %default,
                "Invalid value, using default"
            );
            default
        }),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
