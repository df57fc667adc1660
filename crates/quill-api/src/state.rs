//! # Application State & Configuration
//!
//! [`AppConfig`] is read from the environment once at startup.
//! [`AppState`] holds the two domain components and the shared counters,
//! and is cloned into every handler.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use quill_core::{IngestionGate, PresentationResolver, PublicDirProbe};
use thiserror::Error;

use crate::auth::SecretString;
use crate::middleware::metrics::ApiMetrics;

/// Default request body limit (10 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Default per-client request budget per minute.
pub const DEFAULT_RATE_LIMIT_PER_MINUTE: u64 = 600;

/// Invalid environment configuration.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable was set but could not be parsed.
    #[error("{name} must be {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Application configuration.
///
/// `Debug` is safe to log: the auth token is a [`SecretString`].
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Shared bearer secret. If `None`, authentication is disabled.
    pub auth_token: Option<SecretString>,
    /// Public root; uploads land in `{public_dir}/uploads`.
    pub public_dir: PathBuf,
    /// Request body limit in bytes.
    pub max_upload_bytes: usize,
    /// JSONL audit log path, used when no database is configured.
    pub audit_log: Option<PathBuf>,
    /// Requests allowed per client IP per minute.
    pub rate_limit_per_minute: u64,
    /// Rate-limit on forwarding headers rather than the socket peer.
    /// Set only behind a proxy that overwrites them.
    pub trust_proxy_headers: bool,
    /// Emit JSON log lines instead of human-readable ones.
    pub json_logs: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
            public_dir: PathBuf::from("public"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            audit_log: None,
            rate_limit_per_minute: DEFAULT_RATE_LIMIT_PER_MINUTE,
            trust_proxy_headers: false,
            json_logs: false,
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Ok(Self {
            port: parse_var(&non_empty, "PORT", "a port number")?.unwrap_or(defaults.port),
            auth_token: non_empty("AUTH_TOKEN").map(SecretString::new),
            public_dir: non_empty("QUILL_PUBLIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.public_dir),
            max_upload_bytes: parse_var(&non_empty, "QUILL_MAX_UPLOAD_BYTES", "a byte count")?
                .unwrap_or(defaults.max_upload_bytes),
            audit_log: non_empty("QUILL_AUDIT_LOG").map(PathBuf::from),
            rate_limit_per_minute: parse_var(
                &non_empty,
                "QUILL_RATE_LIMIT_PER_MINUTE",
                "a positive integer",
            )?
            .filter(|n| *n > 0)
            .unwrap_or(defaults.rate_limit_per_minute),
            trust_proxy_headers: parse_var(&non_empty, "QUILL_TRUST_PROXY_HEADERS", "true or false")?
                .unwrap_or(defaults.trust_proxy_headers),
            json_logs: non_empty("QUILL_LOG_FORMAT").is_some_and(|v| v.eq_ignore_ascii_case("json")),
        })
    }
}

fn parse_var<T, F>(lookup: &F, name: &'static str, expected: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid {
                name,
                expected,
                value,
            }),
    }
}

/// Shared application state accessible to all route handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    /// The upload pipeline.
    pub gate: IngestionGate,
    /// Preview-card resolver over the public directory.
    pub resolver: Arc<PresentationResolver<PublicDirProbe>>,
    /// Request and upload counters.
    pub metrics: ApiMetrics,
}

impl AppState {
    /// Assemble state around an already-configured gate.
    pub fn new(config: AppConfig, gate: IngestionGate) -> Self {
        let resolver = PresentationResolver::new(PublicDirProbe::new(&config.public_dir));
        Self {
            config: Arc::new(config),
            gate,
            resolver: Arc::new(resolver),
            metrics: ApiMetrics::new(),
        }
    }

    /// The public root directory.
    pub fn public_dir(&self) -> &Path {
        &self.config.public_dir
    }
}
