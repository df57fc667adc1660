//! # Per-Client Rate Limiting
//!
//! Fixed-window request counter keyed by client address. In-memory only.
//!
//! The key is the socket peer address. Forwarding headers are
//! caller-controlled, so they are honoured only when
//! [`RateLimitConfig::trust_proxy_headers`] is set (the service sits behind
//! a proxy that overwrites them).

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request};
use axum::http::{Extensions, HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use parking_lot::Mutex;

use crate::error::ErrorBody;
use crate::extractors::{resolve_client_ip, UNKNOWN_CLIENT};

/// Rate limiter configuration.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per window.
    pub max_requests: u64,
    /// Window duration.
    pub window: Duration,
    /// Key on `X-Forwarded-For` / `X-Real-IP` instead of the peer address.
    pub trust_proxy_headers: bool,
}

impl RateLimitConfig {
    /// `max_requests` per minute, keyed on the peer address.
    pub fn per_minute(max_requests: u64) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(60),
            trust_proxy_headers: false,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::per_minute(crate::state::DEFAULT_RATE_LIMIT_PER_MINUTE)
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u64,
    started: Instant,
}

/// Shared rate limiter state.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: Arc<Mutex<HashMap<String, Window>>>,
}

impl RateLimiter {
    /// Create a new rate limiter with the given config.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The counter key for a request.
    pub fn key_for(&self, headers: &HeaderMap, extensions: &Extensions) -> String {
        if self.config.trust_proxy_headers {
            return resolve_client_ip(headers, extensions);
        }
        match extensions.get::<ConnectInfo<SocketAddr>>() {
            Some(ConnectInfo(addr)) => addr.ip().to_string(),
            None => UNKNOWN_CLIENT.to_string(),
        }
    }

    /// Count one request from `key`; false once the window budget is spent.
    pub fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> bool {
        let mut windows = self.windows.lock();

        // Drop idle clients so the map tracks only the current window.
        if windows.len() > 10_000 {
            let window = self.config.window;
            windows.retain(|_, w| now.duration_since(w.started) < window);
        }

        let entry = windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            started: now,
        });
        if now.duration_since(entry.started) >= self.config.window {
            *entry = Window {
                count: 0,
                started: now,
            };
        }
        if entry.count >= self.config.max_requests {
            false
        } else {
            entry.count += 1;
            true
        }
    }
}

/// Middleware that enforces per-client rate limits.
pub async fn rate_limit_middleware(request: Request, next: Next) -> Response {
    if let Some(limiter) = request.extensions().get::<RateLimiter>().cloned() {
        let key = limiter.key_for(request.headers(), request.extensions());
        if !limiter.check(&key) {
            tracing::warn!(client_ip = %key, "rate limit exceeded");
            return (
                StatusCode::TOO_MANY_REQUESTS,
                Json(ErrorBody::new("RATE_LIMITED", "rate limit exceeded")),
            )
                .into_response();
        }
    }

    next.run(request).await
}
