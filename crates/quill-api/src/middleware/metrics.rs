//! # Request & Upload Metrics
//!
//! In-process atomic counters, served as JSON at `GET /metrics`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Shared metrics state. Cloning shares the counters.
#[derive(Debug, Clone, Default)]
pub struct ApiMetrics {
    inner: Arc<Counters>,
}

#[derive(Debug, Default)]
struct Counters {
    requests: AtomicU64,
    errors: AtomicU64,
    uploads_accepted: AtomicU64,
    uploads_rejected: AtomicU64,
    bytes_stored: AtomicU64,
}

/// Point-in-time copy of every counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MetricsSnapshot {
    pub requests: u64,
    /// Responses with a 4xx or 5xx status.
    pub errors: u64,
    pub uploads_accepted: u64,
    pub uploads_rejected: u64,
    pub bytes_stored: u64,
}

impl ApiMetrics {
    /// Create a new metrics instance with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a stored upload of `size` bytes.
    pub fn record_upload(&self, size: u64) {
        self.inner.uploads_accepted.fetch_add(1, Ordering::Relaxed);
        self.inner.bytes_stored.fetch_add(size, Ordering::Relaxed);
    }

    /// Count an upload the gate refused.
    pub fn record_rejection(&self) {
        self.inner.uploads_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Current counter values.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let c = &self.inner;
        MetricsSnapshot {
            requests: c.requests.load(Ordering::Relaxed),
            errors: c.errors.load(Ordering::Relaxed),
            uploads_accepted: c.uploads_accepted.load(Ordering::Relaxed),
            uploads_rejected: c.uploads_rejected.load(Ordering::Relaxed),
            bytes_stored: c.bytes_stored.load(Ordering::Relaxed),
        }
    }
}

/// Middleware that increments request and error counters.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();

    let response = next.run(request).await;

    if let Some(m) = metrics {
        m.inner.requests.fetch_add(1, Ordering::Relaxed);
        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            m.inner.errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    response
}
