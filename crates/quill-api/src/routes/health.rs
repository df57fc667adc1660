//! Health probes and the metrics snapshot. Mounted outside the auth
//! middleware.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use quill_core::DiskStore;

use crate::error::AppError;
use crate::middleware::metrics::MetricsSnapshot;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .route("/metrics", get(metrics))
}

/// Liveness probe — always returns 200 if the process is running.
#[utoipa::path(get, path = "/health/liveness", tag = "health", responses((status = 200, body = String)))]
pub async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe — 200 once the upload directory exists or can be created.
#[utoipa::path(
    get,
    path = "/health/readiness",
    tag = "health",
    responses(
        (status = 200, body = String),
        (status = 503, description = "Upload directory unavailable", body = crate::error::ErrorBody),
    )
)]
pub async fn readiness(State(state): State<AppState>) -> Result<&'static str, AppError> {
    let store = DiskStore::new(state.public_dir());
    store.ensure_dir().await.map_err(|e| {
        tracing::warn!(dir = %store.uploads_dir().display(), error = %e, "readiness check failed");
        AppError::ServiceUnavailable("upload directory unavailable".into())
    })?;
    Ok("ready")
}

/// GET /metrics — Request and upload counters.
#[utoipa::path(get, path = "/metrics", tag = "health", responses((status = 200, body = MetricsSnapshot)))]
pub async fn metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}
