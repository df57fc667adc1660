//! # quill-api — Axum API Service for Quill
//!
//! HTTP surface over the two `quill-core` components: the Ingestion Gate
//! (image uploads) and the Presentation Resolver (preview cards).
//!
//! ## API Surface
//!
//! | Route                     | Module                | Auth     |
//! |---------------------------|-----------------------|----------|
//! | `POST /upload`            | [`routes::uploads`]   | admin    |
//! | `POST /v1/cards/resolve`  | [`routes::cards`]     | any role |
//! | `GET /openapi.json`       | [`openapi`]           | any role |
//! | `GET /uploads/*`          | [`routes::assets`]    | none     |
//! | `GET /placeholder.svg`    | [`routes::assets`]    | none     |
//! | `GET /health/*`, `/metrics` | [`routes::health`]  | none     |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → Metrics → [RateLimit → Auth → BodyLimit → Handler]
//! ```
//!
//! The bracketed part applies to authenticated routes only. Rate limiting
//! runs before auth so failed bearer attempts count against the budget.

pub mod auth;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn;
use axum::Router;

use crate::auth::AuthConfig;
use crate::middleware::rate_limit::{RateLimitConfig, RateLimiter};
use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };
    let limiter = RateLimiter::new(RateLimitConfig {
        trust_proxy_headers: state.config.trust_proxy_headers,
        ..RateLimitConfig::per_minute(state.config.rate_limit_per_minute)
    });

    // Authenticated API routes.
    let api = Router::new()
        .merge(routes::uploads::router())
        .merge(routes::cards::router())
        .merge(openapi::router())
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .layer(from_fn(auth::auth_middleware))
        .layer(from_fn(middleware::rate_limit::rate_limit_middleware))
        .layer(axum::Extension(auth_config))
        .layer(axum::Extension(limiter));

    // Unauthenticated probes and public assets.
    let public = Router::new()
        .merge(routes::health::router())
        .merge(routes::assets::router(state.public_dir()));

    Router::new()
        .merge(public)
        .merge(api)
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(middleware::tracing_layer::layer())
        .layer(axum::Extension(state.metrics.clone()))
        .with_state(state)
}
