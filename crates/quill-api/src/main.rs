//! # quill-api — Binary Entry Point
//!
//! Starts the Axum HTTP server. Configuration comes from the environment;
//! see [`quill_api::state::AppConfig`].

use std::net::SocketAddr;
use std::sync::Arc;

use quill_api::db::audit::PgAuditSink;
use quill_api::state::{AppConfig, AppState};
use quill_core::{
    AuditSink, DiskStore, IngestionGate, JsonlAuditSink, MonotonicMillis, TracingAuditSink,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    init_tracing(config.json_logs);

    if config.auth_token.is_none() {
        tracing::warn!("AUTH_TOKEN not set, authentication is disabled");
    }
    tracing::info!(?config, "configuration loaded");

    let db_pool = quill_api::db::init_pool().await.map_err(|e| {
        tracing::error!("Database initialization failed: {e}");
        e
    })?;

    let audit: Arc<dyn AuditSink> = match (db_pool, &config.audit_log) {
        (Some(pool), _) => {
            tracing::info!("audit sink: postgres");
            Arc::new(PgAuditSink::new(pool))
        }
        (None, Some(path)) => {
            tracing::info!(path = %path.display(), "audit sink: jsonl");
            Arc::new(JsonlAuditSink::new(path))
        }
        (None, None) => {
            tracing::info!("audit sink: operator log");
            Arc::new(TracingAuditSink)
        }
    };

    let store = DiskStore::new(&config.public_dir);
    if let Err(e) = store.ensure_dir().await {
        tracing::warn!(
            dir = %store.uploads_dir().display(),
            error = %e,
            "upload directory not creatable yet; uploads will fail until it is"
        );
    }

    let gate = IngestionGate::new(Arc::new(store), audit, Arc::new(MonotonicMillis::new()));
    let port = config.port;
    let state = AppState::new(config, gate);
    let app = quill_api::app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Quill API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
