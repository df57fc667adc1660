//! # Database Persistence Layer
//!
//! Optional Postgres backing for the audit trail via SQLx. When
//! `DATABASE_URL` is set, upload audit entries are appended to the
//! `audit_events` hash chain. When absent, the server falls back to a
//! JSONL file or the operator log.

pub mod audit;

use sqlx::postgres::{PgPool, PgPoolOptions};

/// Initialize the database connection pool and run migrations.
///
/// Returns `None` if `DATABASE_URL` is not set.
/// Returns `Err` if the URL is set but the connection or migration fails.
pub async fn init_pool() -> Result<Option<PgPool>, sqlx::Error> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) if !url.trim().is_empty() => url,
        _ => {
            tracing::info!("DATABASE_URL not set, audit entries will not be stored in Postgres");
            return Ok(None);
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(Some(pool))
}
