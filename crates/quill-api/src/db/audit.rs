//! Audit event persistence — immutable hash chain.
//!
//! Each upload appends one row whose `event_hash` is
//! [`AuditEntry::chain_hash`] over the previous row's hash. Appends take a
//! transaction-scoped advisory lock so concurrent writers cannot fork the
//! chain.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quill_core::audit::GENESIS_HASH;
use quill_core::{AuditEntry, AuditError, AuditMetadata, AuditSink};
use sqlx::PgPool;
use uuid::Uuid;

/// Advisory lock key serializing chain appends.
const CHAIN_LOCK_KEY: i64 = 0x5155_494c_4c41_5544; // "QUILLAUD"

/// Audit sink appending to the `audit_events` table.
#[derive(Debug, Clone)]
pub struct PgAuditSink {
    pool: PgPool,
}

impl PgAuditSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append an entry and return the new row id.
    pub async fn append(&self, entry: &AuditEntry) -> Result<Uuid, sqlx::Error> {
        let id = Uuid::new_v4();
        let metadata = serde_json::to_value(&entry.metadata)
            .map_err(|e| sqlx::Error::Protocol(format!("audit metadata: {e}")))?;

        let mut tx = self.pool.begin().await?;
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(CHAIN_LOCK_KEY)
            .execute(&mut *tx)
            .await?;

        let previous_hash: Option<String> =
            sqlx::query_scalar("SELECT event_hash FROM audit_events ORDER BY seq DESC LIMIT 1")
                .fetch_optional(&mut *tx)
                .await?;
        let prev = previous_hash.as_deref().unwrap_or(GENESIS_HASH);
        let event_hash = entry
            .chain_hash(prev)
            .map_err(|e| sqlx::Error::Protocol(format!("audit hash input: {e}")))?;

        sqlx::query(
            "INSERT INTO audit_events (id, action, actor, entity, entity_id, ip,
             metadata, previous_hash, event_hash, recorded_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(id)
        .bind(&entry.action)
        .bind(&entry.actor)
        .bind(&entry.entity)
        .bind(&entry.entity_id)
        .bind(&entry.ip)
        .bind(&metadata)
        .bind(prev)
        .bind(&event_hash)
        .bind(entry.recorded_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(id)
    }

    /// Audit rows for one stored upload, oldest first.
    pub async fn events_for_entity(
        &self,
        entity: &str,
        entity_id: &str,
    ) -> Result<Vec<AuditEventRow>, sqlx::Error> {
        sqlx::query_as::<_, AuditEventRow>(
            "SELECT id, action, actor, entity, entity_id, ip, metadata,
             previous_hash, event_hash, recorded_at
             FROM audit_events WHERE entity = $1 AND entity_id = $2 ORDER BY seq ASC",
        )
        .bind(entity)
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Verify linkage and hashes of the first `limit` rows.
    pub async fn verify_chain_integrity(&self, limit: i64) -> Result<ChainIntegrityResult, sqlx::Error> {
        let rows = sqlx::query_as::<_, AuditEventRow>(
            "SELECT id, action, actor, entity, entity_id, ip, metadata,
             previous_hash, event_hash, recorded_at
             FROM audit_events ORDER BY seq ASC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(check_rows(&rows))
    }
}

#[async_trait]
impl AuditSink for PgAuditSink {
    async fn record(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        self.append(entry)
            .await
            .map(|_| ())
            .map_err(|e| AuditError::Unavailable(format!("postgres audit append: {e}")))
    }
}

/// Result of chain integrity verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainIntegrityResult {
    pub total_events: usize,
    /// Ids of rows whose link or hash does not check out.
    pub broken: Vec<Uuid>,
}

impl ChainIntegrityResult {
    pub fn chain_valid(&self) -> bool {
        self.broken.is_empty()
    }
}

/// Database row for audit events.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AuditEventRow {
    pub id: Uuid,
    pub action: String,
    pub actor: String,
    pub entity: String,
    pub entity_id: String,
    pub ip: String,
    pub metadata: serde_json::Value,
    pub previous_hash: String,
    pub event_hash: String,
    pub recorded_at: DateTime<Utc>,
}

impl AuditEventRow {
    /// Rebuild the entry this row was written from.
    pub fn to_entry(&self) -> Result<AuditEntry, serde_json::Error> {
        let metadata: AuditMetadata = serde_json::from_value(self.metadata.clone())?;
        Ok(AuditEntry {
            action: self.action.clone(),
            actor: self.actor.clone(),
            entity: self.entity.clone(),
            entity_id: self.entity_id.clone(),
            ip: self.ip.clone(),
            metadata,
            recorded_at: self.recorded_at,
        })
    }
}

/// Walk rows in chain order, recomputing each hash.
fn check_rows(rows: &[AuditEventRow]) -> ChainIntegrityResult {
    let mut broken = Vec::new();
    let mut expected_prev = GENESIS_HASH.to_string();

    for row in rows {
        let hash_ok = row
            .to_entry()
            .ok()
            .and_then(|entry| entry.chain_hash(&row.previous_hash).ok())
            .is_some_and(|hash| hash == row.event_hash);
        if row.previous_hash != expected_prev || !hash_ok {
            broken.push(row.id);
        }
        expected_prev = row.event_hash.clone();
    }

    ChainIntegrityResult {
        total_events: rows.len(),
        broken,
    }
}
