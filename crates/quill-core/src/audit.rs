//! # Upload Audit Trail
//!
//! The gate emits exactly one [`AuditEntry`] per stored artifact through an
//! [`AuditSink`]. Sinks are fire-and-forget from the gate's perspective:
//! a failing sink is logged and never undoes the stored artifact.
//!
//! ## Sinks
//!
//! - [`TracingAuditSink`] — emits a structured `tracing` event.
//! - [`JsonlAuditSink`] — appends to a JSON Lines file. Each line carries
//!   `previous_hash` and `event_hash` (SHA-256 chain), so tampering with or
//!   dropping a line is detectable by [`verify_jsonl_chain`].
//! - [`MemoryAuditSink`] — in-process buffer for tests.

use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;

use crate::error::AuditError;

/// Action recorded for image uploads.
pub const UPLOAD_ACTION: &str = "upload.image";

/// Entity kind recorded for image uploads.
pub const UPLOAD_ENTITY: &str = "Upload";

/// Hash that starts a fresh chain.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Details about the uploaded payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditMetadata {
    /// Filename as sent by the client.
    pub original_name: String,
    /// Payload size in bytes.
    pub size: u64,
    /// Declared MIME type.
    pub mime_type: String,
}

/// One immutable audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// What happened, e.g. `upload.image`.
    pub action: String,
    /// Subject of the principal that acted.
    pub actor: String,
    /// Kind of entity affected, e.g. `Upload`.
    pub entity: String,
    /// Identifier of the affected entity (the stored filename).
    pub entity_id: String,
    /// Client IP as reported by the request-info collaborator.
    pub ip: String,
    /// Payload details.
    pub metadata: AuditMetadata,
    /// When the entry was produced.
    pub recorded_at: DateTime<Utc>,
}

impl AuditEntry {
    /// Build the entry for a stored image upload.
    pub fn image_upload(
        actor: impl Into<String>,
        stored_name: impl Into<String>,
        ip: impl Into<String>,
        metadata: AuditMetadata,
    ) -> Self {
        Self {
            action: UPLOAD_ACTION.to_string(),
            actor: actor.into(),
            entity: UPLOAD_ENTITY.to_string(),
            entity_id: stored_name.into(),
            ip: ip.into(),
            metadata,
            recorded_at: Utc::now(),
        }
    }

    /// SHA-256 over the previous hash and every field of this entry.
    ///
    /// The input is canonical JSON with a fixed field order. The timestamp
    /// is rendered at microsecond precision so rows read back from Postgres
    /// hash identically.
    pub fn chain_hash(&self, previous_hash: &str) -> Result<String, serde_json::Error> {
        let input = ChainInput {
            previous_hash,
            action: &self.action,
            actor: &self.actor,
            entity: &self.entity,
            entity_id: &self.entity_id,
            ip: &self.ip,
            original_name: &self.metadata.original_name,
            size: self.metadata.size,
            mime_type: &self.metadata.mime_type,
            recorded_at: self.recorded_at.to_rfc3339_opts(SecondsFormat::Micros, true),
        };
        Ok(sha256_hex(&serde_json::to_string(&input)?))
    }
}

#[derive(Serialize)]
struct ChainInput<'a> {
    previous_hash: &'a str,
    action: &'a str,
    actor: &'a str,
    entity: &'a str,
    entity_id: &'a str,
    ip: &'a str,
    original_name: &'a str,
    size: u64,
    mime_type: &'a str,
    recorded_at: String,
}

/// Destination for audit entries.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Append one entry.
    async fn record(&self, entry: &AuditEntry) -> Result<(), AuditError>;
}

/// Audit sink that writes entries to the operator log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        tracing::info!(
            target: "quill::audit",
            action = %entry.action,
            actor = %entry.actor,
            entity = %entry.entity,
            entity_id = %entry.entity_id,
            ip = %entry.ip,
            original_name = %entry.metadata.original_name,
            size = entry.metadata.size,
            mime_type = %entry.metadata.mime_type,
            "audit"
        );
        Ok(())
    }
}

/// In-memory audit sink. Cloning shares the buffer.
#[derive(Debug, Clone, Default)]
pub struct MemoryAuditSink {
    entries: Arc<Mutex<Vec<AuditEntry>>>,
    fail_with: Arc<Mutex<Option<String>>>,
}

impl MemoryAuditSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every `record` call fails with the given message.
    pub fn failing(message: impl Into<String>) -> Self {
        let sink = Self::default();
        *sink.fail_with.lock() = Some(message.into());
        sink
    }

    /// Snapshot of recorded entries.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().clone()
    }

    /// Number of recorded entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        if let Some(msg) = self.fail_with.lock().clone() {
            return Err(AuditError::Unavailable(msg));
        }
        self.entries.lock().push(entry.clone());
        Ok(())
    }
}

/// One line of a JSONL audit file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainedAuditLine {
    /// The audit entry.
    #[serde(flatten)]
    pub entry: AuditEntry,
    /// `event_hash` of the preceding line, or [`GENESIS_HASH`].
    pub previous_hash: String,
    /// [`AuditEntry::chain_hash`] over `previous_hash`.
    pub event_hash: String,
}

/// Append-only JSON Lines audit file with a SHA-256 hash chain.
///
/// A torn final line (crash or full disk mid-append) does not stop the
/// sink: the chain resumes from the last intact entry and the fragment is
/// newline-terminated so it stays visible to [`verify_jsonl_chain`].
#[derive(Debug)]
pub struct JsonlAuditSink {
    path: PathBuf,
    // Held across the append so concurrent uploads chain in order.
    // `None` means the tail must be re-read from disk.
    last_hash: tokio::sync::Mutex<Option<String>>,
}

/// State of an existing audit file's tail.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ChainTail {
    last_hash: String,
    // The file ends mid-line.
    unterminated: bool,
}

impl JsonlAuditSink {
    /// Append to the file at `path`, creating it (and parents) on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_hash: tokio::sync::Mutex::new(None),
        }
    }

    /// Path of the audit file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load_tail(&self) -> Result<ChainTail, AuditError> {
        let contents = match tokio::fs::read(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ChainTail {
                    last_hash: GENESIS_HASH.to_string(),
                    unterminated: false,
                })
            }
            Err(e) => return Err(e.into()),
        };
        let unterminated = contents.last().is_some_and(|b| *b != b'\n');

        let mut skipped = 0usize;
        let mut last_hash = GENESIS_HASH.to_string();
        for line in contents.split(|b| *b == b'\n').rev() {
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            match serde_json::from_slice::<ChainedAuditLine>(line) {
                Ok(parsed) => {
                    last_hash = parsed.event_hash;
                    break;
                }
                Err(_) => skipped += 1,
            }
        }

        if skipped > 0 {
            tracing::error!(
                path = %self.path.display(),
                unreadable_lines = skipped,
                "audit log tail is damaged; resuming chain from last intact entry"
            );
        }
        Ok(ChainTail {
            last_hash,
            unterminated,
        })
    }

    async fn append(&self, encoded: &[u8]) -> Result<(), AuditError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(encoded).await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl AuditSink for JsonlAuditSink {
    async fn record(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        let mut last = self.last_hash.lock().await;
        let tail = match last.as_ref() {
            Some(h) => ChainTail {
                last_hash: h.clone(),
                unterminated: false,
            },
            None => self.load_tail().await?,
        };

        let line = ChainedAuditLine {
            entry: entry.clone(),
            event_hash: entry.chain_hash(&tail.last_hash)?,
            previous_hash: tail.last_hash,
        };
        let mut encoded = Vec::new();
        if tail.unterminated {
            encoded.push(b'\n');
        }
        serde_json::to_writer(&mut encoded, &line)?;
        encoded.push(b'\n');

        if let Err(e) = self.append(&encoded).await {
            // The write may have landed partially; re-read the tail next time.
            *last = None;
            return Err(e);
        }
        *last = Some(line.event_hash);
        Ok(())
    }
}

/// Result of walking a JSONL audit chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainIntegrity {
    /// Number of entries read.
    pub total_events: usize,
    /// 1-based line numbers that are unreadable or whose links or hashes
    /// do not match.
    pub broken_lines: Vec<usize>,
}

impl ChainIntegrity {
    /// Whether every link and hash checked out.
    pub fn is_valid(&self) -> bool {
        self.broken_lines.is_empty()
    }
}

/// Recompute every hash in a JSONL audit file and check the links.
///
/// Unparseable lines are reported as broken and skipped; the next entry is
/// checked against the last readable one.
pub fn verify_jsonl_chain(path: &Path) -> Result<ChainIntegrity, AuditError> {
    let file = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);

    let mut expected_prev = GENESIS_HASH.to_string();
    let mut total_events = 0;
    let mut broken_lines = Vec::new();

    for (idx, line) in reader.split(b'\n').enumerate() {
        let line = line?;
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        total_events += 1;
        let Ok(parsed) = serde_json::from_slice::<ChainedAuditLine>(&line) else {
            broken_lines.push(idx + 1);
            continue;
        };
        let hash_ok = parsed
            .entry
            .chain_hash(&parsed.previous_hash)
            .is_ok_and(|h| h == parsed.event_hash);
        if parsed.previous_hash != expected_prev || !hash_ok {
            broken_lines.push(idx + 1);
        }
        expected_prev = parsed.event_hash;
    }

    Ok(ChainIntegrity {
        total_events,
        broken_lines,
    })
}

/// Compute SHA-256 hex digest of input string.
pub(crate) fn sha256_hex(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str) -> AuditEntry {
        AuditEntry::image_upload(
            "admin",
            name,
            "203.0.113.9",
            AuditMetadata {
                original_name: "cover.png".into(),
                size: 1024,
                mime_type: "image/png".into(),
            },
        )
    }

    #[test]
    fn image_upload_entry_fields() {
        let e = entry("1-cover.png");
        assert_eq!(e.action, "upload.image");
        assert_eq!(e.entity, "Upload");
        assert_eq!(e.entity_id, "1-cover.png");
    }

    #[test]
    fn chain_hash_depends_on_previous() {
        let e = entry("1-cover.png");
        let genesis = e.chain_hash(GENESIS_HASH).unwrap();
        assert_ne!(genesis, e.chain_hash("ff").unwrap());
        assert_eq!(genesis.len(), 64);
    }

    #[test]
    fn chain_hash_covers_every_field() {
        let base = entry("1-cover.png");
        let original = base.chain_hash(GENESIS_HASH).unwrap();
        let edits: [fn(&mut AuditEntry); 9] = [
            |e| e.action = "upload.other".into(),
            |e| e.actor = "mallory".into(),
            |e| e.entity = "Other".into(),
            |e| e.entity_id = "2-cover.png".into(),
            |e| e.ip = "10.6.6.6".into(),
            |e| e.metadata.original_name = "evil.exe".into(),
            |e| e.metadata.size += 1,
            |e| e.metadata.mime_type = "image/gif".into(),
            |e| e.recorded_at += chrono::Duration::seconds(1),
        ];
        for (i, edit) in edits.iter().enumerate() {
            let mut changed = base.clone();
            edit(&mut changed);
            assert_ne!(changed.chain_hash(GENESIS_HASH).unwrap(), original, "edit #{i}");
        }
    }

    #[test]
    fn chain_hash_ignores_sub_microsecond_precision() {
        let mut e = entry("1-cover.png");
        e.recorded_at = "2024-01-05T10:00:00.123456789Z".parse().unwrap();
        let mut stored = e.clone();
        stored.recorded_at = "2024-01-05T10:00:00.123456Z".parse().unwrap();
        assert_eq!(
            e.chain_hash(GENESIS_HASH).unwrap(),
            stored.chain_hash(GENESIS_HASH).unwrap()
        );
    }

    #[tokio::test]
    async fn memory_sink_records() {
        let sink = MemoryAuditSink::new();
        sink.record(&entry("1-a.png")).await.unwrap();
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.entries()[0].entity_id, "1-a.png");
    }

    #[tokio::test]
    async fn failing_memory_sink_errors() {
        let sink = MemoryAuditSink::failing("db down");
        let err = sink.record(&entry("1-a.png")).await.unwrap_err();
        assert!(err.to_string().contains("db down"));
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn jsonl_chain_verifies() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("audit.jsonl");
        let sink = JsonlAuditSink::new(&path);
        for i in 0..3 {
            sink.record(&entry(&format!("{i}-a.png"))).await.unwrap();
        }

        let report = verify_jsonl_chain(&path).unwrap();
        assert_eq!(report.total_events, 3);
        assert!(report.is_valid());
    }

    #[tokio::test]
    async fn jsonl_chain_resumes_after_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        JsonlAuditSink::new(&path).record(&entry("1-a.png")).await.unwrap();
        JsonlAuditSink::new(&path).record(&entry("2-a.png")).await.unwrap();

        let report = verify_jsonl_chain(&path).unwrap();
        assert_eq!(report.total_events, 2);
        assert!(report.is_valid());
    }

    #[tokio::test]
    async fn tampered_line_detected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let sink = JsonlAuditSink::new(&path);
        sink.record(&entry("1-a.png")).await.unwrap();
        sink.record(&entry("2-a.png")).await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, contents.replacen("1-a.png", "1-b.png", 1)).unwrap();

        let report = verify_jsonl_chain(&path).unwrap();
        assert_eq!(report.broken_lines, vec![1]);
    }

    #[tokio::test]
    async fn tampered_ip_mime_and_name_detected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let sink = JsonlAuditSink::new(&path);
        sink.record(&entry("1-a.png")).await.unwrap();
        sink.record(&entry("2-a.png")).await.unwrap();
        let pristine = std::fs::read_to_string(&path).unwrap();

        for (from, to) in [
            ("203.0.113.9", "10.6.6.6"),
            ("image/png", "image/gif"),
            ("cover.png", "evil.exe"),
        ] {
            std::fs::write(&path, pristine.replacen(from, to, 1)).unwrap();
            let report = verify_jsonl_chain(&path).unwrap();
            assert_eq!(report.broken_lines, vec![1], "{from} -> {to}");
        }
    }

    #[tokio::test]
    async fn torn_tail_is_reported_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        JsonlAuditSink::new(&path).record(&entry("1-a.png")).await.unwrap();
        let mut contents = std::fs::read(&path).unwrap();
        contents.extend_from_slice(br#"{"action":"upload.im"#);
        std::fs::write(&path, contents).unwrap();

        let report = verify_jsonl_chain(&path).unwrap();
        assert_eq!(report.total_events, 2);
        assert_eq!(report.broken_lines, vec![2]);
    }

    #[tokio::test]
    async fn sink_resumes_after_torn_tail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        JsonlAuditSink::new(&path).record(&entry("1-a.png")).await.unwrap();
        let mut contents = std::fs::read(&path).unwrap();
        contents.extend_from_slice(br#"{"action":"upload.im"#);
        std::fs::write(&path, contents).unwrap();

        let sink = JsonlAuditSink::new(&path);
        sink.record(&entry("2-a.png")).await.unwrap();
        sink.record(&entry("3-a.png")).await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], r#"{"action":"upload.im"#);

        let report = verify_jsonl_chain(&path).unwrap();
        assert_eq!(report.total_events, 4);
        assert_eq!(report.broken_lines, vec![2]);
    }
}
