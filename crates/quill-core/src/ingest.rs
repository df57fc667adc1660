//! # Ingestion Gate
//!
//! Validate-and-store pipeline for uploaded images.
//!
//! ## Pipeline
//!
//! 1. Require a resolved [`Principal`] — else [`IngestError::Unauthenticated`].
//! 2. Require a file payload — else [`IngestError::MissingInput`].
//! 3. Check MIME type and extension against the image allow-list —
//!    else [`IngestError::UnsupportedMediaType`].
//! 4. Derive `{stamp}-{sanitized}` from the injected [`UploadStamp`].
//! 5. Persist through the [`ArtifactStore`] (directory creation included).
//! 6. Append one [`AuditEntry`]; a sink failure is logged, not returned.
//! 7. Return `/uploads/{stored_name}`.
//!
//! Steps 1–3 touch nothing, so a rejected request leaves no file and no
//! audit entry behind. Store failures are logged with full detail and
//! surface as the generic [`IngestError::StorageFailure`].

use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;

use crate::audit::{AuditEntry, AuditMetadata, AuditSink};
use crate::error::IngestError;
use crate::media::{check_upload, ImageKind};
use crate::naming::{StoredName, UploadStamp, DEFAULT_ORIGINAL_NAME};
use crate::reference::ArtifactReference;
use crate::store::ArtifactStore;

/// An authenticated caller, as resolved by the auth collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    /// Stable subject identifier recorded as the audit actor.
    pub subject: String,
}

impl Principal {
    /// Wrap a subject identifier.
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
        }
    }
}

/// A file payload received from the client.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Raw payload bytes.
    pub bytes: Bytes,
    /// MIME type declared by the client.
    pub content_type: String,
    /// Original filename, if the client supplied one.
    pub file_name: Option<String>,
}

impl UploadedFile {
    /// Original filename, defaulting to `upload.bin`.
    pub fn original_name(&self) -> &str {
        self.file_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_ORIGINAL_NAME)
    }
}

/// Successful ingestion result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ingested {
    /// Public reference to the stored artifact.
    pub reference: ArtifactReference,
    /// Derived stored filename.
    pub stored_name: StoredName,
    /// Accepted image format.
    pub kind: ImageKind,
    /// Number of bytes written.
    pub size: u64,
    /// Whether the audit entry was accepted by the sink.
    pub audited: bool,
}

/// The validate-and-store operation for uploaded media.
#[derive(Clone)]
pub struct IngestionGate {
    store: Arc<dyn ArtifactStore>,
    audit: Arc<dyn AuditSink>,
    stamps: Arc<dyn UploadStamp>,
}

impl std::fmt::Debug for IngestionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestionGate").finish_non_exhaustive()
    }
}

impl IngestionGate {
    /// Assemble a gate from its collaborators.
    pub fn new(
        store: Arc<dyn ArtifactStore>,
        audit: Arc<dyn AuditSink>,
        stamps: Arc<dyn UploadStamp>,
    ) -> Self {
        Self {
            store,
            audit,
            stamps,
        }
    }

    /// Validate, store and audit one upload.
    ///
    /// `client_ip` is recorded verbatim in the audit entry.
    pub async fn ingest(
        &self,
        principal: Option<&Principal>,
        file: Option<UploadedFile>,
        client_ip: &str,
    ) -> Result<Ingested, IngestError> {
        let principal = principal.ok_or(IngestError::Unauthenticated)?;
        let file = file.ok_or(IngestError::MissingInput)?;

        let original_name = file.original_name().to_string();
        let kind = check_upload(&file.content_type, &original_name)?;

        let stored_name = StoredName::derive(self.stamps.next_stamp(), &original_name);
        let size = file.bytes.len() as u64;

        if let Err(e) = self.store.put(&stored_name, &file.bytes).await {
            let err = IngestError::storage(format!("writing {stored_name}: {e}"));
            tracing::error!(
                actor = %principal.subject,
                stored_name = %stored_name,
                error = %err.operator_detail(),
                "upload storage failed"
            );
            return Err(err);
        }

        let entry = AuditEntry::image_upload(
            principal.subject.clone(),
            stored_name.as_str(),
            client_ip,
            AuditMetadata {
                original_name,
                size,
                mime_type: file.content_type.clone(),
            },
        );
        let audited = match self.audit.record(&entry).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    stored_name = %stored_name,
                    error = %e,
                    "audit write failed; artifact kept"
                );
                false
            }
        };

        tracing::info!(
            actor = %principal.subject,
            stored_name = %stored_name,
            size,
            mime_type = kind.mime(),
            "image ingested"
        );

        Ok(Ingested {
            reference: ArtifactReference::for_upload(&stored_name),
            stored_name,
            kind,
            size,
            audited,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditSink;
    use crate::naming::FixedStamps;
    use crate::store::DiskStore;

    fn png(name: Option<&str>) -> UploadedFile {
        UploadedFile {
            bytes: Bytes::from_static(b"\x89PNG\r\n\x1a\nrest"),
            content_type: "image/png".into(),
            file_name: name.map(str::to_string),
        }
    }

    fn gate(root: &std::path::Path, audit: MemoryAuditSink) -> IngestionGate {
        IngestionGate::new(
            Arc::new(DiskStore::new(root)),
            Arc::new(audit),
            Arc::new(FixedStamps::starting_at(1_700_000_000_000)),
        )
    }

    #[tokio::test]
    async fn stores_and_audits() {
        let dir = tempfile::tempdir().unwrap();
        let audit = MemoryAuditSink::new();
        let gate = gate(dir.path(), audit.clone());

        let out = gate
            .ingest(Some(&Principal::new("admin")), Some(png(Some("my photo!.png"))), "10.0.0.1")
            .await
            .unwrap();

        assert_eq!(out.reference.as_str(), "/uploads/1700000000000-my_photo_.png");
        assert!(out.audited);
        assert!(dir.path().join("uploads/1700000000000-my_photo_.png").is_file());

        let entries = audit.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].actor, "admin");
        assert_eq!(entries[0].entity_id, "1700000000000-my_photo_.png");
        assert_eq!(entries[0].ip, "10.0.0.1");
        assert_eq!(entries[0].metadata.original_name, "my photo!.png");
        assert_eq!(entries[0].metadata.size, out.size);
        assert_eq!(entries[0].metadata.mime_type, "image/png");
    }

    #[tokio::test]
    async fn missing_principal_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let audit = MemoryAuditSink::new();
        let gate = gate(dir.path(), audit.clone());

        let err = gate.ingest(None, Some(png(Some("a.png"))), "ip").await.unwrap_err();
        assert_eq!(err, IngestError::Unauthenticated);
        assert!(!dir.path().join("uploads").exists());
        assert!(audit.is_empty());
    }

    #[tokio::test]
    async fn missing_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let gate = gate(dir.path(), MemoryAuditSink::new());
        let err = gate
            .ingest(Some(&Principal::new("admin")), None, "ip")
            .await
            .unwrap_err();
        assert_eq!(err, IngestError::MissingInput);
    }

    #[tokio::test]
    async fn unsupported_type_rejected_without_write() {
        let dir = tempfile::tempdir().unwrap();
        let audit = MemoryAuditSink::new();
        let gate = gate(dir.path(), audit.clone());
        let file = UploadedFile {
            bytes: Bytes::from_static(b"%PDF-1.7"),
            content_type: "application/pdf".into(),
            file_name: Some("doc.png".into()),
        };

        let err = gate
            .ingest(Some(&Principal::new("admin")), Some(file), "ip")
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedMediaType { .. }));
        assert!(!dir.path().join("uploads").exists());
        assert!(audit.is_empty());
    }

    #[tokio::test]
    async fn nameless_upload_falls_back_to_bin_and_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let gate = gate(dir.path(), MemoryAuditSink::new());
        let err = gate
            .ingest(Some(&Principal::new("admin")), Some(png(None)), "ip")
            .await
            .unwrap_err();
        match err {
            IngestError::UnsupportedMediaType { extension, .. } => {
                assert_eq!(extension.as_deref(), Some(".bin"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn audit_failure_keeps_artifact_and_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let gate = gate(dir.path(), MemoryAuditSink::failing("sink offline"));
        let out = gate
            .ingest(Some(&Principal::new("admin")), Some(png(Some("a.png"))), "ip")
            .await
            .unwrap();
        assert!(!out.audited);
        assert!(dir.path().join("uploads").join(out.stored_name.as_str()).is_file());
    }

    #[tokio::test]
    async fn storage_failure_is_generic() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("public");
        std::fs::write(&blocker, b"file, not dir").unwrap();
        let audit = MemoryAuditSink::new();
        let gate = gate(&blocker, audit.clone());

        let err = gate
            .ingest(Some(&Principal::new("admin")), Some(png(Some("a.png"))), "ip")
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::StorageFailure { .. }));
        assert_eq!(err.to_string(), "Unable to upload image");
        assert!(audit.is_empty());
    }

    #[tokio::test]
    async fn same_name_uploads_get_distinct_references() {
        let dir = tempfile::tempdir().unwrap();
        let gate = gate(dir.path(), MemoryAuditSink::new());
        let admin = Principal::new("admin");
        let a = gate.ingest(Some(&admin), Some(png(Some("a.png"))), "ip").await.unwrap();
        let b = gate.ingest(Some(&admin), Some(png(Some("a.png"))), "ip").await.unwrap();
        assert_ne!(a.reference, b.reference);
    }
}
