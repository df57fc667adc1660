#![deny(missing_docs)]

//! # quill-core — Domain Core for the Quill Blog Backend
//!
//! Two loosely coupled components live here. They share nothing but the
//! artifact-reference convention and the public storage directory:
//!
//! - **Ingestion Gate** ([`ingest::IngestionGate`]) — validates an uploaded
//!   image, stores it under a stamped, filesystem-safe name, appends one
//!   audit entry, and returns a public `/uploads/...` reference.
//! - **Presentation Resolver** ([`present::PresentationResolver`]) — turns a
//!   blog [`ContentRecord`] into a [`RenderDecision`] for a preview card,
//!   falling back to a placeholder when the cover artifact is missing.
//!
//! ## Design Principles
//!
//! 1. **Collaborators are injected.** Storage, audit, stamp generation and
//!    asset existence checks are traits. No global mutable state.
//!
//! 2. **The gate has a closed error taxonomy.** [`IngestError`] has exactly
//!    four variants; internal detail rides along for operators but is
//!    never rendered to callers.
//!
//! 3. **The resolver is total.** Every input, including malformed or
//!    partially-populated records, resolves to a safe default.

pub mod audit;
pub mod content;
pub mod error;
pub mod excerpt;
pub mod ingest;
pub mod media;
pub mod naming;
pub mod present;
pub mod reference;
pub mod store;

// Re-export primary types at crate root for ergonomic imports.
pub use audit::{AuditEntry, AuditMetadata, AuditSink, JsonlAuditSink, MemoryAuditSink, TracingAuditSink};
pub use content::ContentRecord;
pub use error::{AuditError, IngestError};
pub use ingest::{Ingested, IngestionGate, Principal, UploadedFile};
pub use media::ImageKind;
pub use naming::{sanitize_file_name, FixedStamps, MonotonicMillis, StoredName, UploadStamp};
pub use present::{AssetProbe, PresentationResolver, PublicDirProbe, RenderDecision};
pub use reference::{ArtifactReference, ReferenceKind, PLACEHOLDER_REFERENCE, UPLOADS_PREFIX};
pub use store::{ArtifactStore, DiskStore};
