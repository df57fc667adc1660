//! # Error Hierarchy
//!
//! Structured errors for the Quill core, built with `thiserror`.
//!
//! [`IngestError`] is the complete failure taxonomy of the Ingestion Gate.
//! Its `Display` strings are the stable, user-safe messages; the operator
//! detail carried by [`IngestError::StorageFailure`] is only reachable
//! through [`IngestError::operator_detail`].

use thiserror::Error;

/// Failure outcomes of [`crate::IngestionGate::ingest`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IngestError {
    /// No resolved principal was supplied by the caller.
    #[error("Unauthorized")]
    Unauthenticated,

    /// The request carried no file payload.
    #[error("Image file is required")]
    MissingInput,

    /// Declared MIME type or filename extension is outside the allow-list.
    #[error("Only JPEG, PNG, or WebP images are allowed")]
    UnsupportedMediaType {
        /// The MIME type the client declared.
        declared_type: String,
        /// The lowercase extension of the original filename, if any.
        extension: Option<String>,
    },

    /// Anything unexpected while persisting (disk full, permission denied).
    #[error("Unable to upload image")]
    StorageFailure {
        /// Full failure detail for the operator log.
        detail: String,
    },
}

impl IngestError {
    /// Build a storage failure from any displayable cause.
    pub fn storage(cause: impl std::fmt::Display) -> Self {
        Self::StorageFailure {
            detail: cause.to_string(),
        }
    }

    /// Whether the failure was caused by the client's request.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::StorageFailure { .. })
    }

    /// Diagnostic detail intended for logs, never for response bodies.
    pub fn operator_detail(&self) -> String {
        match self {
            Self::StorageFailure { detail } => detail.clone(),
            Self::UnsupportedMediaType {
                declared_type,
                extension,
            } => format!(
                "declared type {declared_type:?}, extension {:?}",
                extension.as_deref().unwrap_or("")
            ),
            other => other.to_string(),
        }
    }
}

/// Failures of an audit sink. Never propagated past the gate.
#[derive(Error, Debug)]
pub enum AuditError {
    /// The sink could not be written.
    #[error("audit I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The entry could not be serialized.
    #[error("audit serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// The backing service rejected or could not accept the entry.
    #[error("audit sink unavailable: {0}")]
    Unavailable(String),
}
