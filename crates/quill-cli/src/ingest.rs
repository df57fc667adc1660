//! # Ingest Subcommand
//!
//! Runs a local file through the Ingestion Gate, exactly as an HTTP upload
//! would: same allow-list, same stored-name derivation, same audit entry.
//! The declared MIME type defaults to the one implied by the extension.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use bytes::Bytes;
use clap::Args;

use quill_core::{
    AuditSink, DiskStore, IngestError, IngestionGate, JsonlAuditSink, MonotonicMillis, Principal,
    TracingAuditSink, UploadedFile,
};

/// Actor recorded when `--actor` is not given.
pub const DEFAULT_ACTOR: &str = "cli";

/// Client address recorded for local ingestion.
pub const LOCAL_CLIENT: &str = "local";

/// Arguments for the `quill ingest` subcommand.
#[derive(Args, Debug)]
pub struct IngestArgs {
    /// Image to ingest.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Public root; the image lands in `{public_dir}/uploads`.
    #[arg(long, default_value = "public")]
    pub public_dir: PathBuf,

    /// Declared MIME type. Guessed from the extension when omitted.
    #[arg(long, value_name = "TYPE")]
    pub mime: Option<String>,

    /// Original filename to record. Defaults to the file's own name.
    #[arg(long)]
    pub name: Option<String>,

    /// Audit actor.
    #[arg(long, default_value = DEFAULT_ACTOR)]
    pub actor: String,

    /// Append the audit entry to this JSONL file instead of the log.
    #[arg(long, value_name = "PATH")]
    pub audit_log: Option<PathBuf>,
}

/// MIME type implied by a filename extension, if it is an allowed image.
pub fn guess_mime(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Execute the ingest subcommand.
pub fn run_ingest(args: &IngestArgs) -> Result<u8> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(ingest(args))
}

async fn ingest(args: &IngestArgs) -> Result<u8> {
    let bytes = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("failed to read file: {}", args.file.display()))?;

    let file_name = args.name.clone().or_else(|| {
        args.file
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
    });
    let content_type = args
        .mime
        .clone()
        .or_else(|| guess_mime(&args.file).map(str::to_string))
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let audit: Arc<dyn AuditSink> = match &args.audit_log {
        Some(path) => Arc::new(JsonlAuditSink::new(path)),
        None => Arc::new(TracingAuditSink),
    };
    let gate = IngestionGate::new(
        Arc::new(DiskStore::new(&args.public_dir)),
        audit,
        Arc::new(MonotonicMillis::new()),
    );

    let upload = UploadedFile {
        bytes: Bytes::from(bytes),
        content_type,
        file_name,
    };
    let principal = Principal::new(args.actor.clone());

    match gate.ingest(Some(&principal), Some(upload), LOCAL_CLIENT).await {
        Ok(ingested) => {
            if !ingested.audited {
                eprintln!("WARN: stored, but the audit entry could not be written");
            }
            println!("{}", ingested.reference);
            Ok(0)
        }
        Err(e @ IngestError::StorageFailure { .. }) => {
            anyhow::bail!("{e}: {}", e.operator_detail())
        }
        Err(e) => {
            eprintln!("REJECTED: {e}");
            Ok(1)
        }
    }
}
