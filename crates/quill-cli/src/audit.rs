//! # Audit Subcommand
//!
//! Verifies the SHA-256 hash chain of a JSONL audit log written by the
//! API server (`QUILL_AUDIT_LOG`) or by `quill ingest --audit-log`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use quill_core::audit::verify_jsonl_chain;

/// Arguments for the `quill audit` subcommand.
#[derive(Args, Debug)]
pub struct AuditArgs {
    #[command(subcommand)]
    pub command: AuditCommand,
}

/// Audit subcommands.
#[derive(Subcommand, Debug)]
pub enum AuditCommand {
    /// Recompute every event hash and check the chain links.
    Verify {
        /// JSONL audit file.
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

/// Execute the audit subcommand.
pub fn run_audit(args: &AuditArgs) -> Result<u8> {
    match &args.command {
        AuditCommand::Verify { file } => {
            let integrity = verify_jsonl_chain(file)
                .with_context(|| format!("failed to verify audit log: {}", file.display()))?;
            if integrity.is_valid() {
                println!("OK: {} events, chain intact", integrity.total_events);
                Ok(0)
            } else {
                println!(
                    "BROKEN: {} of {} events fail verification (lines {:?})",
                    integrity.broken_lines.len(),
                    integrity.total_events,
                    integrity.broken_lines
                );
                Ok(1)
            }
        }
    }
}
