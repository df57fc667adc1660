//! # Card Subcommand
//!
//! Resolves preview cards for a JSON file of content records against a
//! local public directory. Accepts either a bare array or an object with a
//! `records` array; `null` entries stay `null` in the output.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde::Deserialize;

use quill_core::{ContentRecord, PresentationResolver, PublicDirProbe, RenderDecision};

/// Arguments for the `quill card` subcommand.
#[derive(Args, Debug)]
pub struct CardArgs {
    /// JSON file with content records.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Public root used for local cover existence checks.
    #[arg(long, default_value = "public")]
    pub public_dir: PathBuf,

    /// Print compact JSON instead of pretty-printed.
    #[arg(long)]
    pub compact: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RecordsFile {
    Bare(Vec<Option<ContentRecord>>),
    Wrapped { records: Vec<Option<ContentRecord>> },
}

impl RecordsFile {
    fn into_records(self) -> Vec<Option<ContentRecord>> {
        match self {
            Self::Bare(records) | Self::Wrapped { records } => records,
        }
    }
}

/// Read records from `path` and resolve each one.
pub fn resolve_file(path: &Path, public_dir: &Path) -> Result<Vec<Option<RenderDecision>>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read file: {}", path.display()))?;
    let parsed: RecordsFile = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse content records: {}", path.display()))?;

    let records = parsed.into_records();
    tracing::info!(count = records.len(), "resolving cards");
    let resolver = PresentationResolver::new(PublicDirProbe::new(public_dir));
    Ok(resolver.resolve_all(&records))
}

/// Execute the card subcommand.
pub fn run_card(args: &CardArgs) -> Result<u8> {
    let cards = resolve_file(&args.file, &args.public_dir)?;
    let rendered = if args.compact {
        serde_json::to_string(&cards)?
    } else {
        serde_json::to_string_pretty(&cards)?
    };
    println!("{rendered}");
    Ok(0)
}
