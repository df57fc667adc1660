//! # quill-cli — Command-Line Tool for Quill
//!
//! ## Subcommands
//!
//! - `quill ingest` — run the Ingestion Gate against a local file.
//! - `quill card` — run the Presentation Resolver over a JSON file.
//! - `quill audit verify` — check a JSONL audit log's hash chain.
//!
//! ```bash
//! quill ingest ./cover.png --public-dir public --audit-log audit.jsonl
//! quill card posts.json --public-dir public
//! quill audit verify audit.jsonl
//! ```
//!
//! Exit codes: `0` success, `1` rejected input or failed verification,
//! and `1` with a logged error for I/O failures.

pub mod audit;
pub mod card;
pub mod ingest;
