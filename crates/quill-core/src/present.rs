//! # Presentation Resolver
//!
//! Decides what a blog preview card shows. The resolver is total: a missing
//! record resolves to `None`, and every other record resolves to a
//! [`RenderDecision`] with safe defaults for whatever is absent or broken.
//!
//! ## Cover Selection
//!
//! | Cover reference                  | Displayed           | Placeholder |
//! |----------------------------------|---------------------|-------------|
//! | external URL                     | as given            | no          |
//! | local path, probe says present   | as given            | no          |
//! | local path, absent or probe error| `/placeholder.svg`  | yes         |
//! | empty, relative, escaping root   | `/placeholder.svg`  | yes         |
//!
//! The only side effect, the local existence check, sits behind the
//! [`AssetProbe`] capability so the decision logic can be tested without
//! touching a disk.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::content::ContentRecord;
use crate::excerpt::{date_label, excerpt, tag_label};
use crate::reference::{classify, ReferenceKind, PLACEHOLDER_REFERENCE};

/// Upload prompt shown alongside placeholder covers.
pub const PLACEHOLDER_HINT: &str = "Upload a custom cover to replace the default graphic.";

/// Existence check for assets under the public root.
pub trait AssetProbe: Send + Sync {
    /// Whether `relative` (already confined to the root) exists.
    ///
    /// `Err` means the check itself failed; the resolver treats that the
    /// same as absence but logs it separately.
    fn exists(&self, relative: &Path) -> io::Result<bool>;
}

/// Probe that checks the real filesystem under a public root directory.
#[derive(Debug, Clone)]
pub struct PublicDirProbe {
    root: PathBuf,
}

impl PublicDirProbe {
    /// Probe files under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The public root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetProbe for PublicDirProbe {
    fn exists(&self, relative: &Path) -> io::Result<bool> {
        self.root.join(relative).try_exists()
    }
}

/// Everything a renderer needs to draw one preview card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderDecision {
    /// Post title, empty when absent.
    pub title: String,
    /// Link target for the card (`/blog/{slug}`).
    pub href: String,
    /// Cover reference to display.
    pub display_artifact: String,
    /// True when `display_artifact` is the placeholder.
    pub is_placeholder: bool,
    /// True when the cover is an external URL (renderer skips optimisation).
    pub is_external: bool,
    /// Upload prompt, present only for placeholder covers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder_hint: Option<String>,
    /// Medium-length creation date, empty when unparseable.
    pub date_label: String,
    /// At most two tags, or `General`.
    pub tag_label: String,
    /// Plain-text excerpt of the body.
    pub excerpt: String,
}

/// Resolves content records into render decisions.
#[derive(Debug, Clone)]
pub struct PresentationResolver<P> {
    probe: P,
}

impl<P: AssetProbe> PresentationResolver<P> {
    /// Build a resolver over the given existence probe.
    pub fn new(probe: P) -> Self {
        Self { probe }
    }

    /// The injected probe.
    pub fn probe(&self) -> &P {
        &self.probe
    }

    /// Resolve one record. `None` in, `None` out.
    pub fn resolve(&self, record: Option<&ContentRecord>) -> Option<RenderDecision> {
        let record = record?;
        let raw_cover = record.cover.as_deref().map(str::trim).unwrap_or_default();

        let (is_real, is_external) = match classify(raw_cover) {
            ReferenceKind::External => (true, true),
            ReferenceKind::Local(relative) => (self.local_exists(&relative), false),
            ReferenceKind::Unresolvable => {
                if !raw_cover.is_empty() {
                    tracing::debug!(cover = raw_cover, "cover reference outside public root");
                }
                (false, false)
            }
        };

        let display_artifact = if is_real {
            raw_cover.to_string()
        } else {
            PLACEHOLDER_REFERENCE.to_string()
        };

        Some(RenderDecision {
            title: record.title.clone().unwrap_or_default(),
            href: format!("/blog/{}", record.slug.as_deref().unwrap_or_default()),
            display_artifact,
            is_placeholder: !is_real,
            is_external,
            placeholder_hint: (!is_real).then(|| PLACEHOLDER_HINT.to_string()),
            date_label: date_label(record.created_at.as_deref()),
            tag_label: tag_label(record.tags.as_deref()),
            excerpt: excerpt(record.body_markup.as_deref()),
        })
    }

    /// Resolve a list, preserving order and gaps.
    pub fn resolve_all(&self, records: &[Option<ContentRecord>]) -> Vec<Option<RenderDecision>> {
        records.iter().map(|r| self.resolve(r.as_ref())).collect()
    }

    fn local_exists(&self, relative: &Path) -> bool {
        match self.probe.exists(relative) {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(
                    path = %relative.display(),
                    error = %e,
                    "cover existence check failed; using placeholder"
                );
                false
            }
        }
    }
}
