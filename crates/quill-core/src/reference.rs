//! # Artifact References
//!
//! An [`ArtifactReference`] names a binary asset either on the public
//! storage root (`/uploads/1700000000000-cover.png`) or at an absolute
//! external URL (`https://cdn.example/a.png`, `//cdn.example/a.png`).
//!
//! Local references must stay under the public root: any reference with a
//! `..`, `.` or root component after the leading slash is classified as
//! [`ReferenceKind::Unresolvable`] and never touches the filesystem.

use std::path::{Component, Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::naming::StoredName;

/// URL path prefix under which stored uploads are served.
pub const UPLOADS_PREFIX: &str = "/uploads/";

/// Directory, relative to the public root, holding stored uploads.
pub const UPLOADS_DIR: &str = "uploads";

/// Fixed reference displayed when no usable cover exists.
pub const PLACEHOLDER_REFERENCE: &str = "/placeholder.svg";

static EXTERNAL_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(https?:)?//").expect("static regex is valid"));

/// A reference to a stored or remote binary asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactReference(String);

/// How a (trimmed) reference string should be treated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceKind {
    /// Absolute URL with optional scheme; displayed as-is, never probed.
    External,
    /// Path under the public root, relative form without the leading slash.
    Local(PathBuf),
    /// Empty, relative, or escaping the public root.
    Unresolvable,
}

impl ArtifactReference {
    /// Wrap an arbitrary reference string.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Public reference for a freshly stored upload.
    pub fn for_upload(name: &StoredName) -> Self {
        Self(format!("{UPLOADS_PREFIX}{name}"))
    }

    /// The fixed placeholder reference.
    pub fn placeholder() -> Self {
        Self(PLACEHOLDER_REFERENCE.to_string())
    }

    /// The reference as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the owned string.
    pub fn into_string(self) -> String {
        self.0
    }

    /// Classify this reference.
    pub fn kind(&self) -> ReferenceKind {
        classify(&self.0)
    }
}

impl std::fmt::Display for ArtifactReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether `raw` is an absolute URL (`http://`, `https://` or `//`).
pub fn is_external(raw: &str) -> bool {
    EXTERNAL_URL.is_match(raw)
}

/// Classify a raw reference. Leading/trailing whitespace is ignored.
pub fn classify(raw: &str) -> ReferenceKind {
    let raw = raw.trim();
    if raw.is_empty() {
        return ReferenceKind::Unresolvable;
    }
    if is_external(raw) {
        return ReferenceKind::External;
    }
    let Some(relative) = raw.strip_prefix('/') else {
        return ReferenceKind::Unresolvable;
    };
    // Query strings and fragments are not part of the stored path.
    let relative = relative
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    match confine(Path::new(relative)) {
        Some(path) => ReferenceKind::Local(path),
        None => ReferenceKind::Unresolvable,
    }
}

/// Accept only plain path segments, so the result cannot leave the root.
fn confine(relative: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in relative.components() {
        match component {
            Component::Normal(segment) => out.push(segment),
            _ => return None,
        }
    }
    if out.as_os_str().is_empty() {
        None
    } else {
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_reference_shape() {
        let name = StoredName::derive(42, "a b.png");
        assert_eq!(ArtifactReference::for_upload(&name).as_str(), "/uploads/42-a_b.png");
    }

    #[test]
    fn external_urls() {
        assert_eq!(classify("https://cdn.example/a.png"), ReferenceKind::External);
        assert_eq!(classify("HTTP://cdn.example/a.png"), ReferenceKind::External);
        assert_eq!(classify("//cdn.example/a.png"), ReferenceKind::External);
        assert_eq!(classify("  https://cdn.example/a.png \n"), ReferenceKind::External);
    }

    #[test]
    fn local_candidates() {
        assert_eq!(
            classify("/uploads/1-a.png"),
            ReferenceKind::Local(PathBuf::from("uploads").join("1-a.png"))
        );
        assert_eq!(
            classify("/uploads/1-a.png?v=3"),
            ReferenceKind::Local(PathBuf::from("uploads").join("1-a.png"))
        );
    }

    #[test]
    fn traversal_is_unresolvable() {
        assert_eq!(classify("/../secret.png"), ReferenceKind::Unresolvable);
        assert_eq!(classify("/uploads/../../etc/passwd"), ReferenceKind::Unresolvable);
        assert_eq!(classify("/"), ReferenceKind::Unresolvable);
    }

    #[test]
    fn relative_and_empty_are_unresolvable() {
        assert_eq!(classify(""), ReferenceKind::Unresolvable);
        assert_eq!(classify("   "), ReferenceKind::Unresolvable);
        assert_eq!(classify("uploads/a.png"), ReferenceKind::Unresolvable);
        assert_eq!(classify("ftp://host/a.png"), ReferenceKind::Unresolvable);
    }
}
