//! # Image Allow-List
//!
//! Uploads are restricted to JPEG, PNG and WebP. The check runs on two
//! axes: the declared MIME type (always) and the filename extension (when
//! the original name has one). Either axis failing rejects the upload.

use serde::{Deserialize, Serialize};

use crate::error::IngestError;

/// MIME types accepted by the Ingestion Gate.
pub const ALLOWED_MIME_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];

/// Filename extensions accepted by the Ingestion Gate, with leading dot.
pub const ALLOWED_EXTENSIONS: [&str; 4] = [".jpg", ".jpeg", ".png", ".webp"];

/// An accepted image format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    /// `image/jpeg`
    Jpeg,
    /// `image/png`
    Png,
    /// `image/webp`
    Webp,
}

impl ImageKind {
    /// Match a declared MIME type exactly against the allow-list.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "image/jpeg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/webp" => Some(Self::Webp),
            _ => None,
        }
    }

    /// Canonical MIME type string.
    pub fn mime(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
        }
    }
}

/// Lowercased extension of `file_name` including the leading dot.
///
/// Mirrors POSIX `extname`: a leading dot alone (`.bashrc`) or a trailing
/// dot yields no usable extension.
pub fn extension_of(file_name: &str) -> Option<String> {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    let idx = base.rfind('.')?;
    if idx == 0 || idx + 1 == base.len() {
        return None;
    }
    Some(base[idx..].to_ascii_lowercase())
}

/// Validate a declared MIME type and original filename.
pub fn check_upload(declared_type: &str, file_name: &str) -> Result<ImageKind, IngestError> {
    let extension = extension_of(file_name);
    let reject = || IngestError::UnsupportedMediaType {
        declared_type: declared_type.to_string(),
        extension: extension.clone(),
    };

    let kind = ImageKind::from_mime(declared_type).ok_or_else(reject)?;
    if let Some(ext) = extension.as_deref() {
        if !ALLOWED_EXTENSIONS.contains(&ext) {
            return Err(reject());
        }
    }
    Ok(kind)
}
