//! # Content Records
//!
//! Blog posts as supplied by the content-listing collaborator. Quill does
//! not own these records; every field is optional so that partially
//! populated rows still deserialize and resolve.
//!
//! Field aliases accept the legacy blog API names (`coverImg`, `content`,
//! `createdAt`) alongside the snake_case forms.

use serde::{Deserialize, Serialize};

/// A blog post as consumed by the Presentation Resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRecord {
    /// Post title.
    #[serde(default)]
    pub title: Option<String>,
    /// URL slug under `/blog/`.
    #[serde(default)]
    pub slug: Option<String>,
    /// Creation timestamp as an RFC 3339 string or `YYYY-MM-DD` date.
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<String>,
    /// Free-form tags, display order preserved.
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    /// Cover image: a local `/uploads/...` path or an external URL.
    #[serde(
        default,
        alias = "coverImg",
        alias = "cover_img",
        alias = "coverArtifactReference"
    )]
    pub cover: Option<String>,
    /// Post body as HTML markup.
    #[serde(default, alias = "content", alias = "bodyMarkup")]
    pub body_markup: Option<String>,
}
