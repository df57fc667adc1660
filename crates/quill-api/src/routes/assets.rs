//! # Public Assets
//!
//! Serves stored uploads from `{public_dir}/uploads` and the cover
//! placeholder. A `placeholder.svg` in the public directory overrides the
//! built-in graphic.

use std::path::Path;

use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use bytes::Bytes;
use quill_core::reference::UPLOADS_DIR;
use tower_http::services::ServeDir;

use crate::state::AppState;

/// Built-in cover placeholder.
pub const BUILTIN_PLACEHOLDER_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="1200" height="630" viewBox="0 0 1200 630" role="img" aria-label="No cover image">
  <rect width="1200" height="630" fill="#eef1f5"/>
  <rect x="450" y="195" width="300" height="240" rx="16" fill="none" stroke="#b4bcc8" stroke-width="12"/>
  <circle cx="530" cy="270" r="28" fill="#b4bcc8"/>
  <path d="M462 420 L570 320 L640 385 L690 340 L738 420 Z" fill="#b4bcc8"/>
</svg>
"##;

const SVG_CONTENT_TYPE: &str = "image/svg+xml";

pub fn router(public_dir: &Path) -> Router<AppState> {
    Router::new()
        .route("/placeholder.svg", get(placeholder))
        .nest_service("/uploads", ServeDir::new(public_dir.join(UPLOADS_DIR)))
}

/// GET /placeholder.svg — Cover shown when a post has no usable image.
#[utoipa::path(
    get,
    path = "/placeholder.svg",
    tag = "assets",
    responses((status = 200, description = "SVG placeholder", content_type = "image/svg+xml", body = String))
)]
pub async fn placeholder(State(state): State<AppState>) -> Response {
    let override_path = state.public_dir().join("placeholder.svg");
    let body = match tokio::fs::read(&override_path).await {
        Ok(bytes) => Bytes::from(bytes),
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %override_path.display(), error = %e, "placeholder override unreadable");
            }
            Bytes::from_static(BUILTIN_PLACEHOLDER_SVG.as_bytes())
        }
    };
    (
        [
            (header::CONTENT_TYPE, SVG_CONTENT_TYPE),
            (header::CACHE_CONTROL, "public, max-age=3600"),
        ],
        body,
    )
        .into_response()
}
