//! # Image Upload
//!
//! `POST /upload` — multipart field `file`. Runs the Ingestion Gate with
//! the caller's principal and responds `{"url": "/uploads/..."}`.

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::routing::post;
use axum::{Json, Router};
use quill_core::IngestError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{CallerIdentity, Role};
use crate::error::AppError;
use crate::extractors::{read_upload, ClientIp};
use crate::state::AppState;

/// Multipart form accepted by `POST /upload`.
#[derive(Debug, ToSchema)]
pub struct UploadForm {
    /// JPEG, PNG or WebP image with a matching filename extension.
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

/// Successful upload.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    /// Public reference to the stored image, e.g. `/uploads/1700000000000-cover.png`.
    pub url: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/upload", post(upload_image))
}

/// POST /upload — Store an image and return its public reference.
#[utoipa::path(
    post,
    path = "/upload",
    tag = "uploads",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Image stored", body = UploadResponse),
        (status = 400, description = "Missing file or unsupported image type", body = crate::error::ErrorBody),
        (status = 401, description = "Missing or invalid credentials, or caller is not an admin", body = crate::error::ErrorBody),
        (status = 413, description = "Request body too large", body = crate::error::ErrorBody),
        (status = 500, description = "Storage failure", body = crate::error::ErrorBody),
    ),
    security(("bearer" = []))
)]
pub async fn upload_image(
    State(state): State<AppState>,
    caller: CallerIdentity,
    client_ip: ClientIp,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let Some(principal) = caller.principal_with_role(Role::Admin) else {
        tracing::warn!(
            subject = %caller.subject,
            role = caller.role.as_str(),
            "upload refused: admin role required"
        );
        state.metrics.record_rejection();
        return Err(IngestError::Unauthenticated.into());
    };

    // A body that is not multipart carries no file.
    let file = match multipart {
        Ok(multipart) => read_upload(multipart).await.map_err(|e| {
            state.metrics.record_rejection();
            e
        })?,
        Err(rejection) => {
            tracing::debug!(reason = %rejection.body_text(), "upload body is not multipart");
            None
        }
    };

    match state.gate.ingest(Some(&principal), file, client_ip.as_str()).await {
        Ok(ingested) => {
            state.metrics.record_upload(ingested.size);
            Ok(Json(UploadResponse {
                url: ingested.reference.into_string(),
            }))
        }
        Err(e) => {
            state.metrics.record_rejection();
            Err(e.into())
        }
    }
}
