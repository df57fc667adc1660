//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps [`IngestError`] and request-level failures to HTTP status codes
//! with a JSON body of the form `{"error": {"code", "message"}}`.
//! Server-side failures are logged in full and rendered generically.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use quill_core::IngestError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "UNAUTHORIZED", "BAD_REQUEST").
    pub code: String,
    /// Human-readable, user-safe message.
    pub message: String,
}

impl ErrorBody {
    /// Build a body from a code and message.
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.to_string(),
                message: message.into(),
            },
        }
    }
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Request body is well-formed but semantically invalid (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Missing or unacceptable input (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Missing, invalid or insufficiently privileged credentials (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Request body exceeds the configured limit (413).
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    /// Upload could not be persisted (500). Detail is logged, not returned.
    #[error("upload failed: {0}")]
    UploadFailed(String),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),

    /// Service dependency not ready (503).
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE"),
            Self::UploadFailed(_) => (StatusCode::INTERNAL_SERVER_ERROR, "UPLOAD_FAILED"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            Self::ServiceUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE"),
        }
    }

    /// The message rendered to clients.
    fn public_message(&self) -> String {
        match self {
            Self::UploadFailed(_) => "Unable to upload image".to_string(),
            Self::Internal(_) => "An internal error occurred".to_string(),
            Self::Validation(m)
            | Self::BadRequest(m)
            | Self::Unauthorized(m)
            | Self::PayloadTooLarge(m)
            | Self::ServiceUnavailable(m) => m.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Log server-side errors for operator visibility.
        match &self {
            Self::Internal(_) | Self::UploadFailed(_) => {
                tracing::error!(error = %self, "internal server error")
            }
            Self::ServiceUnavailable(_) => tracing::warn!(error = %self, "service unavailable"),
            _ => {}
        }

        (status, Json(ErrorBody::new(code, self.public_message()))).into_response()
    }
}

/// Convert Ingestion Gate outcomes to API errors.
impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        match &err {
            IngestError::Unauthenticated => Self::Unauthorized(err.to_string()),
            IngestError::MissingInput | IngestError::UnsupportedMediaType { .. } => {
                Self::BadRequest(err.to_string())
            }
            IngestError::StorageFailure { detail } => Self::UploadFailed(detail.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    /// Helper to extract status and body from a Response.
    async fn response_parts(err: AppError) -> (StatusCode, ErrorBody) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        (status, body)
    }

    #[test]
    fn status_codes() {
        let cases = [
            (AppError::Validation("x".into()), StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            (AppError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            (AppError::PayloadTooLarge("x".into()), StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE"),
            (AppError::UploadFailed("x".into()), StatusCode::INTERNAL_SERVER_ERROR, "UPLOAD_FAILED"),
            (AppError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            (AppError::ServiceUnavailable("x".into()), StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE"),
        ];
        for (err, status, code) in cases {
            assert_eq!(err.status_and_code(), (status, code), "{err}");
        }
    }

    #[test]
    fn ingest_errors_map_to_http_categories() {
        let unauth = AppError::from(IngestError::Unauthenticated);
        assert_eq!(unauth.status_and_code().0, StatusCode::UNAUTHORIZED);

        let missing = AppError::from(IngestError::MissingInput);
        assert_eq!(missing.status_and_code().0, StatusCode::BAD_REQUEST);

        let media = AppError::from(IngestError::UnsupportedMediaType {
            declared_type: "application/pdf".into(),
            extension: Some(".pdf".into()),
        });
        assert_eq!(media.status_and_code().0, StatusCode::BAD_REQUEST);

        let storage = AppError::from(IngestError::storage("ENOSPC"));
        assert_eq!(storage.status_and_code().0, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn client_errors_render_stable_messages() {
        let (status, body) = response_parts(IngestError::MissingInput.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error.message, "Image file is required");

        let (_, body) = response_parts(
            IngestError::UnsupportedMediaType {
                declared_type: "text/plain".into(),
                extension: None,
            }
            .into(),
        )
        .await;
        assert_eq!(body.error.message, "Only JPEG, PNG, or WebP images are allowed");
    }

    #[tokio::test]
    async fn upload_failure_hides_details() {
        let (status, body) =
            response_parts(IngestError::storage("EACCES /srv/public/uploads").into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error.message, "Unable to upload image");
        assert!(!body.error.message.contains("EACCES"));
    }

    #[tokio::test]
    async fn internal_hides_details() {
        let (_, body) = response_parts(AppError::Internal("db connection failed".into())).await;
        assert_eq!(body.error.message, "An internal error occurred");
    }

    #[test]
    fn error_body_has_only_code_and_message() {
        let json = serde_json::to_value(ErrorBody::new("TEST", "test message")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"error": {"code": "TEST", "message": "test message"}})
        );
    }
}
