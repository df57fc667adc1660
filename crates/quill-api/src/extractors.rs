//! # Custom Extractors
//!
//! Request-info helpers shared by handlers and middleware:
//!
//! - [`ClientIp`] — best-effort client address for audit and rate limiting.
//! - [`read_upload`] — pulls the `file` part out of a multipart body.
//! - [`extract_json`] — maps JSON rejections to [`AppError::BadRequest`].
//! - [`Validate`] — business-rule checks on request DTOs (422 on failure).

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, Multipart};
use axum::http::request::Parts;
use axum::http::{Extensions, HeaderMap, StatusCode};
use axum::Json;
use quill_core::UploadedFile;

use crate::error::AppError;

/// Multipart field carrying the image.
pub const UPLOAD_FIELD: &str = "file";

/// Reported when no source yields an address.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Content type assumed for parts that declare none.
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Client address, resolved from (in order) the first `X-Forwarded-For`
/// entry, `X-Real-IP`, the socket peer, or the literal `unknown`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl ClientIp {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Resolve the client address from request headers and extensions.
pub fn resolve_client_ip(headers: &HeaderMap, extensions: &Extensions) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(first) = header("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return first.to_string();
    }
    if let Some(real) = header("x-real-ip") {
        return real.to_string();
    }
    if let Some(ConnectInfo(addr)) = extensions.get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }
    UNKNOWN_CLIENT.to_string()
}

#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(resolve_client_ip(&parts.headers, &parts.extensions)))
    }
}

/// Read the `file` part of a multipart upload.
///
/// Returns `Ok(None)` when the part is absent, or when it is an empty
/// file input (no filename and no bytes). Other parts are skipped.
pub async fn read_upload(mut multipart: Multipart) -> Result<Option<UploadedFile>, AppError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field
            .file_name()
            .map(str::to_string)
            .filter(|n| !n.is_empty());
        let content_type = field
            .content_type()
            .unwrap_or(FALLBACK_CONTENT_TYPE)
            .to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?;

        if file_name.is_none() && bytes.is_empty() {
            return Ok(None);
        }
        return Ok(Some(UploadedFile {
            bytes,
            content_type,
            file_name,
        }));
    }
    Ok(None)
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("upload exceeds the request size limit".into())
    } else {
        AppError::BadRequest(err.body_text())
    }
}

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`].
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Request types that check rules serde cannot express.
pub trait Validate {
    /// Returns a user-facing message on failure.
    fn validate(&self) -> Result<(), String>;
}

/// Extract a JSON body and validate it with [`Validate`].
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let value = extract_json(result)?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(*k, HeaderValue::from_static(v));
        }
        map
    }

    fn with_peer() -> Extensions {
        let mut ext = Extensions::new();
        ext.insert(ConnectInfo(SocketAddr::from(([192, 168, 1, 7], 55000))));
        ext
    }

    #[test]
    fn forwarded_for_first_entry_wins() {
        let h = headers(&[
            ("x-forwarded-for", " 203.0.113.9 , 10.0.0.1"),
            ("x-real-ip", "198.51.100.2"),
        ]);
        assert_eq!(resolve_client_ip(&h, &with_peer()), "203.0.113.9");
    }

    #[test]
    fn real_ip_used_without_forwarded_for() {
        let h = headers(&[("x-real-ip", "198.51.100.2")]);
        assert_eq!(resolve_client_ip(&h, &with_peer()), "198.51.100.2");
    }

    #[test]
    fn falls_back_to_socket_peer() {
        let h = headers(&[("x-forwarded-for", "")]);
        assert_eq!(resolve_client_ip(&h, &with_peer()), "192.168.1.7");
    }

    #[test]
    fn unknown_without_any_source() {
        assert_eq!(
            resolve_client_ip(&HeaderMap::new(), &Extensions::new()),
            UNKNOWN_CLIENT
        );
    }
}
