//! # Request/Response Tracing
//!
//! `tower_http::trace::TraceLayer` with one span per request carrying the
//! method, path and a fresh request id.

use axum::http::Request;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::Level;

/// Span constructor used by [`layer`].
pub type MakeRequestSpan = fn(&Request<axum::body::Body>) -> tracing::Span;

/// Build the `TraceLayer` for the Quill API.
pub fn layer() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>, MakeRequestSpan> {
    TraceLayer::new_for_http()
        .make_span_with(request_span as MakeRequestSpan)
        .on_response(DefaultOnResponse::new().level(Level::INFO))
}

fn request_span(request: &Request<axum::body::Body>) -> tracing::Span {
    tracing::info_span!(
        "http_request",
        method = %request.method(),
        path = %request.uri().path(),
        request_id = %uuid::Uuid::new_v4(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layer_constructs() {
        let _layer = layer();
    }
}
