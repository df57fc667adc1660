//! # OpenAPI Specification Assembly
//!
//! Assembles the utoipa-documented routes into one OpenAPI document,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Quill API",
        version = "0.3.2",
        description = "Image ingestion and blog preview-card resolution for the Quill blog backend.",
        license(name = "BUSL-1.1")
    ),
    paths(
        crate::routes::uploads::upload_image,
        crate::routes::cards::resolve_cards,
        crate::routes::assets::placeholder,
        crate::routes::health::liveness,
        crate::routes::health::readiness,
        crate::routes::health::metrics,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::uploads::UploadForm,
        crate::routes::uploads::UploadResponse,
        crate::routes::cards::ResolveCardsRequest,
        crate::routes::cards::ResolveCardsResponse,
        crate::routes::cards::CardView,
        crate::middleware::metrics::MetricsSnapshot,
        crate::auth::Role,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "uploads", description = "Authenticated image ingestion"),
        (name = "cards", description = "Blog preview-card resolution"),
        (name = "assets", description = "Public static assets"),
        (name = "health", description = "Probes and counters"),
    )
)]
pub struct ApiDoc;

/// Registers the `bearer` security scheme referenced by authenticated paths.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
    }
}

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json — Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_routes() {
        let doc = ApiDoc::openapi();
        let json = serde_json::to_value(&doc).unwrap();
        let paths = json["paths"].as_object().unwrap();
        for path in ["/upload", "/v1/cards/resolve", "/placeholder.svg", "/health/readiness"] {
            assert!(paths.contains_key(path), "missing {path}");
        }
        assert!(json["components"]["securitySchemes"]["bearer"].is_object());
    }
}
