//! # Preview Cards
//!
//! `POST /v1/cards/resolve` — runs the Presentation Resolver over a batch
//! of content records. Order and `null` gaps are preserved.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use quill_core::{ContentRecord, RenderDecision};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::AppState;

/// Largest batch accepted in one request.
pub const MAX_RECORDS: usize = 500;

/// Batch of blog records to resolve.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ResolveCardsRequest {
    /// Content records; `null` entries resolve to `null` cards.
    #[schema(value_type = Vec<Object>)]
    pub records: Vec<Option<ContentRecord>>,
}

impl Validate for ResolveCardsRequest {
    fn validate(&self) -> Result<(), String> {
        if self.records.len() > MAX_RECORDS {
            return Err(format!(
                "at most {MAX_RECORDS} records per request, got {}",
                self.records.len()
            ));
        }
        Ok(())
    }
}

/// What a renderer needs to draw one preview card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CardView {
    pub title: String,
    /// Link target, `/blog/{slug}`.
    pub href: String,
    /// Cover to display: the record's own, or `/placeholder.svg`.
    pub display_artifact: String,
    pub is_placeholder: bool,
    /// External covers are rendered without optimisation.
    pub is_external: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder_hint: Option<String>,
    pub date_label: String,
    pub tag_label: String,
    pub excerpt: String,
}

impl From<RenderDecision> for CardView {
    fn from(d: RenderDecision) -> Self {
        Self {
            title: d.title,
            href: d.href,
            display_artifact: d.display_artifact,
            is_placeholder: d.is_placeholder,
            is_external: d.is_external,
            placeholder_hint: d.placeholder_hint,
            date_label: d.date_label,
            tag_label: d.tag_label,
            excerpt: d.excerpt,
        }
    }
}

/// Resolved cards, index-aligned with the request.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResolveCardsResponse {
    pub cards: Vec<Option<CardView>>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/cards/resolve", post(resolve_cards))
}

/// POST /v1/cards/resolve — Decide what each preview card displays.
#[utoipa::path(
    post,
    path = "/v1/cards/resolve",
    tag = "cards",
    request_body = ResolveCardsRequest,
    responses(
        (status = 200, description = "Cards resolved", body = ResolveCardsResponse),
        (status = 400, description = "Malformed JSON", body = crate::error::ErrorBody),
        (status = 401, description = "Missing or invalid credentials", body = crate::error::ErrorBody),
        (status = 422, description = "Too many records", body = crate::error::ErrorBody),
    ),
    security(("bearer" = []))
)]
pub async fn resolve_cards(
    State(state): State<AppState>,
    body: Result<Json<ResolveCardsRequest>, JsonRejection>,
) -> Result<Json<ResolveCardsResponse>, AppError> {
    let request = extract_validated_json(body)?;
    let resolver = state.resolver.clone();

    // Existence checks hit the filesystem synchronously.
    let decisions = tokio::task::spawn_blocking(move || resolver.resolve_all(&request.records))
        .await
        .map_err(|e| AppError::Internal(format!("card resolution task failed: {e}")))?;

    Ok(Json(ResolveCardsResponse {
        cards: decisions
            .into_iter()
            .map(|d| d.map(CardView::from))
            .collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_batch_fails_validation() {
        let request = ResolveCardsRequest {
            records: vec![None; MAX_RECORDS + 1],
        };
        assert!(request.validate().is_err());

        let request = ResolveCardsRequest {
            records: vec![None; MAX_RECORDS],
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn accepts_original_field_names() {
        let request: ResolveCardsRequest = serde_json::from_str(
            r#"{"records":[{"title":"T","slug":"t","createdAt":"2024-01-05","coverImg":"/uploads/a.png","content":"<p>x</p>"},null]}"#,
        )
        .unwrap();
        let first = request.records[0].as_ref().unwrap();
        assert_eq!(first.cover.as_deref(), Some("/uploads/a.png"));
        assert_eq!(first.body_markup.as_deref(), Some("<p>x</p>"));
        assert!(request.records[1].is_none());
    }
}
