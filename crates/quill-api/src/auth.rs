//! # Authentication & Authorization Middleware
//!
//! Bearer token middleware with role-based access control.
//!
//! ## Token Format
//!
//! ```text
//! Bearer {role}:{subject}:{secret}   — role-scoped token
//! Bearer {secret}                    — bare secret (treated as admin "admin")
//! ```
//!
//! Every authenticated request gets a [`CallerIdentity`] injected into the
//! request extensions. Handlers extract it via the `FromRequestParts` impl
//! and hand a [`Principal`] to the Ingestion Gate.

use axum::extract::Request;
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use quill_core::Principal;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use utoipa::ToSchema;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{AppError, ErrorBody};

/// Subject recorded for requests served while auth is disabled.
pub const ANONYMOUS_SUBJECT: &str = "anonymous";

/// Subject assigned to a bare-secret token.
pub const BARE_TOKEN_SUBJECT: &str = "admin";

// ── Secrets ─────────────────────────────────────────────────────────────────

/// A secret string that is wiped from memory on drop and never printed.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretString(String);

impl SecretString {
    /// Wrap a secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the secret for comparison.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretString([REDACTED])")
    }
}

// ── Role ────────────────────────────────────────────────────────────────────

/// Roles ordered by privilege level: `Editor < Admin`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Can resolve preview cards.
    Editor,
    /// Full access, including image uploads.
    Admin,
}

impl Role {
    /// Return the string representation of this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Editor => "editor",
            Self::Admin => "admin",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "editor" => Some(Self::Editor),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

// ── CallerIdentity ──────────────────────────────────────────────────────────

/// Identity of the authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    /// The caller's role.
    pub role: Role,
    /// Stable subject identifier, recorded as the audit actor.
    pub subject: String,
}

impl CallerIdentity {
    /// Identity used when authentication is disabled.
    pub fn anonymous_admin() -> Self {
        Self {
            role: Role::Admin,
            subject: ANONYMOUS_SUBJECT.to_string(),
        }
    }

    /// Check if the caller has at least the given minimum role.
    pub fn has_role(&self, minimum: Role) -> bool {
        self.role >= minimum
    }

    /// The principal handed to the Ingestion Gate.
    pub fn principal(&self) -> Principal {
        Principal::new(self.subject.clone())
    }

    /// The principal, if the caller holds at least `minimum`.
    ///
    /// A caller below `minimum` has no session for the operation and is
    /// handled exactly like an unauthenticated one.
    pub fn principal_with_role(&self, minimum: Role) -> Option<Principal> {
        self.has_role(minimum).then(|| self.principal())
    }
}

/// Extracts the identity that the auth middleware injected into extensions.
/// Returns 401 if no identity is present.
#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Unauthorized".into()))
    }
}

// ── Auth Configuration ──────────────────────────────────────────────────────

/// Auth configuration injected into request extensions.
/// `None` disables authentication.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    pub token: Option<SecretString>,
}

// ── Token Validation ────────────────────────────────────────────────────────

/// Constant-time comparison of bearer secrets.
///
/// When lengths differ, a dummy comparison keeps the timing independent of
/// how much of the prefix matched.
fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

/// Parse a bearer token in format `{role}:{subject}:{secret}` or `{secret}`.
///
/// An empty subject defaults to the role name.
pub fn parse_bearer_token(provided: &str, expected_secret: &str) -> Result<CallerIdentity, String> {
    let parts: Vec<&str> = provided.splitn(3, ':').collect();

    match parts.as_slice() {
        [secret] => {
            if constant_time_token_eq(secret, expected_secret) {
                Ok(CallerIdentity {
                    role: Role::Admin,
                    subject: BARE_TOKEN_SUBJECT.to_string(),
                })
            } else {
                Err("invalid bearer token".into())
            }
        }
        [role, subject, secret] => {
            if !constant_time_token_eq(secret, expected_secret) {
                return Err("invalid bearer token".into());
            }
            let role = Role::parse(role).ok_or_else(|| format!("unknown role: {role}"))?;
            let subject = if subject.is_empty() {
                role.as_str().to_string()
            } else {
                (*subject).to_string()
            };
            Ok(CallerIdentity { role, subject })
        }
        _ => Err("invalid token format, expected {role}:{subject}:{secret} or {secret}".into()),
    }
}

// ── Middleware ───────────────────────────────────────────────────────────────

/// Validate the Bearer token and inject the resulting [`CallerIdentity`].
///
/// When `AuthConfig.token` is `None`, every request runs as an admin with
/// subject `anonymous`.
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let config = request
        .extensions()
        .get::<AuthConfig>()
        .cloned()
        .unwrap_or_default();

    let Some(expected) = config.token else {
        request
            .extensions_mut()
            .insert(CallerIdentity::anonymous_admin());
        return next.run(request).await;
    };

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let outcome = match auth_header {
        Some(value) => match value.strip_prefix("Bearer ") {
            Some(provided) => parse_bearer_token(provided, expected.expose()),
            None => Err("authorization header must use Bearer scheme".to_string()),
        },
        None => Err("missing authorization header".to_string()),
    };

    match outcome {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(reason) => {
            tracing::warn!(reason = %reason, "authentication failed");
            unauthorized_response()
        }
    }
}

fn unauthorized_response() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorBody::new("UNAUTHORIZED", "Unauthorized")),
    )
        .into_response()
}
