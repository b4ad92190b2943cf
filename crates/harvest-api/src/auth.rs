//! # Admin Authentication
//!
//! A single shared admin token, presented as `Authorization: Bearer <token>`,
//! gates the write routes under `/v1/admin`. Read and verification routes
//! are public.
//!
//! Without a token the admin routes answer 503 and no candidate token is
//! accepted, unless `HARVEST_ALLOW_OPEN_ADMIN=true` opens them (local
//! development only).
//!
//! Missing credentials are 401; wrong credentials are 403. Comparison is
//! constant-time.

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Extension;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::typed_header::TypedHeaderRejection;
use axum_extra::TypedHeader;
use subtle::ConstantTimeEq;

use crate::error::AppError;

/// A secret that never appears in `Debug` output or logs.
#[derive(Clone)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Constant-time comparison against a presented credential.
    pub fn matches(&self, candidate: &str) -> bool {
        self.0.as_bytes().ct_eq(candidate.as_bytes()).into()
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretString(***)")
    }
}

/// Admin gate configuration, installed as a request extension.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    pub token: Option<SecretString>,
    /// Without a token, let every admin request through instead of refusing.
    pub allow_open: bool,
}

impl AuthConfig {
    pub fn is_enabled(&self) -> bool {
        self.token.is_some()
    }

    /// No token and no explicit opt-out: admin routes are unavailable.
    pub fn is_unconfigured(&self) -> bool {
        self.token.is_none() && !self.allow_open
    }

    /// Whether `candidate` would be accepted by the gate.
    pub fn accepts(&self, candidate: &str) -> bool {
        match &self.token {
            Some(token) => token.matches(candidate),
            None => self.allow_open,
        }
    }
}

/// Middleware guarding the admin routes.
pub async fn auth_middleware(
    Extension(config): Extension<AuthConfig>,
    bearer: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    request: Request,
    next: Next,
) -> Response {
    if config.is_unconfigured() {
        return AppError::ServiceUnavailable(
            "admin routes are disabled: HARVEST_ADMIN_TOKEN is not set".to_string(),
        )
        .into_response();
    }
    if !config.is_enabled() {
        return next.run(request).await;
    }

    match bearer {
        Ok(TypedHeader(Authorization(bearer))) if config.accepts(bearer.token()) => {
            next.run(request).await
        }
        Ok(_) => {
            tracing::warn!(path = %request.uri().path(), "admin request with wrong token");
            AppError::Forbidden("invalid admin token".to_string()).into_response()
        }
        Err(rejection) if rejection.is_missing() => {
            AppError::Unauthorized("admin token required in Authorization header".to_string())
                .into_response()
        }
        Err(_) => AppError::Unauthorized("Authorization header must use the Bearer scheme".to_string())
            .into_response(),
    }
}
