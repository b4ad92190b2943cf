//! # Admin API
//!
//! Routes behind the admin token:
//! - POST /v1/admin/batches: Create, fingerprint and anchor a batch
//! - POST /v1/admin/batches/{batch_id}/anchor: Anchor a REGISTERED_LOCAL batch
//!
//! Unauthenticated:
//! - POST /v1/admin/verify-token: Check a candidate admin token
//!
//! A create whose ledger step fails still returns 200: the batch is stored
//! as REGISTERED_LOCAL and the response carries `warning` and
//! `ledger_error`.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Extension, Json, Router};
use harvest_core::NewBatch;
use harvest_registry::RegistrationOutcome;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::AuthConfig;
use crate::error::AppError;
use crate::extractors::{extract_json, extract_validated_json, Validate};
use crate::routes::path_batch_id;
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyTokenRequest {
    pub token: String,
}

impl Validate for VerifyTokenRequest {
    fn validate(&self) -> Result<(), String> {
        if self.token.is_empty() {
            return Err("token must not be empty".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VerifyTokenResponse {
    pub valid: bool,
}

/// Admin write routes. The caller layers the auth middleware on top.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/admin/batches", post(create_batch))
        .route("/v1/admin/batches/{batch_id}/anchor", post(anchor_batch))
}

/// The token check, which must stay reachable without a token.
pub fn token_router() -> Router<AppState> {
    Router::new().route("/v1/admin/verify-token", post(verify_token))
}

/// POST /v1/admin/batches: Register a new batch.
#[utoipa::path(
    post,
    path = "/v1/admin/batches",
    request_body = serde_json::Value,
    responses(
        (status = 200, description = "Batch stored; `state` tells whether it was anchored", body = serde_json::Value),
        (status = 401, description = "Missing admin token", body = crate::error::ErrorBody),
        (status = 403, description = "Wrong admin token", body = crate::error::ErrorBody),
        (status = 409, description = "Batch id already exists", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid batch", body = crate::error::ErrorBody),
        (status = 503, description = "No admin token configured", body = crate::error::ErrorBody),
    ),
    security(("admin_token" = [])),
    tag = "admin"
)]
pub(crate) async fn create_batch(
    State(state): State<AppState>,
    body: Result<Json<NewBatch>, JsonRejection>,
) -> Result<Json<RegistrationOutcome>, AppError> {
    let input = extract_json(body)?;
    let outcome = state.registry.create(input).await?;
    Ok(Json(outcome))
}

/// POST /v1/admin/batches/{batch_id}/anchor: Anchor a locally registered batch.
#[utoipa::path(
    post,
    path = "/v1/admin/batches/{batch_id}/anchor",
    params(("batch_id" = String, Path, description = "Batch identifier")),
    responses(
        (status = 200, description = "Batch anchored", body = serde_json::Value),
        (status = 404, description = "Batch not found", body = crate::error::ErrorBody),
        (status = 409, description = "Already anchored, or edited since registration", body = crate::error::ErrorBody),
        (status = 502, description = "Ledger failed", body = crate::error::ErrorBody),
        (status = 503, description = "No ledger configured", body = crate::error::ErrorBody),
    ),
    security(("admin_token" = [])),
    tag = "admin"
)]
pub(crate) async fn anchor_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
) -> Result<Json<RegistrationOutcome>, AppError> {
    let id = path_batch_id(batch_id)?;
    Ok(Json(state.registry.anchor_existing(&id).await?))
}

/// POST /v1/admin/verify-token: Check a candidate admin token.
#[utoipa::path(
    post,
    path = "/v1/admin/verify-token",
    request_body = VerifyTokenRequest,
    responses(
        (status = 200, description = "Token accepted", body = VerifyTokenResponse),
        (status = 401, description = "Token rejected", body = VerifyTokenResponse),
    ),
    security(()),
    tag = "admin"
)]
pub(crate) async fn verify_token(
    Extension(auth): Extension<AuthConfig>,
    body: Result<Json<VerifyTokenRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let req = extract_validated_json(body)?;
    let valid = auth.accepts(&req.token);
    let status = if valid {
        StatusCode::OK
    } else {
        StatusCode::UNAUTHORIZED
    };
    Ok((status, Json(VerifyTokenResponse { valid })).into_response())
}
