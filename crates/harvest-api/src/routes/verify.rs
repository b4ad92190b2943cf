//! # Verification API
//!
//! Routes:
//! - POST /v1/verify/{batch_id}: Verify a stored batch against the ledger
//! - POST /v1/fingerprint: Canonical form and fingerprint of a posted
//!   record; nothing is stored

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};
use harvest_core::{CanonicalBytes, VerificationReport};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::extract_json;
use crate::routes::path_batch_id;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FingerprintResponse {
    /// Canonical JSON text the fingerprint is taken over.
    pub canonical: String,
    /// `0x` + 64 lowercase hex characters.
    pub fingerprint: String,
    /// Whether older key-order-only clients would hash this record
    /// differently.
    pub profiles_diverge: bool,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/verify/{batch_id}", post(verify_batch))
        .route("/v1/fingerprint", post(fingerprint_record))
}

/// POST /v1/verify/{batch_id}: Recompute and compare with the ledger.
#[utoipa::path(
    post,
    path = "/v1/verify/{batch_id}",
    params(("batch_id" = String, Path, description = "Batch identifier")),
    responses(
        (status = 200, description = "Verification report", body = serde_json::Value),
        (status = 404, description = "Batch not found", body = crate::error::ErrorBody),
    ),
    tag = "verification"
)]
pub(crate) async fn verify_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
) -> Result<Json<VerificationReport>, AppError> {
    let id = path_batch_id(batch_id)?;
    Ok(Json(state.registry.verify(&id).await?))
}

/// POST /v1/fingerprint: Fingerprint a record without storing it.
#[utoipa::path(
    post,
    path = "/v1/fingerprint",
    request_body = serde_json::Value,
    responses(
        (status = 200, description = "Canonical form and fingerprint", body = FingerprintResponse),
        (status = 422, description = "Body is not JSON", body = crate::error::ErrorBody),
    ),
    tag = "verification"
)]
pub(crate) async fn fingerprint_record(
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<FingerprintResponse>, AppError> {
    let record = extract_json(body)?;
    let canonical =
        CanonicalBytes::new(&record).map_err(|e| AppError::Validation(e.to_string()))?;
    let diverge =
        harvest_core::profiles_diverge(&record).map_err(|e| AppError::Validation(e.to_string()))?;
    Ok(Json(FingerprintResponse {
        fingerprint: harvest_core::sha256_fingerprint(&canonical).to_prefixed_hex(),
        canonical: canonical.as_str().to_string(),
        profiles_diverge: diverge,
    }))
}
