//! # Batch Read API
//!
//! Routes:
//! - GET /v1/batches: All batches, newest first
//! - GET /v1/batches/{batch_id}: Record plus live verification report
//! - GET /v1/search?q=: Case-insensitive search

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use harvest_core::{BatchRecord, VerificationReport};
use harvest_registry::BatchSummary;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::AppError;
use crate::extractors::Validate;
use crate::routes::path_batch_id;
use crate::state::AppState;

/// Longest accepted search query, in characters.
const MAX_QUERY_LEN: usize = 200;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BatchListResponse {
    #[schema(value_type = Vec<Object>)]
    pub batches: Vec<BatchSummary>,
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BatchDetailResponse {
    #[schema(value_type = Object)]
    pub batch: BatchRecord,
    #[schema(value_type = Object)]
    pub verification: VerificationReport,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SearchQuery {
    /// Text to look for in id, product, village, district and state.
    pub q: Option<String>,
}

impl Validate for SearchQuery {
    fn validate(&self) -> Result<(), String> {
        let q = self.q.as_deref().unwrap_or_default().trim();
        if q.is_empty() {
            return Err("query parameter q must not be empty".to_string());
        }
        if q.chars().count() > MAX_QUERY_LEN {
            return Err(format!("query must not exceed {MAX_QUERY_LEN} characters"));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SearchResponse {
    pub query: String,
    #[schema(value_type = Vec<Object>)]
    pub results: Vec<BatchSummary>,
    pub count: usize,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/batches", get(list_batches))
        .route("/v1/batches/{batch_id}", get(get_batch))
        .route("/v1/search", get(search_batches))
}

/// GET /v1/batches: List batch summaries.
#[utoipa::path(
    get,
    path = "/v1/batches",
    responses(
        (status = 200, description = "Batch summaries, newest first", body = BatchListResponse),
    ),
    tag = "batches"
)]
pub(crate) async fn list_batches(
    State(state): State<AppState>,
) -> Result<Json<BatchListResponse>, AppError> {
    let batches = state.registry.list().await?;
    Ok(Json(BatchListResponse {
        count: batches.len(),
        batches,
    }))
}

/// GET /v1/batches/{batch_id}: Fetch a batch and verify it against the ledger.
#[utoipa::path(
    get,
    path = "/v1/batches/{batch_id}",
    params(("batch_id" = String, Path, description = "Batch identifier")),
    responses(
        (status = 200, description = "Batch with verification report", body = BatchDetailResponse),
        (status = 404, description = "Batch not found", body = crate::error::ErrorBody),
    ),
    tag = "batches"
)]
pub(crate) async fn get_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
) -> Result<Json<BatchDetailResponse>, AppError> {
    let id = path_batch_id(batch_id)?;
    let (batch, verification) = state.registry.get_verified(&id).await?;
    Ok(Json(BatchDetailResponse {
        batch,
        verification,
    }))
}

/// GET /v1/search: Search batches.
#[utoipa::path(
    get,
    path = "/v1/search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching batches", body = SearchResponse),
        (status = 422, description = "Missing query", body = crate::error::ErrorBody),
    ),
    tag = "batches"
)]
pub(crate) async fn search_batches(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, AppError> {
    params.validate().map_err(AppError::Validation)?;
    let query = params.q.unwrap_or_default().trim().to_string();
    let results = state.registry.search(&query).await?;
    Ok(Json(SearchResponse {
        count: results.len(),
        query,
        results,
    }))
}
