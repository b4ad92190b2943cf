//! # OpenAPI Specification Assembly
//!
//! Assembles the utoipa-documented routes into one OpenAPI document served
//! at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

/// Adds the admin bearer token scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "admin_token",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .description(Some(
                            "Shared admin token. Set via HARVEST_ADMIN_TOKEN env var.",
                        ))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Harvest Seal API",
        version = "0.1.0",
        description = "Registration and verification of agricultural batch records.\n\nEach batch is canonicalized and fingerprinted with SHA-256; the fingerprint is anchored on a public ledger. Verification recomputes the fingerprint from the stored record and compares it with the anchored one, reporting NOT_REGISTERED, VERIFIED, TAMPERED or VERIFICATION_FAILED.\n\nWrite routes under `/v1/admin` require `Authorization: Bearer <token>`.",
    ),
    servers(
        (url = "http://localhost:4000", description = "Local development server"),
    ),
    paths(
        crate::routes::batches::list_batches,
        crate::routes::batches::get_batch,
        crate::routes::batches::search_batches,
        crate::routes::verify::verify_batch,
        crate::routes::verify::fingerprint_record,
        crate::routes::admin::create_batch,
        crate::routes::admin::anchor_batch,
        crate::routes::admin::verify_token,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::batches::BatchListResponse,
        crate::routes::batches::BatchDetailResponse,
        crate::routes::batches::SearchResponse,
        crate::routes::verify::FingerprintResponse,
        crate::routes::admin::VerifyTokenRequest,
        crate::routes::admin::VerifyTokenResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "batches", description = "Batch listing, detail and search"),
        (name = "verification", description = "Fingerprint verification against the ledger"),
        (name = "admin", description = "Batch registration and anchoring"),
    )
)]
pub struct ApiDoc;

pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
