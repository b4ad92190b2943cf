//! # harvest-api: Axum API Service for Harvest Seal
//!
//! HTTP surface over [`harvest_registry::BatchRegistry`].
//!
//! ## API Surface
//!
//! | Prefix                     | Module                   | Auth   |
//! |----------------------------|--------------------------|--------|
//! | `/v1/batches*`, `/v1/search` | [`routes::batches`]    | none   |
//! | `/v1/verify/*`, `/v1/fingerprint` | [`routes::verify`] | none   |
//! | `/v1/admin/batches*`       | [`routes::admin`]        | admin  |
//! | `/v1/admin/verify-token`   | [`routes::admin`]        | none   |
//! | `/health/*`, `/metrics`, `/openapi.json` | here       | none   |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! CorsLayer → TraceLayer → MetricsMiddleware → [AuthMiddleware on /v1/admin] → Handler
//! ```
//!
//! CORS admits the single origin in `HARVEST_FRONTEND_URL`, with
//! credentials.

pub mod auth;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;

pub use error::AppError;
pub use state::{AppConfig, AppState};

/// Request bodies above this size are rejected.
const BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Assemble the application router.
///
/// Health checks, `/metrics`, `/openapi.json` and the token check are
/// reachable without credentials. `/metrics` is only mounted when a
/// Prometheus handle is present in the state.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.admin_token.clone(),
        allow_open: state.config.allow_open_admin,
    };
    let cors = cors_layer(&state.config.frontend_url);
    let metrics_on = state.metrics.is_some();

    let admin = routes::admin::router().route_layer(from_fn(auth::auth_middleware));

    let mut api = Router::new()
        .merge(routes::batches::router())
        .merge(routes::verify::router())
        .merge(routes::admin::token_router())
        .merge(admin)
        .merge(openapi::router())
        .layer(DefaultBodyLimit::max(BODY_LIMIT));

    if metrics_on {
        api = api.layer(from_fn(middleware::metrics::metrics_middleware));
    }

    let api = api
        .layer(TraceLayer::new_for_http())
        .layer(axum::Extension(auth_config))
        .with_state(state.clone());

    let mut unauthenticated = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));

    if metrics_on {
        unauthenticated =
            unauthenticated.route("/metrics", axum::routing::get(prometheus_metrics));
    }

    let unauthenticated = unauthenticated.with_state(state);

    let router = Router::new().merge(unauthenticated).merge(api);
    match cors {
        Some(cors) => router.layer(cors),
        None => router,
    }
}

fn cors_layer(frontend_url: &str) -> Option<CorsLayer> {
    let origin = match HeaderValue::from_str(frontend_url) {
        Ok(origin) => origin,
        Err(_) => {
            tracing::warn!(frontend_url, "frontend URL is not a valid origin; CORS disabled");
            return None;
        }
    };
    Some(
        CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            .allow_credentials(true),
    )
}

/// GET /metrics: Prometheus text exposition.
async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            handle.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Liveness check: always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness check: 200 when the record store answers, 503 otherwise.
/// A missing ledger does not make the service unready; it is reported in
/// the body.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let report = state.registry.readiness().await;
    let status = if report.store_reachable {
        StatusCode::OK
    } else {
        tracing::warn!(error = ?report.store_error, "record store health check failed");
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}
