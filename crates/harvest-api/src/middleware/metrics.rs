//! # Request Metrics
//!
//! HTTP-level metrics recorded through the `metrics` facade. They reach
//! Prometheus only when the binary installs the exporter; otherwise every
//! call is a no-op.
//!
//! - `harvest_http_requests_total{method, path, status}`
//! - `harvest_http_request_duration_seconds{method, path}`
//! - `harvest_http_errors_total{method, path}` (5xx only)
//!
//! `path` is the matched route template, so batch identifiers do not
//! become label values.

use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;

/// Label used for requests that matched no route.
const UNMATCHED: &str = "unmatched";

fn route_label(request: &Request) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED.to_string())
}

pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = route_label(&request);
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status();
    metrics::counter!(
        "harvest_http_requests_total",
        "method" => method.clone(),
        "path" => path.clone(),
        "status" => status.as_u16().to_string()
    )
    .increment(1);
    metrics::histogram!(
        "harvest_http_request_duration_seconds",
        "method" => method.clone(),
        "path" => path.clone()
    )
    .record(start.elapsed().as_secs_f64());
    if status.is_server_error() {
        metrics::counter!("harvest_http_errors_total", "method" => method, "path" => path)
            .increment(1);
    }

    response
}
