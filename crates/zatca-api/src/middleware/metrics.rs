//! # Request Metrics
//!
//! Counts requests and error responses through the `metrics` facade.
//! The Prometheus recorder installed by the binary exposes them at
//! `/metrics`; without a recorder the calls are no-ops.

use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

/// Middleware that records request count, error count, and latency.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    let status = response.status();
    metrics::counter!(
        "zatca_http_requests_total",
        "method" => method.clone(),
        "status" => status.as_u16().to_string()
    )
    .increment(1);
    if status.is_server_error() || status.is_client_error() {
        metrics::counter!("zatca_http_request_errors_total", "method" => method.clone()).increment(1);
    }
    metrics::histogram!("zatca_http_request_seconds", "method" => method)
        .record(started.elapsed().as_secs_f64());

    response
}
