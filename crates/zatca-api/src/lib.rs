//! # zatca-api: Axum API for ZATCA E-Invoicing
//!
//! ## API Surface
//!
//! | Prefix | Module | Domain |
//! |--------|--------|--------|
//! | `/v1/zatca/validate`, `/v1/zatca/process` | [`routes::compliance`] | Compliance pipeline |
//! | `/v1/zatca/invoices` | [`routes::invoices`] | Chained invoice builder |
//! | `/v1/zatca/chains/*` | [`routes::chains`] | Hash-chain state |
//! | `/v1/zatca/qr*` | [`routes::qr`] | Phase-1 QR |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → Handler
//! ```
//!
//! Health probes and `/metrics` sit outside both layers.
//!
//! ## OpenAPI
//!
//! Generated via utoipa derive macros at `/openapi.json`.

pub mod config;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::compliance::router())
        .merge(routes::invoices::router())
        .merge(routes::chains::router())
        .merge(routes::qr::router())
        .merge(openapi::router())
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http());

    let ops = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .route("/metrics", get(metrics_endpoint));

    Router::new().merge(ops).merge(api).with_state(state)
}

/// Liveness probe: always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: returns 200 when the application is ready to serve.
async fn readiness() -> &'static str {
    "ready"
}

/// Prometheus exposition of everything recorded through `metrics`.
async fn metrics_endpoint(State(state): State<AppState>) -> Response {
    match state.metrics() {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics recorder not installed").into_response(),
    }
}
