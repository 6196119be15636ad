//! # OpenAPI Specification Assembly
//!
//! Assembles the utoipa-documented routes into one OpenAPI 3.1 document,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// OpenAPI document for the whole API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "ZATCA E-Invoicing API",
        version = "0.1.0",
        description = "Compliance pipeline, chained UBL invoice builder, Phase-1 QR codes and per-seller hash chains for ZATCA e-invoicing.",
        license(name = "AGPL-3.0-or-later")
    ),
    paths(
        crate::routes::compliance::validate_invoice,
        crate::routes::compliance::process_invoice,
        crate::routes::invoices::create_invoice,
        crate::routes::chains::get_chain,
        crate::routes::chains::load_chain,
        crate::routes::qr::create_qr,
        crate::routes::qr::decode_qr,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::compliance::XmlRequest,
        crate::routes::compliance::ValidateResponse,
        crate::routes::compliance::ProcessResponse,
        crate::routes::invoices::CreateInvoiceRequest,
        crate::routes::invoices::InvoiceResponse,
        crate::routes::chains::ChainResponse,
        crate::routes::chains::LoadChainRequest,
        crate::routes::qr::QrRequest,
        crate::routes::qr::QrResponse,
        crate::routes::qr::DecodeQrRequest,
        crate::routes::qr::DecodedQrResponse,
    )),
    tags(
        (name = "compliance", description = "Validate, hash, sign and QR through the compliance backend"),
        (name = "invoices", description = "Chained UBL 2.1 invoice builder"),
        (name = "chains", description = "Per-seller invoice hash chains"),
        (name = "qr", description = "Phase-1 TLV QR payloads"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json: Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/v1/zatca/validate",
            "/v1/zatca/process",
            "/v1/zatca/invoices",
            "/v1/zatca/chains/{seller_id}",
            "/v1/zatca/qr",
            "/v1/zatca/qr/decode",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
