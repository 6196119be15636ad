//! # Invoice Builder API
//!
//! **POST `/v1/zatca/invoices`** turns an invoice draft into a chained UBL
//! document: it claims the seller's next counter and previous hash, builds
//! the XML, hashes it, records the hash as the new chain head, and returns
//! the document with its Phase-1 QR payload.
//!
//! The claim and the record happen under the seller's lock, so two
//! concurrent requests for one seller get consecutive counters and the
//! second hashes against the first.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use zatca_core::{generate_zatca_qr_code, invoice_hash, render_qr_image, InvoiceDraft, QrParams};
use zatca_ubl::build_invoice_xml;

use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::routes::qr::MAX_IMAGE_SIZE;
use crate::state::{seller_key, AppState};

/// Request to build a chained invoice.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceRequest {
    /// Seller whose chain the invoice joins.
    pub seller_id: String,
    /// The invoice without totals or chain fields.
    #[schema(value_type = Object)]
    pub invoice: InvoiceDraft,
    /// Also render the QR payload as a PNG of this size.
    #[serde(default)]
    pub qr_image_size: Option<u32>,
}

impl Validate for CreateInvoiceRequest {
    fn validate(&self) -> Result<(), String> {
        if self.seller_id.trim().is_empty() {
            return Err("sellerId must not be empty".to_string());
        }
        match self.qr_image_size {
            Some(size) if size == 0 || size > MAX_IMAGE_SIZE => Err(format!(
                "qrImageSize must be between 1 and {MAX_IMAGE_SIZE}, got {size}"
            )),
            _ => Ok(()),
        }
    }
}

/// A built, chained invoice.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceResponse {
    /// Seller whose chain the invoice joined.
    pub seller_id: String,
    /// Caller's invoice number.
    pub invoice_number: String,
    /// Document UUID.
    pub uuid: Uuid,
    /// Invoice counter value (ICV).
    pub invoice_counter_value: u64,
    /// Previous invoice hash (PIH) the document carries.
    pub previous_invoice_hash: String,
    /// Base64 SHA-256 of `xml_content`; the seller's new chain head.
    pub invoice_hash: String,
    /// Phase-1 QR payload.
    pub qr_code: String,
    /// PNG data URL of the QR, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_image: Option<String>,
    /// The unsigned UBL document.
    pub xml_content: String,
}

/// Build the invoices router.
pub fn router() -> Router<AppState> {
    Router::new().route("/v1/zatca/invoices", post(create_invoice))
}

/// POST /v1/zatca/invoices: Build a chained invoice document.
#[utoipa::path(
    post,
    path = "/v1/zatca/invoices",
    request_body = CreateInvoiceRequest,
    responses(
        (status = 201, description = "Invoice built and chained", body = InvoiceResponse),
        (status = 409, description = "Chain moved underneath the request", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid invoice", body = crate::error::ErrorBody),
    ),
    tag = "invoices"
)]
pub async fn create_invoice(
    State(state): State<AppState>,
    body: Result<Json<CreateInvoiceRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<InvoiceResponse>), AppError> {
    let req = extract_validated_json(body)?;
    let seller_id = seller_key(&req.seller_id)?;
    let _guard = state.lock_seller(&seller_id).await;

    let link = state.chains.next_link(&seller_id);
    let doc = req.invoice.into_document(&link)?;
    let xml = build_invoice_xml(&doc)?;
    let hash = invoice_hash(&xml);
    let qr_code = generate_zatca_qr_code(&QrParams::from_document(&doc))?;
    let qr_image = req
        .qr_image_size
        .map(|size| render_qr_image(&qr_code, size))
        .transpose()?;

    state.chains.record_hash(&seller_id, &link, &hash)?;
    tracing::info!(
        seller_id = %seller_id,
        invoice_number = %doc.invoice_number,
        counter = link.invoice_counter_value,
        "invoice built"
    );

    Ok((
        StatusCode::CREATED,
        Json(InvoiceResponse {
            seller_id,
            invoice_number: doc.invoice_number,
            uuid: doc.uuid,
            invoice_counter_value: link.invoice_counter_value,
            previous_invoice_hash: link.previous_invoice_hash,
            invoice_hash: hash,
            qr_code,
            qr_image,
            xml_content: xml,
        }),
    ))
}
