//! # Phase-1 QR API
//!
//! - **POST `/v1/zatca/qr`**: encode the five seller/invoice fields as a
//!   Base64 TLV payload, optionally rendered as a PNG data URL
//! - **POST `/v1/zatca/qr/decode`**: decode a payload back into its fields
//!
//! QR generation is independent of the compliance pipeline.

use axum::extract::rejection::JsonRejection;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use zatca_core::{decode_zatca_qr_code, generate_zatca_qr_code, render_qr_image, QrParams};

use crate::error::AppError;
use crate::extractors::{extract_json, extract_validated_json, Validate};
use crate::state::AppState;

/// Largest rendered image edge, in pixels.
pub const MAX_IMAGE_SIZE: u32 = 2048;

/// Request to build a QR payload.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QrRequest {
    /// Seller legal name.
    pub seller_name: String,
    /// Seller VAT registration number (15 digits).
    pub vat_number: String,
    /// Invoice timestamp, ISO 8601 UTC.
    pub timestamp: String,
    /// Total including VAT, 2 decimal places.
    pub invoice_total: String,
    /// VAT total, 2 decimal places.
    pub vat_amount: String,
    /// Render a PNG of roughly this edge length.
    #[serde(default)]
    pub image_size: Option<u32>,
}

impl Validate for QrRequest {
    fn validate(&self) -> Result<(), String> {
        match self.image_size {
            Some(size) if size == 0 || size > MAX_IMAGE_SIZE => Err(format!(
                "imageSize must be between 1 and {MAX_IMAGE_SIZE}, got {size}"
            )),
            _ => Ok(()),
        }
    }
}

impl QrRequest {
    fn params(&self) -> QrParams {
        QrParams {
            seller_name: self.seller_name.clone(),
            vat_number: self.vat_number.clone(),
            timestamp: self.timestamp.clone(),
            invoice_total: self.invoice_total.clone(),
            vat_amount: self.vat_amount.clone(),
        }
    }
}

/// Encoded QR payload.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QrResponse {
    /// Base64 TLV payload.
    pub qr_code: String,
    /// PNG data URL, when an image was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_image: Option<String>,
}

/// Request to decode a QR payload.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DecodeQrRequest {
    /// Base64 TLV payload.
    pub qr_code: String,
}

/// Fields carried by a QR payload.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DecodedQrResponse {
    /// Seller legal name.
    pub seller_name: String,
    /// Seller VAT registration number.
    pub vat_number: String,
    /// Invoice timestamp.
    pub timestamp: String,
    /// Total including VAT.
    pub invoice_total: String,
    /// VAT total.
    pub vat_amount: String,
}

impl From<QrParams> for DecodedQrResponse {
    fn from(p: QrParams) -> Self {
        Self {
            seller_name: p.seller_name,
            vat_number: p.vat_number,
            timestamp: p.timestamp,
            invoice_total: p.invoice_total,
            vat_amount: p.vat_amount,
        }
    }
}

/// Build the QR router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/zatca/qr", post(create_qr))
        .route("/v1/zatca/qr/decode", post(decode_qr))
}

/// POST /v1/zatca/qr: Encode a Phase-1 QR payload.
#[utoipa::path(
    post,
    path = "/v1/zatca/qr",
    request_body = QrRequest,
    responses(
        (status = 200, description = "Payload encoded", body = QrResponse),
        (status = 422, description = "Invalid field", body = crate::error::ErrorBody),
    ),
    tag = "qr"
)]
pub async fn create_qr(
    body: Result<Json<QrRequest>, JsonRejection>,
) -> Result<Json<QrResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let qr_code = generate_zatca_qr_code(&req.params())?;
    let qr_image = req
        .image_size
        .map(|size| render_qr_image(&qr_code, size))
        .transpose()?;
    Ok(Json(QrResponse { qr_code, qr_image }))
}

/// POST /v1/zatca/qr/decode: Decode a Phase-1 QR payload.
#[utoipa::path(
    post,
    path = "/v1/zatca/qr/decode",
    request_body = DecodeQrRequest,
    responses(
        (status = 200, description = "Payload decoded", body = DecodedQrResponse),
        (status = 422, description = "Malformed payload", body = crate::error::ErrorBody),
    ),
    tag = "qr"
)]
pub async fn decode_qr(
    body: Result<Json<DecodeQrRequest>, JsonRejection>,
) -> Result<Json<DecodedQrResponse>, AppError> {
    let req = extract_json(body)?;
    let params = decode_zatca_qr_code(req.qr_code.trim())?;
    Ok(Json(params.into()))
}
