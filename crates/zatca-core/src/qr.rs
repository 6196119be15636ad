//! # Phase-1 QR Payload
//!
//! Builds the five-field ZATCA QR payload on top of the TLV encoder and
//! renders payloads as PNG data URLs.
//!
//! Tags are fixed: 1 seller name, 2 VAT number, 3 timestamp, 4 total with
//! VAT, 5 VAT total. Field order comes from [`QrTag::ALL`], never from the
//! order of keys in the caller's input.
//!
//! Rendering is a pure transform of the Base64 text into a bitmap. It does
//! not decode or re-validate the payload.

use std::io::Cursor;

use base64::{engine::general_purpose, Engine as _};
use chrono::DateTime;
use image::{DynamicImage, ImageFormat, Luma};
use qrcode::QrCode;
use serde::{Deserialize, Serialize};

use crate::amount::{check_two_place_amount, format_amount};
use crate::error::{EncodingError, ValidationError, ZatcaError};
use crate::identity::VatNumber;
use crate::invoice::InvoiceDocument;
use crate::tlv::{decode_tlv, encode_tlv, TlvField};

/// Default edge length of a rendered QR image, in pixels.
pub const DEFAULT_QR_SIZE: u32 = 200;

/// Tags of the Phase-1 payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum QrTag {
    /// Seller legal name.
    SellerName = 1,
    /// Seller VAT registration number.
    VatNumber = 2,
    /// Invoice timestamp.
    Timestamp = 3,
    /// Invoice total including VAT.
    InvoiceTotal = 4,
    /// VAT total.
    VatAmount = 5,
}

impl QrTag {
    /// All tags in encoding order.
    pub const ALL: [QrTag; 5] = [
        QrTag::SellerName,
        QrTag::VatNumber,
        QrTag::Timestamp,
        QrTag::InvoiceTotal,
        QrTag::VatAmount,
    ];

    /// The tag byte.
    pub fn tag(self) -> u8 {
        self as u8
    }
}

/// Input to [`generate_zatca_qr_code`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrParams {
    /// Seller legal name.
    pub seller_name: String,
    /// Seller VAT number; must be 15 digits.
    pub vat_number: String,
    /// ISO 8601 timestamp, e.g. `2023-01-01T00:00:00Z`.
    pub timestamp: String,
    /// Total including VAT, exactly 2 decimal places.
    pub invoice_total: String,
    /// VAT total, exactly 2 decimal places.
    pub vat_amount: String,
}

impl QrParams {
    /// Derive the payload inputs from a built invoice.
    pub fn from_document(doc: &InvoiceDocument) -> Self {
        Self {
            seller_name: doc.seller.legal_name.clone(),
            vat_number: doc
                .seller
                .vat_number
                .as_ref()
                .map(|v| v.as_str().to_string())
                .unwrap_or_default(),
            timestamp: doc.qr_timestamp(),
            invoice_total: format_amount(doc.total),
            vat_amount: format_amount(doc.vat_amount),
        }
    }

    /// Check every field without encoding.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.seller_name.trim().is_empty() {
            return Err(ValidationError::EmptyField("sellerName".into()));
        }
        VatNumber::new(self.vat_number.clone())?;
        DateTime::parse_from_rfc3339(&self.timestamp).map_err(|e| {
            ValidationError::InvalidTimestamp {
                value: self.timestamp.clone(),
                reason: e.to_string(),
            }
        })?;
        check_two_place_amount("invoiceTotal", &self.invoice_total)?;
        check_two_place_amount("vatAmount", &self.vat_amount)?;
        Ok(())
    }

    fn value(&self, tag: QrTag) -> &str {
        match tag {
            QrTag::SellerName => &self.seller_name,
            QrTag::VatNumber => &self.vat_number,
            QrTag::Timestamp => &self.timestamp,
            QrTag::InvoiceTotal => &self.invoice_total,
            QrTag::VatAmount => &self.vat_amount,
        }
    }

    fn fields(&self) -> Vec<TlvField> {
        QrTag::ALL
            .iter()
            .map(|&tag| TlvField::new(tag.tag(), self.value(tag)))
            .collect()
    }
}

/// Build the Base64 TLV payload for the Phase-1 QR code.
///
/// # Errors
///
/// - [`ValidationError`] for a non-15-digit VAT number, an unparseable
///   timestamp, or amounts not written with exactly 2 decimals.
/// - [`EncodingError::ValueTooLong`] for a seller name over 255 bytes.
pub fn generate_zatca_qr_code(params: &QrParams) -> Result<String, ZatcaError> {
    params.validate()?;
    Ok(encode_tlv(&params.fields())?)
}

/// Decode a Phase-1 payload back into its five fields.
///
/// # Errors
///
/// Fails if the payload is not valid TLV or does not carry exactly tags
/// 1 to 5 in order.
pub fn decode_zatca_qr_code(payload: &str) -> Result<QrParams, ZatcaError> {
    let fields = decode_tlv(payload)?;
    let tags: Vec<u8> = fields.iter().map(|f| f.tag).collect();
    let expected: Vec<u8> = QrTag::ALL.iter().map(|t| t.tag()).collect();
    if tags != expected {
        return Err(EncodingError::UnexpectedTags {
            expected,
            found: tags,
        }
        .into());
    }
    let mut values = fields.into_iter().map(|f| f.value);
    let mut next = || values.next().unwrap_or_default();
    Ok(QrParams {
        seller_name: next(),
        vat_number: next(),
        timestamp: next(),
        invoice_total: next(),
        vat_amount: next(),
    })
}

/// Render a QR payload as a `data:image/png;base64,...` URL.
///
/// `size` bounds the image edge in pixels. The payload text is rendered as
/// given; it is not decoded or validated.
pub fn render_qr_image(payload: &str, size: u32) -> Result<String, ZatcaError> {
    let code = QrCode::new(payload.as_bytes())
        .map_err(|e| ZatcaError::QrRender(format!("QR encoding failed: {e}")))?;
    let bitmap = code
        .render::<Luma<u8>>()
        .max_dimensions(size, size)
        .build();

    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(bitmap)
        .write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| ZatcaError::QrRender(format!("PNG encoding failed: {e}")))?;

    Ok(format!(
        "data:image/png;base64,{}",
        general_purpose::STANDARD.encode(buf.into_inner())
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> QrParams {
        QrParams {
            seller_name: "Test Company Ltd".into(),
            vat_number: "310122393500003".into(),
            timestamp: "2023-01-01T00:00:00Z".into(),
            invoice_total: "115.00".into(),
            vat_amount: "15.00".into(),
        }
    }

    #[test]
    fn scenario_payload_is_deterministic_and_decodes() {
        let a = generate_zatca_qr_code(&scenario()).unwrap();
        let b = generate_zatca_qr_code(&scenario()).unwrap();
        assert_eq!(a, b);

        let fields = decode_tlv(&a).unwrap();
        assert_eq!(
            fields,
            vec![
                TlvField::new(1, "Test Company Ltd"),
                TlvField::new(2, "310122393500003"),
                TlvField::new(3, "2023-01-01T00:00:00Z"),
                TlvField::new(4, "115.00"),
                TlvField::new(5, "15.00"),
            ]
        );
        assert_eq!(decode_zatca_qr_code(&a).unwrap(), scenario());
    }

    #[test]
    fn scenario_payload_known_bytes() {
        let payload = generate_zatca_qr_code(&scenario()).unwrap();
        let bytes = general_purpose::STANDARD.decode(payload).unwrap();
        assert_eq!(&bytes[..2], &[1, 16]);
        assert_eq!(&bytes[2..18], b"Test Company Ltd");
        assert_eq!(&bytes[18..20], &[2, 15]);
        assert_eq!(bytes.len(), 2 + 16 + 2 + 15 + 2 + 20 + 2 + 6 + 2 + 5);
    }

    #[test]
    fn field_order_ignores_json_key_order() {
        let json = r#"{"vatAmount":"15.00","invoiceTotal":"115.00","timestamp":"2023-01-01T00:00:00Z","vatNumber":"310122393500003","sellerName":"Test Company Ltd"}"#;
        let params: QrParams = serde_json::from_str(json).unwrap();
        assert_eq!(
            generate_zatca_qr_code(&params).unwrap(),
            generate_zatca_qr_code(&scenario()).unwrap()
        );
    }

    #[test]
    fn short_vat_number_is_rejected() {
        let mut params = scenario();
        params.vat_number = "12345".into();
        let err = generate_zatca_qr_code(&params).unwrap_err();
        assert!(matches!(
            err,
            ZatcaError::Validation(ValidationError::InvalidVatNumber(ref v)) if v == "12345"
        ));
    }

    #[test]
    fn unrounded_amount_is_rejected() {
        let mut params = scenario();
        params.invoice_total = "115".into();
        assert!(matches!(
            generate_zatca_qr_code(&params),
            Err(ZatcaError::Validation(ValidationError::InvalidAmountFormat { .. }))
        ));
    }

    #[test]
    fn negative_amount_is_rejected() {
        let mut params = scenario();
        params.vat_amount = "-15.00".into();
        assert!(matches!(
            generate_zatca_qr_code(&params),
            Err(ZatcaError::Validation(ValidationError::NegativeAmount { .. }))
        ));
    }

    #[test]
    fn bad_timestamp_is_rejected() {
        let mut params = scenario();
        params.timestamp = "01/01/2023".into();
        assert!(matches!(
            generate_zatca_qr_code(&params),
            Err(ZatcaError::Validation(ValidationError::InvalidTimestamp { .. }))
        ));
    }

    #[test]
    fn oversized_seller_name_is_an_encoding_error() {
        let mut params = scenario();
        params.seller_name = "ش".repeat(200);
        assert!(matches!(
            generate_zatca_qr_code(&params),
            Err(ZatcaError::Encoding(EncodingError::ValueTooLong { tag: 1, length: 400 }))
        ));
    }

    #[test]
    fn decode_rejects_foreign_tag_layout() {
        let payload = encode_tlv(&[TlvField::new(1, "only one")]).unwrap();
        assert!(matches!(
            decode_zatca_qr_code(&payload),
            Err(ZatcaError::Encoding(EncodingError::UnexpectedTags { .. }))
        ));
    }

    #[test]
    fn renders_png_data_url() {
        let payload = generate_zatca_qr_code(&scenario()).unwrap();
        let url = render_qr_image(&payload, DEFAULT_QR_SIZE).unwrap();
        let b64 = url.strip_prefix("data:image/png;base64,").unwrap();
        let png = general_purpose::STANDARD.decode(b64).unwrap();
        assert_eq!(&png[..8], &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a]);
    }

    #[test]
    fn render_is_deterministic() {
        let a = render_qr_image("AQVoZWxsbw==", 120).unwrap();
        let b = render_qr_image("AQVoZWxsbw==", 120).unwrap();
        assert_eq!(a, b);
    }
}
