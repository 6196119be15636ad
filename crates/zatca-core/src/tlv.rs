//! # TLV Encoding
//!
//! ZATCA Tag-Length-Value encoding. Each field is one tag byte, one length
//! byte holding the UTF-8 byte length of the value, then the value bytes.
//! Fields are concatenated in the given order with no separators and the
//! whole buffer is Base64-encoded.
//!
//! A single length byte caps every value at 255 bytes. Longer values are
//! rejected with [`EncodingError::ValueTooLong`]; they are never truncated,
//! because a truncated seller name would still scan and silently misreport.

use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};

use crate::error::EncodingError;

/// Largest value, in UTF-8 bytes, a single TLV field can carry.
pub const MAX_VALUE_LEN: usize = u8::MAX as usize;

/// One tagged field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlvField {
    /// Tag number.
    pub tag: u8,
    /// Field value.
    pub value: String,
}

impl TlvField {
    /// Create a field.
    pub fn new(tag: u8, value: impl Into<String>) -> Self {
        Self {
            tag,
            value: value.into(),
        }
    }
}

/// Encode fields into the raw TLV byte buffer.
pub fn encode_tlv_bytes(fields: &[TlvField]) -> Result<Vec<u8>, EncodingError> {
    let capacity = fields.iter().map(|f| 2 + f.value.len()).sum();
    let mut buf = Vec::with_capacity(capacity);
    for field in fields {
        let value = field.value.as_bytes();
        let length = u8::try_from(value.len()).map_err(|_| EncodingError::ValueTooLong {
            tag: field.tag,
            length: value.len(),
        })?;
        buf.push(field.tag);
        buf.push(length);
        buf.extend_from_slice(value);
    }
    Ok(buf)
}

/// Encode fields in order and Base64 the result.
///
/// # Errors
///
/// Returns [`EncodingError::ValueTooLong`] if any value exceeds
/// [`MAX_VALUE_LEN`] bytes.
pub fn encode_tlv(fields: &[TlvField]) -> Result<String, EncodingError> {
    encode_tlv_bytes(fields).map(|bytes| general_purpose::STANDARD.encode(bytes))
}

/// Parse a raw TLV buffer back into fields.
pub fn decode_tlv_bytes(bytes: &[u8]) -> Result<Vec<TlvField>, EncodingError> {
    let mut fields = Vec::new();
    let mut offset = 0;
    while offset < bytes.len() {
        let tag = bytes[offset];
        let length = *bytes.get(offset + 1).ok_or_else(|| EncodingError::Truncated {
            offset: offset + 1,
            reason: format!("missing length byte for tag {tag}"),
        })? as usize;
        let start = offset + 2;
        let end = start + length;
        let raw = bytes.get(start..end).ok_or_else(|| EncodingError::Truncated {
            offset: start,
            reason: format!("tag {tag} declares {length} bytes, {} remain", bytes.len() - start),
        })?;
        let value = std::str::from_utf8(raw).map_err(|_| EncodingError::InvalidUtf8 { tag })?;
        fields.push(TlvField::new(tag, value));
        offset = end;
    }
    Ok(fields)
}

/// Decode a Base64 TLV payload back into fields.
pub fn decode_tlv(payload: &str) -> Result<Vec<TlvField>, EncodingError> {
    let bytes = general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| EncodingError::InvalidBase64(e.to_string()))?;
    decode_tlv_bytes(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn encodes_tag_length_value() {
        let bytes = encode_tlv_bytes(&[TlvField::new(1, "AB"), TlvField::new(2, "")]).unwrap();
        assert_eq!(bytes, vec![1, 2, b'A', b'B', 2, 0]);
    }

    #[test]
    fn length_counts_utf8_bytes_not_chars() {
        // "شركة" is 4 Arabic letters, 8 bytes in UTF-8.
        let bytes = encode_tlv_bytes(&[TlvField::new(1, "شركة")]).unwrap();
        assert_eq!(bytes[1], 8);
        assert_eq!(bytes.len(), 10);
    }

    #[test]
    fn accepts_exactly_255_bytes() {
        let value = "x".repeat(MAX_VALUE_LEN);
        let bytes = encode_tlv_bytes(&[TlvField::new(1, value)]).unwrap();
        assert_eq!(bytes[1], 255);
    }

    #[test]
    fn rejects_256_bytes() {
        let value = "x".repeat(256);
        let err = encode_tlv(&[TlvField::new(3, value)]).unwrap_err();
        assert_eq!(err, EncodingError::ValueTooLong { tag: 3, length: 256 });
    }

    #[test]
    fn rejects_long_arabic_name_by_bytes() {
        // 128 two-byte characters: 128 chars, 256 bytes.
        let value = "ش".repeat(128);
        assert!(matches!(
            encode_tlv(&[TlvField::new(1, value)]),
            Err(EncodingError::ValueTooLong { length: 256, .. })
        ));
    }

    #[test]
    fn encoding_is_deterministic() {
        let fields = vec![TlvField::new(1, "Seller"), TlvField::new(2, "310122393500003")];
        assert_eq!(encode_tlv(&fields).unwrap(), encode_tlv(&fields).unwrap());
    }

    #[test]
    fn decode_rejects_truncated_value() {
        let err = decode_tlv_bytes(&[1, 5, b'a', b'b']).unwrap_err();
        assert!(matches!(err, EncodingError::Truncated { offset: 2, .. }));
    }

    #[test]
    fn decode_rejects_missing_length() {
        let err = decode_tlv_bytes(&[1, 1, b'a', 2]).unwrap_err();
        assert!(matches!(err, EncodingError::Truncated { offset: 4, .. }));
    }

    #[test]
    fn decode_rejects_invalid_utf8() {
        let err = decode_tlv_bytes(&[4, 1, 0xff]).unwrap_err();
        assert_eq!(err, EncodingError::InvalidUtf8 { tag: 4 });
    }

    #[test]
    fn decode_rejects_bad_base64() {
        assert!(matches!(
            decode_tlv("%%%"),
            Err(EncodingError::InvalidBase64(_))
        ));
    }

    #[test]
    fn empty_payload_decodes_to_no_fields() {
        assert!(decode_tlv("").unwrap().is_empty());
    }

    fn field_strategy() -> impl Strategy<Value = TlvField> {
        (any::<u8>(), "\\PC{0,60}").prop_map(|(tag, value)| TlvField::new(tag, value))
    }

    proptest! {
        #[test]
        fn round_trip(fields in prop::collection::vec(field_strategy(), 0..8)) {
            let encoded = encode_tlv(&fields).unwrap();
            prop_assert_eq!(decode_tlv(&encoded).unwrap(), fields);
        }

        #[test]
        fn oversized_values_always_fail(extra in 1usize..200) {
            let value = "a".repeat(MAX_VALUE_LEN + extra);
            prop_assert!(encode_tlv(&[TlvField::new(1, value)]).is_err());
        }
    }
}
