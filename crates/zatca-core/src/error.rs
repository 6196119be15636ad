//! # Error Hierarchy
//!
//! Structured error types for the invoice core, built with `thiserror`.
//! No `Box<dyn Error>`, no `.unwrap()` outside tests.
//!
//! Encoding and validation errors are raised synchronously and block
//! document construction. A partially built invoice is never returned.

use thiserror::Error;

/// Top-level error type for the invoice core.
#[derive(Error, Debug)]
pub enum ZatcaError {
    /// TLV encoding or decoding failure.
    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),

    /// Malformed input to the QR or XML builders.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Supplied counter or previous hash disagrees with the tracked chain.
    #[error("chain integrity error: {0}")]
    ChainIntegrity(#[from] ChainIntegrityError),

    /// The QR bitmap could not be produced.
    #[error("QR render error: {0}")]
    QrRender(String),
}

/// Errors raised by the TLV encoder and decoder.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    /// A field value does not fit the single-byte length prefix.
    #[error("TLV value for tag {tag} is {length} bytes (maximum 255)")]
    ValueTooLong {
        /// Tag of the offending field.
        tag: u8,
        /// UTF-8 byte length of the value.
        length: usize,
    },

    /// The buffer ended in the middle of a field.
    #[error("TLV buffer truncated at offset {offset}: {reason}")]
    Truncated {
        /// Byte offset where parsing stopped.
        offset: usize,
        /// What was expected at that offset.
        reason: String,
    },

    /// The payload is not valid standard Base64.
    #[error("invalid Base64 payload: {0}")]
    InvalidBase64(String),

    /// The decoded fields do not match the expected tag layout.
    #[error("unexpected TLV layout: expected tags {expected:?}, found {found:?}")]
    UnexpectedTags {
        /// Tags the payload must carry, in order.
        expected: Vec<u8>,
        /// Tags actually found.
        found: Vec<u8>,
    },

    /// A decoded value is not valid UTF-8.
    #[error("TLV value for tag {tag} is not valid UTF-8")]
    InvalidUtf8 {
        /// Tag of the offending field.
        tag: u8,
    },
}

/// Validation errors for invoice inputs and domain newtypes.
///
/// Each variant carries the rejected input and the expected format so that
/// callers can show a precise message without guesswork.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// VAT registration number is not exactly 15 ASCII digits.
    #[error("invalid VAT number: \"{0}\" (expected 15 digits)")]
    InvalidVatNumber(String),

    /// Amount string is not a non-negative decimal with exactly 2 places.
    #[error("invalid amount for {field}: \"{value}\" (expected digits with exactly 2 decimal places)")]
    InvalidAmountFormat {
        /// Field name.
        field: &'static str,
        /// The rejected text.
        value: String,
    },

    /// A monetary value or quantity is negative.
    #[error("negative value for {field}: {value}")]
    NegativeAmount {
        /// Field name.
        field: String,
        /// The rejected value.
        value: String,
    },

    /// Arithmetic on the supplied figures overflowed.
    #[error("arithmetic overflow computing {0}")]
    Overflow(String),

    /// VAT rate outside `0..=100` percent.
    #[error("invalid VAT rate for {field}: {value} (expected 0 to 100)")]
    InvalidVatRate {
        /// Field name.
        field: String,
        /// The rejected rate.
        value: String,
    },

    /// Quantity must be strictly positive.
    #[error("quantity must be greater than zero for line \"{line}\": {value}")]
    NonPositiveQuantity {
        /// Line item name.
        line: String,
        /// The rejected quantity.
        value: String,
    },

    /// A supplied figure disagrees with the figure derived from its inputs.
    #[error("{field} mismatch: expected {expected}, got {actual}")]
    AmountMismatch {
        /// Which figure disagrees, e.g. `line[2].subtotal` or `total`.
        field: String,
        /// The derived value.
        expected: String,
        /// The supplied value.
        actual: String,
    },

    /// Timestamp string is not valid ISO 8601 / RFC 3339.
    #[error("invalid timestamp: \"{value}\" ({reason})")]
    InvalidTimestamp {
        /// The string that failed to parse.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Currency code is not three uppercase ASCII letters.
    #[error("invalid currency code: \"{0}\" (expected ISO 4217 alpha-3)")]
    InvalidCurrency(String),

    /// Country code is not two uppercase ASCII letters.
    #[error("invalid country code: \"{0}\" (expected ISO 3166-1 alpha-2)")]
    InvalidCountryCode(String),

    /// A required text field is empty.
    #[error("{0} must not be empty")]
    EmptyField(String),

    /// The invoice has no line items.
    #[error("invoice must contain at least one line item")]
    NoLineItems,

    /// The seller has no VAT registration number.
    #[error("seller VAT number is required")]
    MissingSellerVat,

    /// A standard (B2B) invoice lacks a buyer or the buyer's VAT number.
    #[error("standard invoices require a buyer with a VAT number")]
    MissingBuyerVat,

    /// Credit and debit notes must reference the original invoice.
    #[error("{0} requires a billing reference to the original invoice")]
    MissingBillingReference(&'static str),

    /// The invoice counter value starts at 1.
    #[error("invoice counter value must be at least 1, got {0}")]
    InvalidCounterValue(u64),

    /// The previous invoice hash is empty or not Base64.
    #[error("invalid previous invoice hash: \"{0}\"")]
    InvalidPreviousHash(String),
}

/// Violations of the per-seller hash chain.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainIntegrityError {
    /// The invoice counter is not exactly one past the last recorded value.
    #[error("counter mismatch for seller {seller_id}: expected {expected}, got {actual}")]
    CounterMismatch {
        /// Seller whose chain was checked.
        seller_id: String,
        /// The next valid counter value.
        expected: u64,
        /// The counter the invoice was built with.
        actual: u64,
    },

    /// The invoice was hashed against a stale or foreign previous hash.
    #[error("previous hash mismatch for seller {seller_id} at counter {counter}: expected {expected}, got {actual}")]
    PreviousHashMismatch {
        /// Seller whose chain was checked.
        seller_id: String,
        /// Counter value of the offending invoice.
        counter: u64,
        /// The last recorded hash.
        expected: String,
        /// The previous hash the invoice carries.
        actual: String,
    },

    /// The hash to be recorded is empty or not Base64.
    #[error("invalid invoice hash for seller {seller_id}: \"{hash}\"")]
    InvalidHash {
        /// Seller whose chain was being advanced.
        seller_id: String,
        /// The rejected hash text.
        hash: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_error_value_too_long_display() {
        let err = EncodingError::ValueTooLong {
            tag: 1,
            length: 300,
        };
        let msg = format!("{err}");
        assert!(msg.contains("tag 1"));
        assert!(msg.contains("300"));
        assert!(msg.contains("255"));
    }

    #[test]
    fn zatca_error_wraps_validation() {
        let err = ZatcaError::from(ValidationError::InvalidVatNumber("12345".into()));
        let msg = format!("{err}");
        assert!(msg.contains("validation error"));
        assert!(msg.contains("12345"));
    }

    #[test]
    fn amount_mismatch_names_field() {
        let err = ValidationError::AmountMismatch {
            field: "total".into(),
            expected: "115.00".into(),
            actual: "114.00".into(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("total mismatch"));
        assert!(msg.contains("115.00"));
        assert!(msg.contains("114.00"));
    }

    #[test]
    fn chain_counter_mismatch_display() {
        let err = ChainIntegrityError::CounterMismatch {
            seller_id: "seller-1".into(),
            expected: 4,
            actual: 3,
        };
        let msg = format!("{err}");
        assert!(msg.contains("seller-1"));
        assert!(msg.contains("expected 4"));
    }

    #[test]
    fn zatca_error_wraps_chain_integrity() {
        let err = ZatcaError::from(ChainIntegrityError::InvalidHash {
            seller_id: "s".into(),
            hash: "".into(),
        });
        assert!(format!("{err}").contains("chain integrity error"));
    }
}
