//! # Invoice Digest
//!
//! SHA-256 digests of built invoice XML, rendered as Base64 for the
//! previous-invoice-hash (PIH) chain and as hex for diagnostics.
//!
//! ## Security Invariant
//!
//! The digest is computed over the exact bytes the UBL builder returned.
//! Any re-serialization between building and hashing would break the chain,
//! so [`invoice_hash`] takes the XML text as-is.

use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Previous-invoice-hash used for the first invoice in a seller's chain.
///
/// Base64 of the lowercase hex SHA-256 digest of the string `"0"`, as
/// published for ZATCA onboarding. Deployments may override it through
/// configuration.
pub const GENESIS_PREVIOUS_HASH: &str =
    "NWZlY2ViNjZmZmM4NmYzOGQ5NTI3ODZjNmQ2OTZjNzljMmRiYzIzOWRkNGU5MWI0NjcyOWQ3M2EyN2ZiNTdlOQ==";

/// A SHA-256 digest of an invoice document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvoiceDigest {
    /// The raw 32-byte digest value.
    pub bytes: [u8; 32],
}

impl InvoiceDigest {
    /// Render the digest as standard Base64 (the PIH form).
    pub fn to_base64(&self) -> String {
        general_purpose::STANDARD.encode(self.bytes)
    }

    /// Render the digest as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.bytes.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl std::fmt::Display for InvoiceDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_base64())
    }
}

/// Compute the SHA-256 digest of built invoice XML.
pub fn invoice_digest(xml: &str) -> InvoiceDigest {
    let mut hasher = Sha256::new();
    hasher.update(xml.as_bytes());
    let result = hasher.finalize();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&result);
    InvoiceDigest { bytes }
}

/// Base64 SHA-256 hash of built invoice XML, suitable as the next PIH.
pub fn invoice_hash(xml: &str) -> String {
    invoice_digest(xml).to_base64()
}

/// Compute SHA-256 of arbitrary bytes, returned as a lowercase hex string.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Whether `value` is non-empty standard Base64.
pub fn is_base64(value: &str) -> bool {
    !value.is_empty() && general_purpose::STANDARD.decode(value).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_known_vector() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn genesis_hash_is_base64_of_hex_digest_of_zero() {
        let hex = sha256_hex(b"0");
        assert_eq!(
            hex,
            "5feceb66ffc86f38d952786c6d696c79c2dbc239dd4e91b46729d73a27fb57e9"
        );
        assert_eq!(general_purpose::STANDARD.encode(hex), GENESIS_PREVIOUS_HASH);
    }

    #[test]
    fn invoice_hash_is_base64_of_raw_digest() {
        let xml = "<Invoice/>";
        let digest = invoice_digest(xml);
        let decoded = general_purpose::STANDARD.decode(invoice_hash(xml)).unwrap();
        assert_eq!(decoded, digest.bytes.to_vec());
        assert_eq!(digest.to_hex(), sha256_hex(xml.as_bytes()));
        assert_eq!(digest.to_string(), digest.to_base64());
    }

    #[test]
    fn invoice_hash_is_sensitive_to_whitespace() {
        assert_ne!(invoice_hash("<a/>"), invoice_hash("<a/>\n"));
    }

    #[test]
    fn base64_check() {
        assert!(is_base64(GENESIS_PREVIOUS_HASH));
        assert!(!is_base64(""));
        assert!(!is_base64("not base64!"));
    }
}
