//! # zatca-core: Foundational Types for ZATCA E-Invoicing
//!
//! This crate defines the invoice data model and the pure building blocks
//! every other crate in the workspace relies on. It performs no I/O and
//! owns no durable storage: callers supply records and receive values.
//!
//! ## Key Design Principles
//!
//! 1. **Validated newtypes.** A [`VatNumber`] is 15 ASCII digits or it does
//!    not exist.
//!
//! 2. **Decimal money.** Every amount is a `rust_decimal::Decimal`, rounded
//!    once and rendered with a fixed scale (2 for money, 6 for quantities).
//!
//! 3. **Reject, never correct.** Line and document figures that disagree
//!    with their inputs fail validation instead of being recomputed.
//!
//! 4. **Deterministic encodings.** TLV payloads and invoice digests are
//!    byte-stable for identical input, which the hash chain depends on.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `zatca-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

#![deny(missing_docs)]

pub mod amount;
pub mod chain;
pub mod digest;
pub mod error;
pub mod identity;
pub mod invoice;
pub mod qr;
pub mod tlv;

// Re-export primary types for ergonomic imports.
pub use amount::{format_amount, format_percent, format_quantity, round_money};
pub use chain::{verify_chain, ChainLink, ChainState, HashChainTracker};
pub use digest::{invoice_digest, invoice_hash, InvoiceDigest, GENESIS_PREVIOUS_HASH};
pub use error::{ChainIntegrityError, EncodingError, ValidationError, ZatcaError};
pub use identity::{IdScheme, PartyIdentifier, VatNumber};
pub use invoice::{
    Address, BillingReference, DocumentKind, InvoiceDocument, InvoiceDraft, InvoiceTotals,
    InvoiceType, LineDraft, LineItem, PartyInfo, PaymentMeans, TaxCategory, TaxSubtotal,
};
pub use qr::{decode_zatca_qr_code, generate_zatca_qr_code, render_qr_image, QrParams, QrTag};
pub use tlv::{decode_tlv, encode_tlv, TlvField};
