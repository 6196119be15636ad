//! # zatca-ubl: Canonical UBL 2.1 Invoice XML
//!
//! Turns a validated [`zatca_core::InvoiceDocument`] into the exact UBL 2.1
//! XML the ZATCA compliance SDK accepts.
//!
//! ## Guarantees
//!
//! - **Fixed element order.** The schema validator is order-sensitive, so
//!   the builder writes elements in one hard-coded sequence.
//! - **Byte determinism.** Same document in, same bytes out. The invoice
//!   hash (and therefore the next invoice's PIH) depends on it.
//! - **Unsigned output.** The `ext:UBLExtensions` block carries placeholder
//!   tokens; the external signing stage fills them in.
//!
//! ## Crate Policy
//!
//! - Depends only on `zatca-core`.
//! - Never returns a partially built document.

#![deny(missing_docs)]

pub mod builder;
pub mod signature;
pub mod writer;

pub use builder::{build_invoice_xml, PROFILE_ID, UBL_VERSION};
pub use signature::{has_placeholders, PLACEHOLDERS, PLACEHOLDER_DIGEST_VALUE};
pub use writer::{xml_escape, XmlWriter};
