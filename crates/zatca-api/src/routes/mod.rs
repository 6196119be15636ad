//! # API Route Modules
//!
//! - `compliance`: validate and process invoices through the backend pipeline.
//! - `invoices`: build chained invoice XML from a draft.
//! - `chains`: read and seed per-seller hash chains.
//! - `qr`: encode and decode Phase-1 QR payloads.

pub mod chains;
pub mod compliance;
pub mod invoices;
pub mod qr;
