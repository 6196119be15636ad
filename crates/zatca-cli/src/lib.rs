//! # zatca-cli: Command Line for ZATCA E-Invoicing
//!
//! Provides the `zatca` command.
//!
//! ## Subcommands
//!
//! - `zatca qr`: Encode, decode and render Phase-1 QR payloads.
//! - `zatca xml`: Build a chained UBL 2.1 invoice from a JSON or YAML draft.
//! - `zatca hash`: Print the invoice hash of an XML file.
//! - `zatca pipeline`: Run the compliance backend (validate or full process).
//!
//! ```bash
//! zatca qr encode --seller-name Shop --vat-number 310122393500003 \
//!     --timestamp 2023-01-01T00:00:00Z --total 115.00 --vat 15.00
//! zatca xml build invoice.yaml --chain chain.json --output invoice.xml
//! ZATCA_SDK_BIN=/opt/zatca/fatoora zatca pipeline process invoice.xml
//! ```
//!
//! Every handler returns the process exit code: 0 on success, 1 on error,
//! 2 when the backend rejected the invoice.

pub mod hash;
pub mod pipeline;
pub mod qr;
pub mod xml;

use std::path::Path;

use anyhow::{Context, Result};

/// Exit code for an invoice the backend rejected.
pub const EXIT_REJECTED: u8 = 2;

/// Read a text file with the path in the error context.
pub fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Write `contents` to `path`, or to stdout when `path` is `None`.
pub fn write_output(path: Option<&Path>, contents: &str) -> Result<()> {
    match path {
        Some(path) => std::fs::write(path, contents)
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            println!("{contents}");
            Ok(())
        }
    }
}
