//! # QR Subcommand
//!
//! Encode the five Phase-1 fields into a Base64 TLV payload, decode a
//! payload back into its fields, or render a payload as a PNG.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose;
use base64::Engine;
use clap::{Args, Subcommand};
use zatca_core::{decode_zatca_qr_code, generate_zatca_qr_code, render_qr_image, QrParams};

const DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Arguments for the `zatca qr` subcommand.
#[derive(Args, Debug)]
pub struct QrArgs {
    #[command(subcommand)]
    pub command: QrCommand,
}

/// QR subcommands.
#[derive(Subcommand, Debug)]
pub enum QrCommand {
    /// Encode seller and invoice fields as a Base64 TLV payload.
    Encode {
        /// Seller legal name.
        #[arg(long)]
        seller_name: String,
        /// Seller VAT registration number (15 digits).
        #[arg(long)]
        vat_number: String,
        /// Invoice timestamp, ISO 8601 UTC (e.g. 2023-01-01T00:00:00Z).
        #[arg(long)]
        timestamp: String,
        /// Invoice total including VAT, 2 decimal places.
        #[arg(long)]
        total: String,
        /// VAT total, 2 decimal places.
        #[arg(long)]
        vat: String,
        /// Also write a PNG of the code here.
        #[arg(long, value_name = "FILE")]
        png: Option<PathBuf>,
        /// PNG edge length in pixels.
        #[arg(long, default_value_t = 256)]
        size: u32,
    },

    /// Decode a Base64 TLV payload and print its fields as JSON.
    Decode {
        /// The payload.
        #[arg(value_name = "PAYLOAD")]
        payload: String,
    },

    /// Render a payload as a PNG file.
    Render {
        /// The payload.
        #[arg(value_name = "PAYLOAD")]
        payload: String,
        /// Output PNG path.
        #[arg(long, short, value_name = "FILE")]
        output: PathBuf,
        /// PNG edge length in pixels.
        #[arg(long, default_value_t = 256)]
        size: u32,
    },
}

/// Execute the qr subcommand.
pub fn run_qr(args: &QrArgs) -> Result<u8> {
    match &args.command {
        QrCommand::Encode {
            seller_name,
            vat_number,
            timestamp,
            total,
            vat,
            png,
            size,
        } => {
            let params = QrParams {
                seller_name: seller_name.clone(),
                vat_number: vat_number.clone(),
                timestamp: timestamp.clone(),
                invoice_total: total.clone(),
                vat_amount: vat.clone(),
            };
            let payload = generate_zatca_qr_code(&params).context("QR encoding failed")?;
            if let Some(path) = png {
                write_png(&payload, *size, path)?;
            }
            println!("{payload}");
            Ok(0)
        }
        QrCommand::Decode { payload } => {
            let params = decode_zatca_qr_code(payload.trim()).context("QR decoding failed")?;
            println!("{}", serde_json::to_string_pretty(&params)?);
            Ok(0)
        }
        QrCommand::Render {
            payload,
            output,
            size,
        } => {
            write_png(payload.trim(), *size, output)?;
            println!("OK: wrote {}", output.display());
            Ok(0)
        }
    }
}

/// Render `payload` and write the PNG bytes to `path`.
pub fn write_png(payload: &str, size: u32, path: &Path) -> Result<()> {
    if size == 0 {
        bail!("--size must be greater than zero");
    }
    let url = render_qr_image(payload, size).context("QR rendering failed")?;
    let Some(encoded) = url.strip_prefix(DATA_URL_PREFIX) else {
        bail!("renderer returned an unexpected data URL");
    };
    let bytes = general_purpose::STANDARD
        .decode(encoded)
        .context("renderer returned invalid Base64")?;
    std::fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str =
        "AQRTaG9wAg8zMTAxMjIzOTM1MDAwMDMDFDIwMjMtMDEtMDFUMDA6MDA6MDBaBAYxMTUuMDAFBTE1LjAw";

    #[test]
    fn render_writes_a_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qr.png");
        write_png(PAYLOAD, 128, &path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn zero_size_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(write_png(PAYLOAD, 0, &dir.path().join("qr.png")).is_err());
    }

    #[test]
    fn encode_rejects_bad_vat_number() {
        let args = QrArgs {
            command: QrCommand::Encode {
                seller_name: "Shop".into(),
                vat_number: "12345".into(),
                timestamp: "2023-01-01T00:00:00Z".into(),
                total: "115.00".into(),
                vat: "15.00".into(),
                png: None,
                size: 256,
            },
        };
        assert!(run_qr(&args).is_err());
    }

    #[test]
    fn decode_accepts_known_payload() {
        let args = QrArgs {
            command: QrCommand::Decode {
                payload: PAYLOAD.into(),
            },
        };
        assert_eq!(run_qr(&args).unwrap(), 0);
    }
}
