//! # Hash Subcommand
//!
//! Prints the invoice hash (Base64 of the SHA-256 digest) of an XML file,
//! exactly as the hash chain records it.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use zatca_core::invoice_digest;

/// Arguments for the `zatca hash` subcommand.
#[derive(Args, Debug)]
pub struct HashArgs {
    /// Invoice XML file.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Print the hex digest instead of Base64.
    #[arg(long)]
    pub hex: bool,
}

/// Execute the hash subcommand.
pub fn run_hash(args: &HashArgs) -> Result<u8> {
    let xml = crate::read_text(&args.file)?;
    let digest = invoice_digest(&xml);
    if args.hex {
        println!("{}", digest.to_hex());
    } else {
        println!("{}", digest.to_base64());
    }
    Ok(0)
}
