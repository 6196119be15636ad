//! # zatca CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use zatca_cli::hash::{run_hash, HashArgs};
use zatca_cli::pipeline::{run_pipeline, PipelineArgs};
use zatca_cli::qr::{run_qr, QrArgs};
use zatca_cli::xml::{run_xml, XmlArgs};

/// ZATCA e-invoicing toolkit.
///
/// Builds chained UBL 2.1 invoices, encodes Phase-1 QR payloads, and drives
/// the external compliance backend.
#[derive(Parser, Debug)]
#[command(name = "zatca", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Phase-1 QR payloads (encode, decode, render).
    Qr(QrArgs),

    /// UBL 2.1 invoice documents.
    Xml(XmlArgs),

    /// Print the Base64 SHA-256 invoice hash of an XML file.
    Hash(HashArgs),

    /// Run an invoice through the compliance backend.
    Pipeline(PipelineArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Qr(args) => run_qr(&args),
        Commands::Xml(args) => run_xml(&args),
        Commands::Hash(args) => run_hash(&args),
        Commands::Pipeline(args) => run_pipeline(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
