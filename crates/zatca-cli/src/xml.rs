//! # XML Subcommand
//!
//! Builds a UBL 2.1 invoice from a draft file. Drafts are JSON or YAML
//! (chosen by extension) in the same camelCase shape the API accepts.
//!
//! ## Chain position
//!
//! With `--chain FILE` the command reads the seller's last counter and hash
//! from that JSON file (genesis when it does not exist yet), builds the
//! invoice as the next link, and writes the advanced head back. Without it
//! the position comes from `--counter` and `--previous-hash`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use zatca_core::{invoice_hash, ChainLink, ChainState, InvoiceDraft, GENESIS_PREVIOUS_HASH};
use zatca_ubl::build_invoice_xml;

/// Arguments for the `zatca xml` subcommand.
#[derive(Args, Debug)]
pub struct XmlArgs {
    #[command(subcommand)]
    pub command: XmlCommand,
}

/// XML subcommands.
#[derive(Subcommand, Debug)]
pub enum XmlCommand {
    /// Build invoice XML from a JSON or YAML draft.
    Build(BuildArgs),
}

/// Arguments for `zatca xml build`.
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Invoice draft (`.json`, `.yaml` or `.yml`).
    #[arg(value_name = "DRAFT")]
    pub draft: PathBuf,

    /// Chain head file, read before and updated after the build.
    #[arg(long, value_name = "FILE", conflicts_with_all = ["counter", "previous_hash"])]
    pub chain: Option<PathBuf>,

    /// Invoice counter value.
    #[arg(long, default_value_t = 1)]
    pub counter: u64,

    /// Previous invoice hash (defaults to the genesis hash).
    #[arg(long)]
    pub previous_hash: Option<String>,

    /// Write the XML here instead of stdout.
    #[arg(long, short, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Execute the xml subcommand.
pub fn run_xml(args: &XmlArgs) -> Result<u8> {
    match &args.command {
        XmlCommand::Build(build) => cmd_build(build),
    }
}

fn cmd_build(args: &BuildArgs) -> Result<u8> {
    let draft = load_draft(&args.draft)?;
    let head = match &args.chain {
        Some(path) => Some(load_chain(path)?),
        None => None,
    };
    let link = match &head {
        Some(state) => state.next_link(),
        None => ChainLink {
            invoice_counter_value: args.counter,
            previous_invoice_hash: args
                .previous_hash
                .clone()
                .unwrap_or_else(|| GENESIS_PREVIOUS_HASH.to_string()),
        },
    };

    let doc = draft
        .into_document(&link)
        .with_context(|| format!("invalid invoice draft {}", args.draft.display()))?;
    let xml = build_invoice_xml(&doc).context("failed to build invoice XML")?;
    let hash = invoice_hash(&xml);

    crate::write_output(args.output.as_deref(), &xml)?;

    if let (Some(path), Some(state)) = (&args.chain, head) {
        let next = state
            .advance("cli", &link, &hash)
            .context("chain head changed during build")?;
        save_chain(path, &next)?;
    }

    tracing::info!(
        invoice_number = %doc.invoice_number,
        counter = link.invoice_counter_value,
        hash = %hash,
        "invoice built"
    );
    eprintln!("invoice hash: {hash}");
    Ok(0)
}

/// Parse a draft file as YAML or JSON depending on its extension.
pub fn load_draft(path: &Path) -> Result<InvoiceDraft> {
    let content = crate::read_text(path)?;
    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));
    if is_yaml {
        serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse YAML draft: {}", path.display()))
    } else {
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse JSON draft: {}", path.display()))
    }
}

/// Read a chain head, or the genesis head when the file does not exist.
pub fn load_chain(path: &Path) -> Result<ChainState> {
    if !path.exists() {
        return Ok(ChainState::genesis());
    }
    let content = crate::read_text(path)?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse chain file: {}", path.display()))
}

fn save_chain(path: &Path, state: &ChainState) -> Result<()> {
    let json = serde_json::to_string_pretty(state)?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}
