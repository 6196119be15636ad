//! # Pipeline Subcommand
//!
//! Runs an invoice file through the compliance backend configured by the
//! `ZATCA_SDK_*` environment variables.
//!
//! - `zatca pipeline validate FILE` runs the validate stage only.
//! - `zatca pipeline process FILE` runs validate, hash, sign and QR.
//!
//! The backend's output is echoed per stage. Exit code 2 means the backend
//! rejected the invoice; 1 means a stage could not complete.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Subcommand};
use zatca_pipeline::{BackendConfig, Pipeline, PipelineRun, PipelineStageError, Stage};

use crate::EXIT_REJECTED;

/// Arguments for the `zatca pipeline` subcommand.
#[derive(Args, Debug)]
pub struct PipelineArgs {
    #[command(subcommand)]
    pub command: PipelineCommand,

    /// Per-stage timeout in seconds, overriding ZATCA_SDK_TIMEOUT_SECS.
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,
}

/// Pipeline subcommands.
#[derive(Subcommand, Debug)]
pub enum PipelineCommand {
    /// Run the validate stage only.
    Validate {
        /// Invoice XML file.
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Run validate, hash, sign and QR.
    Process {
        /// Invoice XML file.
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Write the signed XML here.
        #[arg(long, value_name = "FILE")]
        signed_output: Option<PathBuf>,
    },
}

/// Execute the pipeline subcommand.
pub fn run_pipeline(args: &PipelineArgs) -> Result<u8> {
    let mut config = BackendConfig::from_env()
        .context("invalid compliance backend configuration")?
        .ok_or_else(|| anyhow!("ZATCA_SDK_BIN is not set; no compliance backend to run"))?;
    if let Some(secs) = args.timeout_secs {
        if secs == 0 {
            return Err(anyhow!("--timeout-secs must be greater than zero"));
        }
        config = config.with_timeout(std::time::Duration::from_secs(secs));
    }
    let pipeline = Pipeline::from_config(config);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    match &args.command {
        PipelineCommand::Validate { file } => {
            let xml = crate::read_text(file)?;
            let run = runtime.block_on(pipeline.validate(&xml));
            report(&run);
            Ok(exit_code(&run))
        }
        PipelineCommand::Process {
            file,
            signed_output,
        } => {
            let xml = crate::read_text(file)?;
            let run = runtime.block_on(pipeline.run(&xml));
            report(&run);
            if let (Some(path), Some(signed)) = (signed_output, &run.signed_xml) {
                std::fs::write(path, signed)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                println!("signed XML: {}", path.display());
            }
            Ok(exit_code(&run))
        }
    }
}

/// Print each stage's output and the extracted artifacts.
fn report(run: &PipelineRun) {
    for result in &run.results {
        let status = if result.success { "OK" } else { "FAILED" };
        println!("== {} [{status}] ({} ms)", result.stage, result.duration_ms);
        let raw = result.raw_output.trim_end();
        if !raw.is_empty() {
            println!("{raw}");
        }
    }
    for (label, stage) in [("hash", Stage::Hash), ("signature", Stage::Sign), ("qr", Stage::Qr)] {
        if let Some(artifact) = run.artifact(stage) {
            println!("{label}: {artifact}");
        }
    }
    match &run.failure {
        None => println!("result: {}", run.state),
        Some(err) => println!("result: {} ({err})", run.state),
    }
}

/// Process exit code for a finished run.
pub fn exit_code(run: &PipelineRun) -> u8 {
    match &run.failure {
        None => 0,
        Some(PipelineStageError::ValidationFailed) => EXIT_REJECTED,
        Some(_) => 1,
    }
}
