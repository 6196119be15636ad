//! # zatca-pipeline: ZATCA Compliance Pipeline
//!
//! Runs an invoice through the external compliance backend (the ZATCA
//! SDK): validate, hash, sign, then QR. The crate has three layers:
//!
//! - [`backend`]: the [`SigningBackend`] seam and its subprocess
//!   implementation, plus [`ScriptedBackend`] for tests.
//! - [`interpreter`]: turns free-form backend output into success flags
//!   and artifacts.
//! - [`pipeline`]: the state machine sequencing the stages.
//!
//! ## Crate Policy
//!
//! - Stage failures are returned inside [`PipelineRun`], never as panics.
//! - Each stage owns a temporary file that is deleted on every exit path.
//! - A stage that exceeds its timeout has its backend process killed.

#![deny(missing_docs)]

pub mod backend;
pub mod config;
pub mod error;
pub mod interpreter;
pub mod pipeline;
pub mod scripted;
pub mod stage;

pub use backend::{BackendOutput, ProcessBackend, SigningBackend, StageInvocation};
pub use config::{BackendConfig, DEFAULT_TIMEOUT_SECS};
pub use error::{BackendError, BackendUnavailableError, ConfigError, PipelineStageError};
pub use interpreter::{extract_artifact, stage_succeeded, validation_passed, VALIDATION_PASSED_MARKER};
pub use pipeline::{Pipeline, PipelineResult, PipelineRun};
pub use scripted::{ScriptedBackend, ScriptedResponse};
pub use stage::{PipelineState, Stage};
