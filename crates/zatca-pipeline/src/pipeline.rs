//! # Compliance Pipeline Orchestrator
//!
//! Drives validate → hash → sign → QR strictly in sequence against a
//! [`SigningBackend`]. A failing stage aborts the remaining ones; a failed
//! validation never reaches hashing or signing.
//!
//! ## Temporary Files
//!
//! Each stage gets its own freshly created invoice file. The file is a
//! [`tempfile::NamedTempFile`], removed when the stage returns on every
//! path, timeouts included. Concurrent runs never share a file.
//!
//! ## Failures
//!
//! Stage failures are data, not `Err`: [`Pipeline::run`] always returns a
//! [`PipelineRun`] holding the outputs collected so far and, if the run
//! stopped early, the [`PipelineStageError`] that stopped it. Nothing is
//! retried here.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tempfile::NamedTempFile;

use crate::backend::{BackendOutput, ProcessBackend, SigningBackend, StageInvocation};
use crate::config::{BackendConfig, DEFAULT_TIMEOUT_SECS};
use crate::error::PipelineStageError;
use crate::interpreter::{extract_artifact, stage_succeeded};
use crate::stage::{PipelineState, Stage};

/// Outcome of one stage invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    /// The stage.
    pub stage: Stage,
    /// Whether the interpreter judged the stage successful.
    pub success: bool,
    /// stdout and stderr of the backend.
    pub raw_output: String,
    /// Hash, signature or QR payload pulled from the output.
    pub extracted_artifact: Option<String>,
    /// Backend exit code, when the process ran to completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    /// Failure description for stages that did not succeed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Wall-clock time spent in the stage.
    pub duration_ms: u64,
}

/// A complete pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineRun {
    /// Current (final) state.
    pub state: PipelineState,
    /// Every state visited, starting with `Pending`.
    pub history: Vec<PipelineState>,
    /// One result per stage attempted, in order.
    pub results: Vec<PipelineResult>,
    /// Signed invoice read back after the sign stage.
    pub signed_xml: Option<String>,
    /// Why the run stopped early, if it did.
    pub failure: Option<PipelineStageError>,
}

impl PipelineRun {
    fn new() -> Self {
        Self {
            state: PipelineState::Pending,
            history: vec![PipelineState::Pending],
            results: Vec::with_capacity(Stage::ALL.len()),
            signed_xml: None,
            failure: None,
        }
    }

    fn transition(&mut self, next: PipelineState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        self.state = next;
        self.history.push(next);
    }

    /// Result for `stage`, if it was attempted.
    pub fn result(&self, stage: Stage) -> Option<&PipelineResult> {
        self.results.iter().find(|r| r.stage == stage)
    }

    /// Artifact extracted at `stage`.
    pub fn artifact(&self, stage: Stage) -> Option<&str> {
        self.result(stage)?.extracted_artifact.as_deref()
    }

    /// Whether the validate stage ran and passed.
    pub fn validation_passed(&self) -> bool {
        self.result(Stage::Validate).is_some_and(|r| r.success)
    }

    /// Whether every stage succeeded.
    pub fn is_complete(&self) -> bool {
        self.state == PipelineState::Complete
    }

    /// Stages that were attempted, in order.
    pub fn stages_attempted(&self) -> Vec<Stage> {
        self.results.iter().map(|r| r.stage).collect()
    }

    /// All backend output, one block per stage.
    pub fn transcript(&self) -> String {
        self.results
            .iter()
            .map(|r| format!("[{}]\n{}", r.stage, r.raw_output.trim_end()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Runs the compliance stages against a backend.
#[derive(Clone)]
pub struct Pipeline {
    backend: Arc<dyn SigningBackend>,
    timeout: Duration,
    temp_dir: Option<PathBuf>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("backend", &self.backend.backend_name())
            .field("timeout", &self.timeout)
            .field("temp_dir", &self.temp_dir)
            .finish()
    }
}

struct ExecutedStage {
    output: BackendOutput,
    file_after: Option<String>,
}

impl Pipeline {
    /// Pipeline over `backend` with the default 60 second timeout.
    pub fn new(backend: Arc<dyn SigningBackend>) -> Self {
        Self {
            backend,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            temp_dir: None,
        }
    }

    /// Subprocess pipeline for `config`.
    pub fn from_config(config: BackendConfig) -> Self {
        let timeout = config.timeout;
        let temp_dir = config.work_dir.clone();
        Self {
            backend: Arc::new(ProcessBackend::new(config)),
            timeout,
            temp_dir,
        }
    }

    /// Override the per-stage timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Create temporary invoice files in `dir` instead of the system default.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Per-stage timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Name of the backend in use.
    pub fn backend_name(&self) -> &str {
        self.backend.backend_name()
    }

    /// Run all four stages on `xml`.
    pub async fn run(&self, xml: &str) -> PipelineRun {
        self.run_stages(xml, &Stage::ALL).await
    }

    /// Run the validate stage only. Ends in `Validated` on success.
    pub async fn validate(&self, xml: &str) -> PipelineRun {
        self.run_stages(xml, &[Stage::Validate]).await
    }

    async fn run_stages(&self, xml: &str, stages: &[Stage]) -> PipelineRun {
        let mut run = PipelineRun::new();
        let mut current = xml.to_string();

        for &stage in stages {
            run.transition(stage.active_state());
            let started = Instant::now();
            let outcome = self.run_stage(stage, &current).await;
            let elapsed = started.elapsed();
            let duration_ms = elapsed.as_millis() as u64;

            let executed = match outcome {
                Ok(executed) => executed,
                Err(err) => {
                    record_stage_metrics(stage, err.code(), elapsed);
                    if err.is_timeout() {
                        tracing::warn!(%stage, timeout_ms = self.timeout.as_millis() as u64, "pipeline stage timed out");
                    } else if err.is_unavailable() {
                        tracing::error!(%stage, error = %err, "signing backend unavailable");
                    } else {
                        tracing::error!(%stage, error = %err, "pipeline stage errored");
                    }
                    run.results.push(PipelineResult {
                        stage,
                        success: false,
                        raw_output: String::new(),
                        extracted_artifact: None,
                        exit_code: None,
                        error: Some(err.to_string()),
                        duration_ms,
                    });
                    run.transition(PipelineState::Failed);
                    run.failure = Some(err);
                    return run;
                }
            };

            let success = stage_succeeded(stage, &executed.output);
            let raw_output = executed.output.combined();
            let extracted_artifact = extract_artifact(stage, &raw_output);
            record_stage_metrics(stage, if success { "success" } else { "failure" }, elapsed);
            tracing::info!(
                %stage,
                success,
                exit_code = ?executed.output.exit_code,
                duration_ms,
                artifact = extracted_artifact.is_some(),
                "pipeline stage finished"
            );

            if success && stage == Stage::Sign {
                match executed.file_after {
                    Some(signed) if !zatca_ubl::has_placeholders(&signed) => {
                        current = signed.clone();
                        run.signed_xml = Some(signed);
                    }
                    _ => tracing::warn!("sign stage left placeholders in the invoice"),
                }
            }

            let failure = (!success).then(|| match stage {
                Stage::Validate => PipelineStageError::ValidationFailed,
                _ => PipelineStageError::Failed {
                    stage,
                    message: failure_summary(&executed.output),
                },
            });

            run.results.push(PipelineResult {
                stage,
                success,
                raw_output,
                extracted_artifact,
                exit_code: executed.output.exit_code,
                error: failure.as_ref().map(ToString::to_string),
                duration_ms,
            });

            if let Some(err) = failure {
                run.transition(if stage == Stage::Validate {
                    PipelineState::ValidationFailed
                } else {
                    PipelineState::Failed
                });
                run.failure = Some(err);
                return run;
            }
            if stage == Stage::Validate {
                run.transition(PipelineState::Validated);
            }
        }

        if stages.len() > 1 {
            run.transition(PipelineState::Complete);
        }
        run
    }

    /// Write `xml` to a fresh temporary file, invoke the backend, and read
    /// the file back for the sign stage. The file is removed on return.
    async fn run_stage(&self, stage: Stage, xml: &str) -> Result<ExecutedStage, PipelineStageError> {
        let io_err = |e: std::io::Error| PipelineStageError::Io {
            stage,
            message: e.to_string(),
        };

        let mut builder = tempfile::Builder::new();
        builder.prefix("zatca-invoice-").suffix(".xml");
        let mut file: NamedTempFile = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(io_err)?;
        file.write_all(xml.as_bytes()).map_err(io_err)?;
        file.flush().map_err(io_err)?;

        let invocation = StageInvocation {
            stage,
            invoice_path: file.path().to_path_buf(),
        };
        tracing::debug!(%stage, path = %invocation.invoice_path.display(), "invoking backend");

        let output = self
            .backend
            .invoke(&invocation, self.timeout)
            .await
            .map_err(|e| PipelineStageError::from_backend(stage, e))?;

        let file_after = if stage == Stage::Sign {
            tokio::fs::read_to_string(file.path()).await.ok()
        } else {
            None
        };
        Ok(ExecutedStage { output, file_after })
    }
}

fn failure_summary(output: &BackendOutput) -> String {
    let last_line = output
        .combined()
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .map(|l| l.trim().to_string());
    match (output.exit_code, last_line) {
        (Some(code), Some(line)) => format!("exit code {code}: {line}"),
        (Some(code), None) => format!("exit code {code}"),
        (None, Some(line)) => format!("terminated: {line}"),
        (None, None) => "terminated by signal".to_string(),
    }
}

fn record_stage_metrics(stage: Stage, outcome: &'static str, elapsed: Duration) {
    metrics::counter!(
        "zatca_pipeline_stage_total",
        "stage" => stage.metric_label(),
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!("zatca_pipeline_stage_seconds", "stage" => stage.metric_label())
        .record(elapsed.as_secs_f64());
}
