//! # Signing Backend Interface
//!
//! The [`SigningBackend`] trait abstracts over whatever performs the
//! external validate, hash, sign and QR stages. Production uses
//! [`ProcessBackend`], which launches the vendor SDK as a subprocess;
//! tests use [`ScriptedBackend`](crate::ScriptedBackend). The orchestrator
//! only sees exit code and captured text, so it stays transport-agnostic.
//!
//! ## Invocation
//!
//! Arguments are always `[mode-flag, "-invoice", path]`. stdout and stderr
//! are captured in full. The exit code is advisory; success is decided by
//! the result interpreter.
//!
//! ## Timeout
//!
//! One deadline covers the whole stage: waiting for the child and draining
//! its pipes. When the child is still running at the deadline it is killed
//! and reaped before the call returns. When it has exited but a descendant
//! still holds stdout or stderr open, the readers are abandoned and the
//! stage reports a timeout.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use crate::config::BackendConfig;
use crate::error::{BackendError, BackendUnavailableError};
use crate::stage::Stage;

/// One stage request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageInvocation {
    /// Stage to run.
    pub stage: Stage,
    /// Invoice XML file the backend reads (and, for signing, rewrites).
    pub invoice_path: PathBuf,
}

impl StageInvocation {
    /// Backend arguments: `[mode-flag, "-invoice", path]`.
    pub fn args(&self) -> Vec<OsString> {
        vec![
            OsString::from(self.stage.mode_flag()),
            OsString::from("-invoice"),
            self.invoice_path.clone().into_os_string(),
        ]
    }
}

/// Captured result of one backend invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendOutput {
    /// Process exit code; `None` when terminated by a signal.
    pub exit_code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl BackendOutput {
    /// Successful output carrying `stdout`.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// stdout followed by stderr, for interpretation and display.
    pub fn combined(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (_, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}\n{}", self.stdout.trim_end(), self.stderr),
        }
    }

    /// Whether the process exited with status 0.
    pub fn exited_ok(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Performs backend stages.
///
/// Implementations must be `Send + Sync` so a single instance can serve
/// concurrent pipeline runs behind an `Arc`.
#[async_trait]
pub trait SigningBackend: Send + Sync {
    /// Run one stage, waiting at most `timeout`.
    ///
    /// # Errors
    ///
    /// - [`BackendError::Unavailable`] if the backend cannot be launched.
    /// - [`BackendError::Timeout`] if it did not finish in time. The
    ///   backend must be terminated before this returns.
    /// - [`BackendError::Io`] for capture failures.
    async fn invoke(
        &self,
        invocation: &StageInvocation,
        timeout: Duration,
    ) -> Result<BackendOutput, BackendError>;

    /// Human-readable backend name for logs.
    fn backend_name(&self) -> &str;
}

/// Runs the vendor SDK as a subprocess.
#[derive(Debug, Clone)]
pub struct ProcessBackend {
    config: BackendConfig,
}

impl ProcessBackend {
    /// Backend for `config`.
    pub fn new(config: BackendConfig) -> Self {
        Self { config }
    }

    /// The configuration in use.
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    fn command(&self, invocation: &StageInvocation) -> Command {
        let mut cmd = Command::new(&self.config.binary);
        cmd.args(invocation.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.config.work_dir {
            cmd.current_dir(dir);
        }
        if let Some(config_file) = &self.config.config_file {
            cmd.env("SDK_CONFIG", config_file);
        }
        cmd
    }
}

#[async_trait]
impl SigningBackend for ProcessBackend {
    async fn invoke(
        &self,
        invocation: &StageInvocation,
        timeout: Duration,
    ) -> Result<BackendOutput, BackendError> {
        let mut child = self.command(invocation).spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                BackendError::Unavailable(BackendUnavailableError::new(format!(
                    "cannot launch {}: {e}",
                    self.config.binary.display()
                )))
            }
            _ => BackendError::Io(format!("spawn failed: {e}")),
        })?;

        // Drain both pipes concurrently so a chatty backend cannot block on a full pipe.
        let mut stdout_task = tokio::spawn(read_pipe(child.stdout.take()));
        let mut stderr_task = tokio::spawn(read_pipe(child.stderr.take()));
        let started = Instant::now();
        let deadline = tokio::time::Instant::now() + timeout;

        let status = match tokio::time::timeout_at(deadline, child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                stdout_task.abort();
                stderr_task.abort();
                return Err(BackendError::Io(format!("wait failed: {e}")));
            }
            Err(_) => {
                if let Err(e) = child.kill().await {
                    tracing::warn!(stage = %invocation.stage, error = %e, "failed to kill backend");
                }
                stdout_task.abort();
                stderr_task.abort();
                return Err(BackendError::Timeout {
                    elapsed_ms: started.elapsed().as_millis() as u64,
                });
            }
        };

        // A descendant of the backend can hold the pipes open after it exits;
        // the stage deadline covers draining too.
        let drained = tokio::time::timeout_at(deadline, async {
            let stdout = (&mut stdout_task).await.unwrap_or_default();
            let stderr = (&mut stderr_task).await.unwrap_or_default();
            (stdout, stderr)
        })
        .await;

        let Ok((stdout, stderr)) = drained else {
            stdout_task.abort();
            stderr_task.abort();
            tracing::warn!(
                stage = %invocation.stage,
                exit_code = ?status.code(),
                "backend exited but its output pipes stayed open"
            );
            return Err(BackendError::Timeout {
                elapsed_ms: started.elapsed().as_millis() as u64,
            });
        };

        tracing::debug!(
            stage = %invocation.stage,
            exit_code = ?status.code(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "backend exited"
        );
        Ok(BackendOutput {
            exit_code: status.code(),
            stdout,
            stderr,
        })
    }

    fn backend_name(&self) -> &str {
        "process"
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        if let Err(e) = pipe.read_to_end(&mut buf).await {
            tracing::debug!(error = %e, "backend pipe closed early");
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}
