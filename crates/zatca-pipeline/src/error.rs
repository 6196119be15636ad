//! # Pipeline Errors
//!
//! - [`BackendUnavailableError`]: the backend could not be launched at all.
//! - [`BackendError`]: what a [`SigningBackend`](crate::SigningBackend)
//!   reports for one invocation.
//! - [`PipelineStageError`]: why a pipeline run stopped. Carried inside the
//!   run result rather than returned as `Err`, so callers see the stage
//!   outputs collected before the failure.
//! - [`ConfigError`]: malformed backend configuration.

use std::path::PathBuf;

use thiserror::Error;

use crate::stage::Stage;

/// The signing backend could not be launched (missing binary, config or
/// permissions).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("signing backend unavailable: {reason}")]
pub struct BackendUnavailableError {
    /// What prevented the launch.
    pub reason: String,
}

impl BackendUnavailableError {
    /// Create from a reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Failure of a single backend invocation.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The backend could not be started.
    #[error(transparent)]
    Unavailable(#[from] BackendUnavailableError),

    /// The backend did not finish in time and was terminated.
    #[error("backend timed out after {elapsed_ms}ms")]
    Timeout {
        /// Time spent waiting before termination.
        elapsed_ms: u64,
    },

    /// Reading from or waiting on the backend failed.
    #[error("backend I/O error: {0}")]
    Io(String),
}

/// Why a pipeline run stopped before completing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineStageError {
    /// The validate stage output lacks the pass marker.
    #[error("validation failed: backend did not report GLOBAL VALIDATION RESULT = PASSED")]
    ValidationFailed,

    /// A later stage ran but reported failure.
    #[error("{stage} stage failed: {message}")]
    Failed {
        /// The failing stage.
        stage: Stage,
        /// Summary of the failure.
        message: String,
    },

    /// A stage exceeded the timeout and the backend was terminated.
    #[error("{stage} stage timed out after {elapsed_ms}ms")]
    Timeout {
        /// The stage that timed out.
        stage: Stage,
        /// Time spent waiting before termination.
        elapsed_ms: u64,
    },

    /// The backend could not be launched for this stage.
    #[error("{stage} stage could not start: {source}")]
    Unavailable {
        /// The stage that could not start.
        stage: Stage,
        /// Launch failure.
        #[source]
        source: BackendUnavailableError,
    },

    /// Temporary file or pipe I/O failed.
    #[error("{stage} stage I/O error: {message}")]
    Io {
        /// The affected stage.
        stage: Stage,
        /// Underlying error text.
        message: String,
    },
}

impl PipelineStageError {
    /// Wrap a backend error for `stage`.
    pub fn from_backend(stage: Stage, err: BackendError) -> Self {
        match err {
            BackendError::Unavailable(source) => Self::Unavailable { stage, source },
            BackendError::Timeout { elapsed_ms } => Self::Timeout { stage, elapsed_ms },
            BackendError::Io(message) => Self::Io { stage, message },
        }
    }

    /// The stage at which the run stopped.
    pub fn stage(&self) -> Stage {
        match self {
            Self::ValidationFailed => Stage::Validate,
            Self::Failed { stage, .. }
            | Self::Timeout { stage, .. }
            | Self::Unavailable { stage, .. }
            | Self::Io { stage, .. } => *stage,
        }
    }

    /// Whether the run stopped on a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Whether the run stopped because the backend could not start.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::Failed { .. } => "STAGE_FAILED",
            Self::Timeout { .. } => "STAGE_TIMEOUT",
            Self::Unavailable { .. } => "BACKEND_UNAVAILABLE",
            Self::Io { .. } => "STAGE_IO_ERROR",
        }
    }
}

/// Backend configuration errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `ZATCA_SDK_TIMEOUT_SECS` is not an integer.
    #[error("ZATCA_SDK_TIMEOUT_SECS must be a whole number of seconds, got \"{0}\"")]
    InvalidTimeout(String),

    /// `ZATCA_SDK_TIMEOUT_SECS` is zero.
    #[error("ZATCA_SDK_TIMEOUT_SECS must be greater than zero")]
    ZeroTimeout,

    /// `ZATCA_SDK_CONFIG` names a file that does not exist.
    #[error("backend config file not found: {}", .0.display())]
    MissingConfigFile(PathBuf),

    /// `ZATCA_SDK_WORKDIR` names something that is not a directory.
    #[error("backend working directory not found: {}", .0.display())]
    MissingWorkDir(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_errors_keep_the_stage() {
        let err = PipelineStageError::from_backend(Stage::Sign, BackendError::Timeout { elapsed_ms: 60_000 });
        assert_eq!(err.stage(), Stage::Sign);
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "SIGN stage timed out after 60000ms");

        let err = PipelineStageError::from_backend(
            Stage::Validate,
            BackendUnavailableError::new("no such file").into(),
        );
        assert!(err.is_unavailable());
        assert_eq!(err.code(), "BACKEND_UNAVAILABLE");
    }

    #[test]
    fn validation_failure_is_distinct_from_timeout() {
        let failed = PipelineStageError::ValidationFailed;
        let timed_out = PipelineStageError::Timeout {
            stage: Stage::Validate,
            elapsed_ms: 5,
        };
        assert_eq!(failed.stage(), timed_out.stage());
        assert_ne!(failed.code(), timed_out.code());
        assert!(failed.to_string().contains("validation failed"));
    }
}
