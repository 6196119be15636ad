//! # Stages and Pipeline States
//!
//! The four backend stages and the states a pipeline run moves through:
//!
//! ```text
//! PENDING → VALIDATING → VALIDATED → HASHING → SIGNING → QR_GENERATING → COMPLETE
//!                  ↘ VALIDATION_FAILED        any stage ↘ FAILED
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// One invocation of the external backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    /// Schema and business-rule validation.
    Validate,
    /// Invoice hash generation.
    Hash,
    /// XAdES signing.
    Sign,
    /// Phase-2 QR generation.
    Qr,
}

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Stage; 4] = [Stage::Validate, Stage::Hash, Stage::Sign, Stage::Qr];

    /// Command-line flag selecting this stage in the backend.
    pub fn mode_flag(&self) -> &'static str {
        match self {
            Self::Validate => "-validate",
            Self::Hash => "-hash",
            Self::Sign => "-sign",
            Self::Qr => "-qr",
        }
    }

    /// Upper-case name, as serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validate => "VALIDATE",
            Self::Hash => "HASH",
            Self::Sign => "SIGN",
            Self::Qr => "QR",
        }
    }

    /// Lower-case label for metrics.
    pub fn metric_label(&self) -> &'static str {
        match self {
            Self::Validate => "validate",
            Self::Hash => "hash",
            Self::Sign => "sign",
            Self::Qr => "qr",
        }
    }

    /// State the pipeline is in while this stage runs.
    pub fn active_state(&self) -> PipelineState {
        match self {
            Self::Validate => PipelineState::Validating,
            Self::Hash => PipelineState::Hashing,
            Self::Sign => PipelineState::Signing,
            Self::Qr => PipelineState::QrGenerating,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position of a pipeline run in its state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineState {
    /// Not started.
    Pending,
    /// Validate stage running.
    Validating,
    /// Validation passed.
    Validated,
    /// Validation ran and did not pass. Terminal.
    ValidationFailed,
    /// Hash stage running.
    Hashing,
    /// Sign stage running.
    Signing,
    /// QR stage running.
    QrGenerating,
    /// All stages succeeded. Terminal.
    Complete,
    /// A stage errored or timed out. Terminal.
    Failed,
}

impl PipelineState {
    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::ValidationFailed | Self::Complete | Self::Failed)
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(&self, next: PipelineState) -> bool {
        use PipelineState::*;
        matches!(
            (self, next),
            (Pending, Validating)
                | (Validating, Validated)
                | (Validating, ValidationFailed)
                | (Validating, Failed)
                | (Validated, Hashing)
                | (Hashing, Signing)
                | (Hashing, Failed)
                | (Signing, QrGenerating)
                | (Signing, Failed)
                | (QrGenerating, Complete)
                | (QrGenerating, Failed)
        )
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Validating => "VALIDATING",
            Self::Validated => "VALIDATED",
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::Hashing => "HASHING",
            Self::Signing => "SIGNING",
            Self::QrGenerating => "QR_GENERATING",
            Self::Complete => "COMPLETE",
            Self::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_flags() {
        let flags: Vec<_> = Stage::ALL.iter().map(Stage::mode_flag).collect();
        assert_eq!(flags, ["-validate", "-hash", "-sign", "-qr"]);
    }

    #[test]
    fn happy_path_transitions_are_legal() {
        let path = [
            PipelineState::Pending,
            PipelineState::Validating,
            PipelineState::Validated,
            PipelineState::Hashing,
            PipelineState::Signing,
            PipelineState::QrGenerating,
            PipelineState::Complete,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn validation_failure_cannot_continue() {
        assert!(PipelineState::ValidationFailed.is_terminal());
        assert!(!PipelineState::ValidationFailed.can_transition_to(PipelineState::Hashing));
        assert!(!PipelineState::Validating.can_transition_to(PipelineState::Hashing));
    }

    #[test]
    fn serde_uses_screaming_case() {
        assert_eq!(
            serde_json::to_string(&PipelineState::QrGenerating).unwrap(),
            "\"QR_GENERATING\""
        );
        assert_eq!(serde_json::to_string(&Stage::Qr).unwrap(), "\"QR\"");
        assert_eq!(PipelineState::ValidationFailed.to_string(), "VALIDATION_FAILED");
    }
}
