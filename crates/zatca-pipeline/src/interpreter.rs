//! # Result Interpreter
//!
//! The only place that knows the backend's output format. Success markers
//! and artifact patterns live here so a backend upgrade touches one file.
//!
//! An artifact that cannot be found is `None`, not an error. Callers check
//! both the stage's success flag and the artifact.

use std::sync::OnceLock;

use regex::Regex;

use crate::backend::BackendOutput;
use crate::stage::Stage;

/// Text the validate stage must print for the invoice to pass.
pub const VALIDATION_PASSED_MARKER: &str = "GLOBAL VALIDATION RESULT = PASSED";

// Hashes and signatures are Base64 runs of at least 16 characters; status
// words such as "hash: computing" are not artifacts.
const HASH_PATTERN: &str = r"(?i)\bhash\s*[:=]\s*([A-Za-z0-9+/]{16,}={0,2})(?:\s|$)";
const SIGNATURE_PATTERN: &str =
    r"(?i)\bsignature(?:\s*value)?\s*[:=]\s*([A-Za-z0-9+/]{16,}={0,2})(?:\s|$)";
const QR_PATTERN: &str = r"(?i)\bqr(?:\s*code)?\s*[:=]\s*([A-Za-z0-9+/]+={0,2})";
const ERROR_PATTERN: &str = r"(?m)^\s*(?:\[ERROR\]|ERROR\s*:)|Exception\b";

static HASH_RE: OnceLock<Option<Regex>> = OnceLock::new();
static SIGNATURE_RE: OnceLock<Option<Regex>> = OnceLock::new();
static QR_RE: OnceLock<Option<Regex>> = OnceLock::new();
static ERROR_RE: OnceLock<Option<Regex>> = OnceLock::new();

fn compiled(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

/// Whether the validate stage output carries the pass marker.
pub fn validation_passed(raw: &str) -> bool {
    raw.contains(VALIDATION_PASSED_MARKER)
}

/// Whether the output reports an error line or exception.
pub fn has_error_marker(raw: &str) -> bool {
    compiled(&ERROR_RE, ERROR_PATTERN).is_some_and(|re| re.is_match(raw))
}

/// Decide whether a stage succeeded.
///
/// The validate stage passes only on the marker; the exit code is ignored.
/// Other stages pass when the process exits 0 without an error marker.
pub fn stage_succeeded(stage: Stage, output: &BackendOutput) -> bool {
    let raw = output.combined();
    match stage {
        Stage::Validate => validation_passed(&raw),
        Stage::Hash | Stage::Sign | Stage::Qr => output.exited_ok() && !has_error_marker(&raw),
    }
}

/// Pull the stage's artifact out of free-form output.
///
/// Hash stage: the invoice hash. Sign stage: the signature value. QR stage:
/// the QR payload. Validate stage has none.
pub fn extract_artifact(stage: Stage, raw: &str) -> Option<String> {
    let re = match stage {
        Stage::Validate => return None,
        Stage::Hash => compiled(&HASH_RE, HASH_PATTERN)?,
        Stage::Sign => compiled(&SIGNATURE_RE, SIGNATURE_PATTERN)?,
        Stage::Qr => compiled(&QR_RE, QR_PATTERN)?,
    };
    re.captures_iter(raw)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .last()
}
