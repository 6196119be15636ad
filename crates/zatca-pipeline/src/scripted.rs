//! # Scripted Backend
//!
//! An in-process [`SigningBackend`] for tests and local development. Each
//! stage answers with a canned [`ScriptedResponse`]; the default behaves
//! like a healthy SDK:
//!
//! - validate prints the pass marker
//! - hash prints `INVOICE HASH = <Base64 SHA-256 of the file>`
//! - sign replaces every placeholder token in the file
//! - qr prints `QR code = <Base64>` for the signed file
//!
//! Every invocation is recorded so tests can assert which stages ran.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use zatca_core::invoice_hash;
use zatca_ubl::PLACEHOLDERS;

use crate::backend::{BackendOutput, SigningBackend, StageInvocation};
use crate::error::{BackendError, BackendUnavailableError};
use crate::interpreter::VALIDATION_PASSED_MARKER;
use crate::stage::Stage;

/// Value written over every placeholder by the default sign response.
pub const SCRIPTED_SIGNATURE: &str = "U0NSSVBURUQtU0lHTkFUVVJF";

/// How the scripted backend answers one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedResponse {
    /// Behave like a healthy SDK for the stage.
    Healthy,
    /// Return this output verbatim.
    Output(BackendOutput),
    /// Report a timeout.
    Timeout,
    /// Report that the backend cannot be launched.
    Unavailable(String),
}

/// Canned backend.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    responses: Mutex<HashMap<Stage, ScriptedResponse>>,
    calls: Mutex<Vec<Stage>>,
    inputs: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    /// Backend where every stage is healthy.
    pub fn healthy() -> Self {
        Self::default()
    }

    /// Override the response for one stage.
    pub fn with(self, stage: Stage, response: ScriptedResponse) -> Self {
        self.responses.lock().insert(stage, response);
        self
    }

    /// Stages invoked so far, in order.
    pub fn calls(&self) -> Vec<Stage> {
        self.calls.lock().clone()
    }

    /// Invoice file contents seen by each invocation, in order.
    pub fn inputs(&self) -> Vec<String> {
        self.inputs.lock().clone()
    }

    fn response(&self, stage: Stage) -> ScriptedResponse {
        self.responses
            .lock()
            .get(&stage)
            .cloned()
            .unwrap_or(ScriptedResponse::Healthy)
    }

    fn healthy_output(stage: Stage, path: &std::path::Path, xml: &str) -> Result<BackendOutput, BackendError> {
        let output = match stage {
            Stage::Validate => BackendOutput::ok(format!(
                "[INFO] XSD validation result = PASSED\n*** {VALIDATION_PASSED_MARKER}\n"
            )),
            Stage::Hash => BackendOutput::ok(format!("*** INVOICE HASH = {}\n", invoice_hash(xml))),
            Stage::Sign => {
                let signed = PLACEHOLDERS
                    .iter()
                    .fold(xml.to_string(), |acc, token| acc.replace(token, SCRIPTED_SIGNATURE));
                std::fs::write(path, signed).map_err(|e| BackendError::Io(e.to_string()))?;
                BackendOutput::ok(format!(
                    "*** INVOICE SIGNED\nSignature Value = {SCRIPTED_SIGNATURE}\n"
                ))
            }
            Stage::Qr => BackendOutput::ok(format!("*** QR code = {}\n", invoice_hash(xml))),
        };
        Ok(output)
    }
}

#[async_trait]
impl SigningBackend for ScriptedBackend {
    async fn invoke(
        &self,
        invocation: &StageInvocation,
        timeout: Duration,
    ) -> Result<BackendOutput, BackendError> {
        let stage = invocation.stage;
        self.calls.lock().push(stage);

        let xml = std::fs::read_to_string(&invocation.invoice_path)
            .map_err(|e| BackendError::Io(format!("read {}: {e}", invocation.invoice_path.display())))?;
        self.inputs.lock().push(xml.clone());

        match self.response(stage) {
            ScriptedResponse::Healthy => Self::healthy_output(stage, &invocation.invoice_path, &xml),
            ScriptedResponse::Output(output) => Ok(output),
            ScriptedResponse::Timeout => Err(BackendError::Timeout {
                elapsed_ms: timeout.as_millis() as u64,
            }),
            ScriptedResponse::Unavailable(reason) => {
                Err(BackendUnavailableError::new(reason).into())
            }
        }
    }

    fn backend_name(&self) -> &str {
        "scripted"
    }
}
