//! # Compliance Pipeline API
//!
//! - **POST `/v1/zatca/validate`**: run the validate stage only
//! - **POST `/v1/zatca/process`**: validate, hash, sign, then generate the QR
//!
//! Stage failures are not errors at this boundary. Every response carries
//! the documented body so the UI can show the backend's diagnostics; only
//! the status code differs:
//!
//! | Outcome | Status |
//! |---------|--------|
//! | all stages passed | 200 |
//! | validation failed | 400 |
//! | stage timed out | 504 |
//! | backend could not be launched | 503 |
//! | any other stage failure | 502 |
//!
//! A request arriving with no backend configured is an [`AppError`] (503).

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use zatca_core::invoice_hash;
use zatca_pipeline::{PipelineResult, PipelineRun, PipelineStageError, Stage};

use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::AppState;

/// Request carrying an invoice XML document.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct XmlRequest {
    /// The UBL invoice XML.
    pub xml_content: String,
}

impl Validate for XmlRequest {
    fn validate(&self) -> Result<(), String> {
        let trimmed = self.xml_content.trim_start();
        if trimmed.is_empty() {
            return Err("xmlContent must not be empty".to_string());
        }
        if !trimmed.starts_with('<') {
            return Err("xmlContent must be an XML document".to_string());
        }
        Ok(())
    }
}

/// Result of the validate endpoint.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidateResponse {
    /// Whether the call succeeded end to end.
    pub success: bool,
    /// Whether the backend reported the invoice as valid.
    pub validation_passed: bool,
    /// Short outcome message.
    pub message: String,
    /// Raw backend output.
    pub details: String,
}

/// Result of the process endpoint.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResponse {
    /// Whether every stage passed.
    pub success: bool,
    /// Short outcome message.
    pub message: String,
    /// Invoice hash from the hash stage.
    pub hash: Option<String>,
    /// QR payload from the QR stage.
    pub qr_code: Option<String>,
    /// Signed invoice XML from the sign stage.
    pub signed_xml: Option<String>,
    /// Whether the validate stage passed.
    pub validation_passed: bool,
    /// Raw backend output of every stage that ran.
    pub details: String,
    /// Per-stage results in execution order.
    #[schema(value_type = Vec<Object>)]
    pub stages: Vec<PipelineResult>,
}

/// Build the compliance router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/zatca/validate", post(validate_invoice))
        .route("/v1/zatca/process", post(process_invoice))
}

/// POST /v1/zatca/validate: Run the validate stage against the backend.
#[utoipa::path(
    post,
    path = "/v1/zatca/validate",
    request_body = XmlRequest,
    responses(
        (status = 200, description = "Invoice is valid", body = ValidateResponse),
        (status = 400, description = "Invoice failed validation", body = ValidateResponse),
        (status = 422, description = "Empty or non-XML content", body = crate::error::ErrorBody),
        (status = 503, description = "No compliance backend", body = crate::error::ErrorBody),
    ),
    tag = "compliance"
)]
pub async fn validate_invoice(
    State(state): State<AppState>,
    body: Result<Json<XmlRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ValidateResponse>), AppError> {
    let req = extract_validated_json(body)?;
    let pipeline = state.pipeline()?;

    let run = pipeline.validate(&req.xml_content).await;
    let status = status_for(run.failure.as_ref());
    let passed = run.validation_passed();
    tracing::info!(passed, state = %run.state, "validate request finished");

    Ok((
        status,
        Json(ValidateResponse {
            success: passed,
            validation_passed: passed,
            message: message_for(&run, "Invoice validated successfully"),
            details: run.transcript(),
        }),
    ))
}

/// POST /v1/zatca/process: Run the full validate, hash, sign, QR pipeline.
#[utoipa::path(
    post,
    path = "/v1/zatca/process",
    request_body = XmlRequest,
    responses(
        (status = 200, description = "All stages passed", body = ProcessResponse),
        (status = 400, description = "Invoice failed validation", body = ProcessResponse),
        (status = 502, description = "A later stage failed", body = ProcessResponse),
        (status = 503, description = "Backend unavailable", body = ProcessResponse),
        (status = 504, description = "A stage timed out", body = ProcessResponse),
    ),
    tag = "compliance"
)]
pub async fn process_invoice(
    State(state): State<AppState>,
    body: Result<Json<XmlRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ProcessResponse>), AppError> {
    let req = extract_validated_json(body)?;
    let pipeline = state.pipeline()?;

    let run = pipeline.run(&req.xml_content).await;
    let status = status_for(run.failure.as_ref());
    tracing::info!(
        state = %run.state,
        stages = run.results.len(),
        status = status.as_u16(),
        "process request finished"
    );

    let hash = hash_for(&run, &req.xml_content);
    Ok((
        status,
        Json(ProcessResponse {
            success: run.is_complete(),
            message: message_for(&run, "Invoice processed successfully"),
            hash,
            qr_code: run.artifact(Stage::Qr).map(str::to_string),
            signed_xml: run.signed_xml.clone(),
            validation_passed: run.validation_passed(),
            details: run.transcript(),
            stages: run.results,
        }),
    ))
}

/// Hash reported for a run.
///
/// A hash stage that passed without printing a digest falls back to the
/// digest of the submitted document.
fn hash_for(run: &PipelineRun, xml: &str) -> Option<String> {
    match run.result(Stage::Hash) {
        Some(result) if result.success => Some(
            result
                .extracted_artifact
                .clone()
                .unwrap_or_else(|| invoice_hash(xml)),
        ),
        _ => None,
    }
}

fn status_for(failure: Option<&PipelineStageError>) -> StatusCode {
    match failure {
        None => StatusCode::OK,
        Some(PipelineStageError::ValidationFailed) => StatusCode::BAD_REQUEST,
        Some(PipelineStageError::Timeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
        Some(PipelineStageError::Unavailable { .. }) => StatusCode::SERVICE_UNAVAILABLE,
        Some(PipelineStageError::Failed { .. } | PipelineStageError::Io { .. }) => {
            StatusCode::BAD_GATEWAY
        }
    }
}

fn message_for(run: &PipelineRun, success: &str) -> String {
    match &run.failure {
        None => success.to_string(),
        Some(PipelineStageError::ValidationFailed) => "Validation failed".to_string(),
        Some(err) => err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xml_request_rejects_empty_and_non_xml() {
        let empty = XmlRequest {
            xml_content: "   ".into(),
        };
        assert!(empty.validate().is_err());

        let text = XmlRequest {
            xml_content: "hello".into(),
        };
        assert!(text.validate().is_err());

        let xml = XmlRequest {
            xml_content: "\n<?xml version=\"1.0\"?><Invoice/>".into(),
        };
        assert!(xml.validate().is_ok());
    }

    #[test]
    fn status_follows_failure_kind() {
        assert_eq!(status_for(None), StatusCode::OK);
        assert_eq!(
            status_for(Some(&PipelineStageError::ValidationFailed)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(Some(&PipelineStageError::Timeout {
                stage: Stage::Sign,
                elapsed_ms: 60_000,
            })),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status_for(Some(&PipelineStageError::Failed {
                stage: Stage::Qr,
                message: "exit code 1".into(),
            })),
            StatusCode::BAD_GATEWAY
        );
    }
}
