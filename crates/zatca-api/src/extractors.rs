//! # Custom Extractors & Validation
//!
//! Request bodies go through two gates: serde (malformed JSON, wrong types,
//! an invalid VAT number inside a draft) answers 400, and [`Validate`]
//! (empty XML, out-of-range image sizes, a non-Base64 chain hash) answers
//! 422.

use axum::extract::rejection::JsonRejection;
use axum::Json;

use crate::error::AppError;

/// Request types with rules beyond what serde checks.
pub trait Validate {
    /// Validate business rules. Returns an error message on failure.
    fn validate(&self) -> Result<(), String>;
}

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`].
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result.map(|Json(v)| v).map_err(|err| {
        tracing::debug!(status = %err.status(), error = %err.body_text(), "request body rejected");
        AppError::BadRequest(err.body_text())
    })
}

/// Extract a JSON body and validate it using the [`Validate`] trait.
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let value = extract_json(result)?;
    if let Err(reason) = value.validate() {
        tracing::debug!(%reason, "request failed validation");
        return Err(AppError::Validation(reason));
    }
    Ok(value)
}
