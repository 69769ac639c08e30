//! Typed failures of the prediction contract
//!
//! Validation and inference failures are per-request; schema failures are
//! raised once while a model is being loaded.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure raised while resolving or serving a prediction
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredictError {
    /// A request field was missing, of the wrong kind, or out of range
    #[error("invalid field `{field}`: {reason}")]
    Validation { field: String, reason: String },

    /// The model's feature list is internally inconsistent
    #[error("feature schema integrity fault on `{feature}`: {detail}")]
    SchemaIntegrity { feature: String, detail: String },

    /// The model carries no recorded feature names
    #[error("model has no recorded feature names; re-export it with feature names retained")]
    SchemaUnavailable,

    /// The underlying classifier failed or returned an unusable result
    #[error("model inference failed: {message}")]
    ModelInference { message: String },
}

impl PredictError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn schema_integrity(feature: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::SchemaIntegrity {
            feature: feature.into(),
            detail: detail.into(),
        }
    }

    pub fn inference(message: impl Into<String>) -> Self {
        Self::ModelInference {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PredictError::Validation { .. } => ErrorKind::ValidationError,
            PredictError::SchemaIntegrity { .. } => ErrorKind::SchemaIntegrityError,
            PredictError::SchemaUnavailable => ErrorKind::SchemaUnavailable,
            PredictError::ModelInference { .. } => ErrorKind::ModelInferenceError,
        }
    }

    /// Request field or schema feature the failure is about, if any
    pub fn field(&self) -> Option<&str> {
        match self {
            PredictError::Validation { field, .. } => Some(field),
            PredictError::SchemaIntegrity { feature, .. } => Some(feature),
            _ => None,
        }
    }
}

/// Wire name of a failure category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ValidationError,
    SchemaIntegrityError,
    SchemaUnavailable,
    ModelInferenceError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ValidationError => "validation_error",
            ErrorKind::SchemaIntegrityError => "schema_integrity_error",
            ErrorKind::SchemaUnavailable => "schema_unavailable",
            ErrorKind::ModelInferenceError => "model_inference_error",
        }
    }

    /// Whether the caller can fix the failure by correcting its input
    pub fn is_client_error(&self) -> bool {
        matches!(self, ErrorKind::ValidationError)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
