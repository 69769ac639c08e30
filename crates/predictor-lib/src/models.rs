//! Core data models for the case outcome predictor

use crate::error::{ErrorKind, PredictError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Ordered numeric input, positionally aligned to a `FeatureSchema`
pub type FeatureVector = Vec<f64>;

/// Typed prediction request for a single case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub case_type: String,
    pub complexity: String,
    pub client_age: f64,
    pub client_income_level: String,
    pub days_open: f64,
    pub escalated: bool,
}

impl PredictionRequest {
    /// Field map as it would arrive over the wire
    pub fn to_fields(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

/// Predicted outcome for a case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Class label of the predicted outcome
    pub prediction: String,
    /// Model probability of the predicted class, in [0, 1]
    pub probability: f64,
}

/// Importance score the training pipeline recorded for one feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Description of the loaded model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_type: String,
    pub model_version: String,
    pub n_features: usize,
    pub features: Vec<String>,
    pub classes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_importances: Option<Vec<FeatureImportance>>,
}

/// Structured error body returned to API callers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorKind,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(kind: ErrorKind, detail: impl Into<String>, field: Option<String>) -> Self {
        Self {
            error: kind,
            detail: detail.into(),
            field,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl From<&PredictError> for ErrorResponse {
    fn from(err: &PredictError) -> Self {
        Self::new(err.kind(), err.to_string(), err.field().map(str::to_string))
    }
}
