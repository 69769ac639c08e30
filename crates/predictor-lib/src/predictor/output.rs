//! Prediction output formatting
//!
//! Turns a raw class position and probability row from the classifier into
//! a `PredictionResult`, rejecting outputs that do not fit the model's class
//! list.

use crate::error::PredictError;
use crate::models::PredictionResult;

/// Rounding slack allowed on probabilities and their sum
const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// Default probability below which a prediction is flagged as uncertain
pub const LOW_CONFIDENCE_THRESHOLD: f64 = 0.6;

/// Formats raw classifier outputs into a `PredictionResult`
#[derive(Debug, Clone)]
pub struct OutputFormatter {
    low_confidence_threshold: f64,
}

impl OutputFormatter {
    pub fn new() -> Self {
        Self {
            low_confidence_threshold: LOW_CONFIDENCE_THRESHOLD,
        }
    }

    pub fn with_threshold(low_confidence_threshold: f64) -> Self {
        Self {
            low_confidence_threshold,
        }
    }

    /// Map the predicted class and its probability onto a result
    ///
    /// # Arguments
    /// * `class` - Predicted class position
    /// * `proba` - Per-class probabilities, aligned to `labels`
    /// * `labels` - Class labels of the model
    pub fn format(
        &self,
        class: usize,
        proba: &[f64],
        labels: &[String],
    ) -> Result<PredictionResult, PredictError> {
        if proba.len() != labels.len() {
            return Err(PredictError::inference(format!(
                "model returned {} probabilities for {} classes",
                proba.len(),
                labels.len()
            )));
        }
        let label = labels.get(class).ok_or_else(|| {
            PredictError::inference(format!(
                "model predicted class {} of {}",
                class,
                labels.len()
            ))
        })?;

        let tolerance = PROBABILITY_TOLERANCE;
        if proba
            .iter()
            .any(|p| !p.is_finite() || *p < -tolerance || *p > 1.0 + tolerance)
        {
            return Err(PredictError::inference(
                "model returned a probability outside [0, 1]",
            ));
        }
        let total: f64 = proba.iter().sum();
        if (total - 1.0).abs() > tolerance * proba.len() as f64 {
            return Err(PredictError::inference(format!(
                "model probabilities sum to {}",
                total
            )));
        }

        Ok(PredictionResult {
            prediction: label.clone(),
            probability: proba[class].clamp(0.0, 1.0),
        })
    }

    pub fn is_low_confidence(&self, result: &PredictionResult) -> bool {
        result.probability < self.low_confidence_threshold
    }
}

impl Default for OutputFormatter {
    fn default() -> Self {
        Self::new()
    }
}
