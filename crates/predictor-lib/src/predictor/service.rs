//! Prediction service
//!
//! Composes request normalization, vector resolution and classifier
//! inference into one stateless call. The schema and model are loaded once
//! and shared read-only, so a single service can serve any number of
//! concurrent requests.

use super::{
    Classifier, FeatureSchema, FieldKind, NormalizedRequest, OutputFormatter, RequestNormalizer,
    ResolutionReport, VectorResolver,
};
use crate::error::PredictError;
use crate::models::{
    FeatureImportance, FeatureVector, ModelInfo, PredictionRequest, PredictionResult,
};
use crate::observability::ServiceMetrics;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Maximum inference latency before warning (5ms target)
pub const MAX_INFERENCE_MS: u128 = 5;

/// Serves predictions for one loaded model
pub struct PredictionService {
    classifier: Arc<dyn Classifier>,
    schema: Arc<FeatureSchema>,
    normalizer: RequestNormalizer,
    resolver: VectorResolver,
    output_formatter: OutputFormatter,
    metrics: ServiceMetrics,
    inference_count: AtomicU64,
    slow_inference_count: AtomicU64,
}

impl PredictionService {
    /// Load the model's schema and bind the request field table to it
    ///
    /// Every schema fault surfaces here, never per request.
    pub fn new(
        classifier: Arc<dyn Classifier>,
        normalizer: RequestNormalizer,
    ) -> Result<Self, PredictError> {
        let schema = Arc::new(FeatureSchema::load(classifier.as_ref())?);
        check_bindings(&normalizer, &schema)?;

        let metrics = ServiceMetrics::new();
        metrics.set_model_info(classifier.version(), classifier.model_type());
        metrics.set_schema_features(schema.len() as i64);

        debug!(
            features = schema.len(),
            classes = classifier.class_labels().len(),
            "Prediction service bound to model schema"
        );

        Ok(Self {
            resolver: VectorResolver::new(schema.clone()),
            classifier,
            schema,
            normalizer,
            output_formatter: OutputFormatter::new(),
            metrics,
            inference_count: AtomicU64::new(0),
            slow_inference_count: AtomicU64::new(0),
        })
    }

    /// Predict the outcome for a JSON field map
    pub fn predict(&self, payload: &Map<String, Value>) -> Result<PredictionResult, PredictError> {
        self.observe(|| {
            let normalized = self.normalizer.normalize(payload)?;
            self.infer(&normalized)
        })
    }

    pub fn predict_request(
        &self,
        request: &PredictionRequest,
    ) -> Result<PredictionResult, PredictError> {
        self.predict(&request.to_fields())
    }

    /// Predict from query-string parameters
    pub fn predict_query(
        &self,
        params: &HashMap<String, String>,
    ) -> Result<PredictionResult, PredictError> {
        self.observe(|| {
            let normalized = self.normalizer.normalize_query(params)?;
            self.infer(&normalized)
        })
    }

    /// Resolve a request without running the model
    pub fn resolve(
        &self,
        payload: &Map<String, Value>,
    ) -> Result<(FeatureVector, ResolutionReport), PredictError> {
        let normalized = self.normalizer.normalize(payload)?;
        self.resolver.resolve(&normalized)
    }

    fn observe(
        &self,
        predict: impl FnOnce() -> Result<PredictionResult, PredictError>,
    ) -> Result<PredictionResult, PredictError> {
        let start = Instant::now();
        let result = predict();
        self.metrics
            .observe_prediction_latency(start.elapsed().as_secs_f64());
        match &result {
            Ok(_) => self.metrics.inc_requests("success"),
            Err(e) => self.metrics.inc_requests(e.kind().as_str()),
        }
        result
    }

    fn infer(&self, normalized: &NormalizedRequest) -> Result<PredictionResult, PredictError> {
        let (vector, report) = self.resolver.resolve(normalized)?;
        for unmatched in report.unmatched_fields() {
            debug!(event = "unmatched_field", field = %unmatched.field, "Field has no matching schema feature");
            self.metrics.inc_unmatched_field(&unmatched.field);
        }

        if vector.len() != self.classifier.n_features() {
            return Err(PredictError::inference(format!(
                "resolved {} features, model expects {}",
                vector.len(),
                self.classifier.n_features()
            )));
        }

        let start = Instant::now();
        let class = self
            .classifier
            .predict(&vector)
            .map_err(|e| PredictError::inference(format!("{:#}", e)))?;
        let proba = self
            .classifier
            .predict_proba(&vector)
            .map_err(|e| PredictError::inference(format!("{:#}", e)))?;

        let elapsed = start.elapsed();
        self.inference_count.fetch_add(1, Ordering::Relaxed);
        if elapsed.as_millis() > MAX_INFERENCE_MS {
            self.slow_inference_count.fetch_add(1, Ordering::Relaxed);
            warn!(elapsed_ms = elapsed.as_millis(), "Inference exceeded {}ms target", MAX_INFERENCE_MS);
        } else {
            debug!(elapsed_us = elapsed.as_micros(), "Inference completed");
        }

        self.output_formatter
            .format(class, &proba, self.classifier.class_labels())
    }

    pub fn is_low_confidence(&self, result: &PredictionResult) -> bool {
        self.output_formatter.is_low_confidence(result)
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn normalizer(&self) -> &RequestNormalizer {
        &self.normalizer
    }

    pub fn model_version(&self) -> &str {
        self.classifier.version()
    }

    /// Describe the loaded model, importances sorted high to low
    pub fn model_info(&self) -> ModelInfo {
        let feature_importances = self.classifier.feature_importances().map(|scores| {
            let mut ranked: Vec<FeatureImportance> = self
                .schema
                .names()
                .iter()
                .zip(scores)
                .map(|(feature, importance)| FeatureImportance {
                    feature: feature.clone(),
                    importance: *importance,
                })
                .collect();
            ranked.sort_by(|a, b| {
                b.importance
                    .partial_cmp(&a.importance)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            ranked
        });

        ModelInfo {
            model_type: self.classifier.model_type().to_string(),
            model_version: self.classifier.version().to_string(),
            n_features: self.schema.len(),
            features: self.schema.names().to_vec(),
            classes: self.classifier.class_labels().to_vec(),
            feature_importances,
        }
    }

    /// Get inference statistics
    pub fn stats(&self) -> InferenceStats {
        InferenceStats {
            total_inferences: self.inference_count.load(Ordering::Relaxed),
            slow_inferences: self.slow_inference_count.load(Ordering::Relaxed),
        }
    }
}

/// Reject field tables where two fields could write the same schema slot
fn check_bindings(
    normalizer: &RequestNormalizer,
    schema: &FeatureSchema,
) -> Result<(), PredictError> {
    let mut features: HashMap<&str, &str> = HashMap::new();
    // (prefix, field) pairs
    let mut prefixes: Vec<(&str, &str)> = Vec::new();

    for spec in normalizer.fields() {
        match &spec.kind {
            FieldKind::Numeric { feature, .. } | FieldKind::Boolean { feature } => {
                if let Some(other) = features.insert(feature.as_str(), spec.name.as_str()) {
                    return Err(PredictError::schema_integrity(
                        feature.as_str(),
                        format!("bound by both `{}` and `{}`", other, spec.name),
                    ));
                }
            }
            FieldKind::Categorical { prefix } => {
                // A prefix that starts another one can reach the same one-hot slots
                if let Some((other, field)) = prefixes
                    .iter()
                    .find(|(p, _)| prefix.starts_with(*p) || p.starts_with(prefix.as_str()))
                {
                    return Err(PredictError::schema_integrity(
                        prefix.as_str(),
                        format!(
                            "one-hot prefix of `{}` overlaps prefix `{}` of `{}`",
                            spec.name, other, field
                        ),
                    ));
                }
                prefixes.push((prefix.as_str(), spec.name.as_str()));
            }
        }
    }

    for feature in features.keys() {
        if schema.index_of(feature).is_none() {
            continue;
        }
        if let Some((prefix, _)) = prefixes.iter().find(|(p, _)| feature.starts_with(*p)) {
            return Err(PredictError::schema_integrity(
                *feature,
                format!("numeric feature lies inside one-hot prefix `{}`", prefix),
            ));
        }
    }
    Ok(())
}

/// Inference statistics
#[derive(Debug, Clone)]
pub struct InferenceStats {
    pub total_inferences: u64,
    pub slow_inferences: u64,
}
