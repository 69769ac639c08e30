//! Observability infrastructure for the prediction service
//!
//! Provides:
//! - Prometheus metrics (prediction latency, request outcomes, unmatched fields, model info)
//! - Structured JSON logging with tracing

use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter_vec, register_int_gauge,
    register_int_counter, GaugeVec, Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.5,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ServiceMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct ServiceMetricsInner {
    prediction_latency_seconds: Histogram,
    requests_total: IntCounterVec,
    inference_timeouts_total: IntCounter,
    unmatched_fields_total: IntCounterVec,
    model_info: GaugeVec,
    schema_features: IntGauge,
}

impl ServiceMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "case_predictor_prediction_latency_seconds",
                "Time spent validating, resolving and scoring a prediction request",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            requests_total: register_int_counter_vec!(
                "case_predictor_requests_total",
                "Prediction requests by outcome",
                &["outcome"]
            )
            .expect("Failed to register requests_total"),

            inference_timeouts_total: register_int_counter!(
                "case_predictor_inference_timeouts_total",
                "Predictions abandoned by the caller after the inference timeout"
            )
            .expect("Failed to register inference_timeouts_total"),

            unmatched_fields_total: register_int_counter_vec!(
                "case_predictor_unmatched_fields_total",
                "Request fields with no matching schema feature",
                &["field"]
            )
            .expect("Failed to register unmatched_fields_total"),

            model_info: register_gauge_vec!(
                "case_predictor_model_info",
                "Information about the currently loaded model",
                &["version", "model_type"]
            )
            .expect("Failed to register model_info"),

            schema_features: register_int_gauge!(
                "case_predictor_schema_features",
                "Number of features in the loaded model schema"
            )
            .expect("Failed to register schema_features"),
        }
    }
}

/// Service metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct ServiceMetrics {
    _private: (),
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ServiceMetricsInner {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new)
    }

    /// Record a prediction latency observation
    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    /// Count a finished request under its outcome (`success` or an error kind)
    pub fn inc_requests(&self, outcome: &str) {
        self.inner()
            .requests_total
            .with_label_values(&[outcome])
            .inc();
    }

    /// Count a prediction the caller stopped waiting for
    ///
    /// The blocking task still completes and is counted under its own outcome.
    pub fn inc_inference_timeouts(&self) {
        self.inner().inference_timeouts_total.inc();
    }

    pub fn inference_timeouts(&self) -> u64 {
        self.inner().inference_timeouts_total.get()
    }

    pub fn inc_unmatched_field(&self, field: &str) {
        self.inner()
            .unmatched_fields_total
            .with_label_values(&[field])
            .inc();
    }

    /// Update model version info
    pub fn set_model_info(&self, version: &str, model_type: &str) {
        // Reset previous version
        self.inner().model_info.reset();
        self.inner()
            .model_info
            .with_label_values(&[version, model_type])
            .set(1.0);
    }

    pub fn set_schema_features(&self, count: i64) {
        self.inner().schema_features.set(count);
    }

    pub fn requests(&self, outcome: &str) -> u64 {
        self.inner()
            .requests_total
            .with_label_values(&[outcome])
            .get()
    }
}

/// Structured logger for service events
///
/// Provides consistent JSON-formatted logging for predictions,
/// rejections, and lifecycle events.
#[derive(Clone)]
pub struct StructuredLogger {
    service_name: String,
}

impl StructuredLogger {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Log a served prediction
    pub fn log_prediction(
        &self,
        prediction: &str,
        probability: f64,
        low_confidence: bool,
        model_version: &str,
        elapsed_us: u128,
    ) {
        info!(
            event = "prediction_served",
            service = %self.service_name,
            prediction = %prediction,
            probability = probability,
            low_confidence = low_confidence,
            model_version = %model_version,
            elapsed_us = elapsed_us,
            "Served case outcome prediction"
        );
    }

    /// Log a rejected prediction request
    pub fn log_rejection(&self, kind: &str, field: Option<&str>, detail: &str) {
        if kind == "validation_error" {
            info!(
                event = "prediction_rejected",
                service = %self.service_name,
                kind = %kind,
                field = ?field,
                detail = %detail,
                "Prediction request rejected"
            );
        } else {
            warn!(
                event = "prediction_rejected",
                service = %self.service_name,
                kind = %kind,
                field = ?field,
                detail = %detail,
                "Prediction request failed"
            );
        }
    }

    /// Log a loaded model
    pub fn log_model_loaded(
        &self,
        path: &str,
        model_type: &str,
        model_version: &str,
        n_features: usize,
    ) {
        info!(
            event = "model_loaded",
            service = %self.service_name,
            path = %path,
            model_type = %model_type,
            model_version = %model_version,
            n_features = n_features,
            "Model loaded and schema bound"
        );
    }

    /// Log a model that could not be loaded
    pub fn log_model_load_failed(&self, path: &str, error: &str) {
        warn!(
            event = "model_load_failed",
            service = %self.service_name,
            path = %path,
            error = %error,
            "Model could not be loaded"
        );
    }

    /// Log service startup
    pub fn log_startup(&self, version: &str, addr: &str) {
        info!(
            event = "service_started",
            service = %self.service_name,
            service_version = %version,
            addr = %addr,
            "Case predictor started"
        );
    }

    /// Log service shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service_name,
            reason = %reason,
            "Case predictor shutting down"
        );
    }
}
