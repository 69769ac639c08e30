//! HTTP API for predictions, model info, health checks and Prometheus metrics

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use predictor_lib::{
    health::{components, ComponentStatus, HealthRegistry, PredictorHealthTracker},
    observability::{ServiceMetrics, StructuredLogger},
    predictor::PredictionService,
    ErrorKind, ErrorResponse, PredictError, PredictionResult,
};
use prometheus::{Encoder, TextEncoder};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PredictionService>,
    pub health_registry: HealthRegistry,
    pub metrics: ServiceMetrics,
    pub logger: StructuredLogger,
    pub inference_timeout: Duration,
    pub predictor_health: Arc<PredictorHealthTracker>,
}

impl AppState {
    pub fn new(
        service: Arc<PredictionService>,
        health_registry: HealthRegistry,
        logger: StructuredLogger,
        inference_timeout: Duration,
    ) -> Self {
        Self {
            service,
            health_registry,
            metrics: ServiceMetrics::new(),
            logger,
            inference_timeout,
            predictor_health: Arc::new(PredictorHealthTracker::new()),
        }
    }
}

/// Failure of a prediction endpoint
#[derive(Debug)]
pub enum ApiError {
    Predict(PredictError),
    /// The prediction did not finish within the configured timeout
    Timeout(Duration),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Predict(err) => err.kind(),
            ApiError::Timeout(_) => ErrorKind::ModelInferenceError,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Predict(err) => status_for(err.kind()),
            ApiError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    fn body(&self) -> ErrorResponse {
        match self {
            ApiError::Predict(err) => ErrorResponse::from(err),
            ApiError::Timeout(limit) => ErrorResponse::new(
                ErrorKind::ModelInferenceError,
                format!("prediction did not finish within {}ms", limit.as_millis()),
                None,
            ),
        }
    }
}

impl From<PredictError> for ApiError {
    fn from(err: PredictError) -> Self {
        ApiError::Predict(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

/// HTTP status for each failure category
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::ValidationError => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::SchemaIntegrityError
        | ErrorKind::SchemaUnavailable
        | ErrorKind::ModelInferenceError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn root(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "message": "Case Outcome Predictor API",
        "status": "online",
        "model_version": state.service.model_version(),
    }))
}

/// Predict from a JSON body
async fn predict(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<PredictionResult>, ApiError> {
    let payload = match parse_object(&body) {
        Ok(payload) => payload,
        Err(err) => {
            let err = ApiError::from(err);
            state.metrics.inc_requests(err.kind().as_str());
            log_failure(&state, &err);
            return Err(err);
        }
    };
    run_prediction(&state, move |service| service.predict(&payload))
        .await
        .map(Json)
}

/// Predict from query parameters
async fn predict_query(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<PredictionResult>, ApiError> {
    run_prediction(&state, move |service| service.predict_query(&params))
        .await
        .map(Json)
}

fn parse_object(body: &[u8]) -> Result<Map<String, Value>, PredictError> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(PredictError::validation("body", "must be a JSON object")),
        Err(e) => Err(PredictError::validation(
            "body",
            format!("not valid JSON: {}", e),
        )),
    }
}

/// Run a prediction on the blocking pool, bounded by the inference timeout
async fn run_prediction<F>(state: &AppState, predict: F) -> Result<PredictionResult, ApiError>
where
    F: FnOnce(&PredictionService) -> Result<PredictionResult, PredictError> + Send + 'static,
{
    let service = state.service.clone();
    let start = Instant::now();
    let task = tokio::task::spawn_blocking(move || predict(&service));

    let outcome = match tokio::time::timeout(state.inference_timeout, task).await {
        Ok(Ok(result)) => result.map_err(ApiError::from),
        Ok(Err(join_error)) => Err(ApiError::from(PredictError::inference(format!(
            "prediction task failed: {}",
            join_error
        )))),
        Err(_) => {
            state.metrics.inc_inference_timeouts();
            Err(ApiError::Timeout(state.inference_timeout))
        }
    };

    track_predictor_health(state, &outcome).await;

    match &outcome {
        Ok(result) => state.logger.log_prediction(
            &result.prediction,
            result.probability,
            state.service.is_low_confidence(result),
            state.service.model_version(),
            start.elapsed().as_micros(),
        ),
        Err(err) => log_failure(state, err),
    }
    outcome
}

/// Fold a prediction outcome into the predictor component's health
///
/// Caller mistakes leave health untouched.
async fn track_predictor_health(state: &AppState, outcome: &Result<PredictionResult, ApiError>) {
    let tracker = &state.predictor_health;
    let transition = match outcome {
        Ok(_) => tracker.record_success(state.service.stats().slow_inferences),
        Err(err) if err.kind() == ErrorKind::ValidationError => None,
        Err(err) => Some(tracker.record_failure(&err.body().detail)),
    };

    if let Some(transition) = transition {
        info!(component = components::PREDICTOR, ?transition, "Predictor health changed");
        transition
            .apply(&state.health_registry, components::PREDICTOR)
            .await;
    }
}

fn log_failure(state: &AppState, err: &ApiError) {
    let field = match err {
        ApiError::Predict(e) => e.field(),
        ApiError::Timeout(_) => None,
    };
    state
        .logger
        .log_rejection(err.kind().as_str(), field, &err.body().detail);
}

async fn model_info(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.service.model_info())
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 once the model is loaded
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/predict", get(predict_query).post(predict))
        .route("/model-info", get(model_info))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server, stopping when `shutdown` resolves
pub async fn serve(
    addr: String,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = create_router(state);

    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(ErrorKind::ValidationError),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(ErrorKind::ModelInferenceError),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_for(ErrorKind::SchemaUnavailable),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::Timeout(Duration::from_millis(10)).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn test_parse_object() {
        assert!(parse_object(br#"{"case_type": "Criminal"}"#).is_ok());

        let err = parse_object(b"[1, 2]").unwrap_err();
        assert_eq!(err.field(), Some("body"));

        let err = parse_object(b"{not json").unwrap_err();
        assert!(err.to_string().contains("not valid JSON"));
    }

    #[test]
    fn test_timeout_body() {
        let body = ApiError::Timeout(Duration::from_millis(250)).body();
        assert_eq!(body.error, ErrorKind::ModelInferenceError);
        assert!(body.detail.contains("250ms"));
        assert!(body.field.is_none());
    }
}
