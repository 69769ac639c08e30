//! Case Predictor - case outcome prediction service
//!
//! Loads a trained model once at startup, binds the request field table to
//! its feature schema and serves predictions over HTTP.

use anyhow::{Context, Result};
use case_predictor::{
    api::{self, AppState},
    config::ServerConfig,
};
use predictor_lib::{
    health::{components, HealthRegistry},
    observability::StructuredLogger,
    predictor::{load_classifier, PredictionService, RequestNormalizer},
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting case-predictor");

    let config = ServerConfig::load()?;
    info!(model_path = %config.model_path, "Service configured");

    let logger = StructuredLogger::new(&config.service_name);

    let health_registry = HealthRegistry::new();
    health_registry.register(components::MODEL).await;
    health_registry.register(components::PREDICTOR).await;

    // Schema faults abort startup rather than surfacing per request
    let service = match load_service(&config) {
        Ok(service) => service,
        Err(e) => {
            logger.log_model_load_failed(&config.model_path, &format!("{:#}", e));
            return Err(e);
        }
    };
    logger.log_model_loaded(
        &config.model_path,
        &service.model_info().model_type,
        service.model_version(),
        service.schema().len(),
    );

    let app_state = Arc::new(AppState::new(
        Arc::new(service),
        health_registry.clone(),
        logger.clone(),
        config.inference_timeout(),
    ));

    health_registry.set_ready(true).await;

    let addr = config.bind_addr();
    logger.log_startup(SERVICE_VERSION, &addr);

    let shutdown_logger = logger.clone();
    api::serve(addr, app_state, async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown_logger.log_shutdown("SIGINT received");
        }
    })
    .await?;

    info!("Shutting down");
    Ok(())
}

fn load_service(config: &ServerConfig) -> Result<PredictionService> {
    let classifier = load_classifier(&config.model_source())?;
    PredictionService::new(classifier, RequestNormalizer::case_defaults())
        .with_context(|| format!("Model {} cannot serve case predictions", config.model_path))
}
