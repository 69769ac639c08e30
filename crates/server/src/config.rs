//! Service configuration

use anyhow::{Context, Result};
use predictor_lib::predictor::{ModelSource, MAX_MODEL_BYTES};
use serde::Deserialize;
use std::time::Duration;

/// Environment variable naming an optional config file
const CONFIG_FILE_ENV: &str = "PREDICTOR_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "config/predictor";

/// Service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// API server port
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Trained model artifact (`.json` forest or `.onnx`)
    #[serde(default = "default_model_path")]
    pub model_path: String,

    /// Expected SHA256 of the model artifact
    #[serde(default)]
    pub model_checksum: Option<String>,

    #[serde(default = "default_max_model_bytes")]
    pub max_model_bytes: usize,

    /// Upper bound on a single prediction, including queueing for a worker
    #[serde(default = "default_inference_timeout_ms")]
    pub inference_timeout_ms: u64,

    #[serde(default = "default_service_name")]
    pub service_name: String,
}

fn default_api_port() -> u16 {
    8000
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_model_path() -> String {
    "models/case_forest.json".to_string()
}

fn default_max_model_bytes() -> usize {
    MAX_MODEL_BYTES
}

fn default_inference_timeout_ms() -> u64 {
    2000
}

fn default_service_name() -> String {
    "case-predictor".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            bind_address: default_bind_address(),
            model_path: default_model_path(),
            model_checksum: None,
            max_model_bytes: default_max_model_bytes(),
            inference_timeout_ms: default_inference_timeout_ms(),
            service_name: default_service_name(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from an optional config file and the environment
    ///
    /// Environment variables (`PREDICTOR_API_PORT`, `PREDICTOR_MODEL_PATH`, ...)
    /// override values from the file.
    pub fn load() -> Result<Self> {
        let file = std::env::var(CONFIG_FILE_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name(&file).required(false))
            .add_source(config::Environment::with_prefix("PREDICTOR").try_parsing(true))
            .build()
            .context("Failed to read configuration")?;

        config
            .try_deserialize()
            .context("Invalid predictor configuration")
    }

    pub fn model_source(&self) -> ModelSource {
        let source = ModelSource {
            max_model_bytes: self.max_model_bytes,
            ..ModelSource::new(&self.model_path)
        };
        match &self.model_checksum {
            Some(checksum) if !checksum.is_empty() => source.with_checksum(checksum.as_str()),
            _ => source,
        }
    }

    pub fn inference_timeout(&self) -> Duration {
        Duration::from_millis(self.inference_timeout_ms)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.api_port)
    }
}
