//! Predictor library for case outcome prediction
//!
//! This crate provides the core functionality for:
//! - Feature schema loading from a trained model
//! - Request validation and one-hot vector resolution
//! - Random forest and ONNX inference
//! - Health checks and observability

pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod predictor;

pub use error::{ErrorKind, PredictError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{ServiceMetrics, StructuredLogger};
