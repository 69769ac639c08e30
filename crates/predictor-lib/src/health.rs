//! Health check infrastructure for the prediction service
//!
//! Tracks per-component health for liveness and readiness checks. The
//! service is ready once its model is loaded and no component is unhealthy.

use crate::predictor::MAX_INFERENCE_MS;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Consecutive inference failures before the predictor is reported unhealthy
pub const UNHEALTHY_AFTER_FAILURES: u32 = 5;

/// Health status of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Still serving, with reduced quality
    Degraded,
    Unhealthy,
}

impl ComponentStatus {
    pub fn is_operational(&self) -> bool {
        matches!(self, ComponentStatus::Healthy | ComponentStatus::Degraded)
    }
}

/// Information about a component's health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    fn with_status(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn healthy() -> Self {
        Self::with_status(ComponentStatus::Healthy, None)
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self::with_status(ComponentStatus::Degraded, Some(message.into()))
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::with_status(ComponentStatus::Unhealthy, Some(message.into()))
    }
}

/// Overall health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: HashMap<String, ComponentHealth>,
}

impl HealthResponse {
    /// Worst status across components
    pub fn compute_status(components: &HashMap<String, ComponentHealth>) -> ComponentStatus {
        let mut status = ComponentStatus::Healthy;
        for health in components.values() {
            match health.status {
                ComponentStatus::Unhealthy => return ComponentStatus::Unhealthy,
                ComponentStatus::Degraded => status = ComponentStatus::Degraded,
                ComponentStatus::Healthy => {}
            }
        }
        status
    }
}

/// Readiness response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Component names for health tracking
pub mod components {
    pub const MODEL: &str = "model";
    pub const PREDICTOR: &str = "predictor";
}

/// Health registry for tracking component health
#[derive(Debug, Clone)]
pub struct HealthRegistry {
    components: Arc<RwLock<HashMap<String, ComponentHealth>>>,
    ready: Arc<RwLock<bool>>,
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self {
            components: Arc::new(RwLock::new(HashMap::new())),
            ready: Arc::new(RwLock::new(false)),
        }
    }

    /// Register a component with initial healthy status
    pub async fn register(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    pub async fn update(&self, name: &str, health: ComponentHealth) {
        let mut components = self.components.write().await;
        components.insert(name.to_string(), health);
    }

    pub async fn set_healthy(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    pub async fn set_degraded(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::degraded(message)).await;
    }

    pub async fn set_unhealthy(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::unhealthy(message)).await;
    }

    pub async fn set_ready(&self, ready: bool) {
        *self.ready.write().await = ready;
    }

    pub async fn health(&self) -> HealthResponse {
        let components = self.components.read().await.clone();
        let status = HealthResponse::compute_status(&components);
        HealthResponse { status, components }
    }

    pub async fn readiness(&self) -> ReadinessResponse {
        let ready = *self.ready.read().await;
        let health = self.health().await;

        let reason = if !ready {
            Some("Model not loaded")
        } else if health.status == ComponentStatus::Unhealthy {
            Some("Critical component unhealthy")
        } else {
            None
        };

        ReadinessResponse {
            ready: reason.is_none(),
            reason: reason.map(str::to_string),
        }
    }
}

/// Change to apply to the predictor component
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthTransition {
    Recovered,
    Degraded(String),
    Unhealthy(String),
}

impl HealthTransition {
    pub async fn apply(self, registry: &HealthRegistry, component: &str) {
        match self {
            HealthTransition::Recovered => registry.set_healthy(component).await,
            HealthTransition::Degraded(message) => registry.set_degraded(component, message).await,
            HealthTransition::Unhealthy(message) => {
                registry.set_unhealthy(component, message).await
            }
        }
    }
}

/// Derives predictor health from prediction outcomes
///
/// Only reports transitions, so a steady healthy service never takes the
/// registry write lock.
#[derive(Debug, Default)]
pub struct PredictorHealthTracker {
    consecutive_failures: AtomicU32,
    slow_seen: AtomicU64,
    flagged: AtomicBool,
}

impl PredictorHealthTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a served prediction, given the service's running slow-inference count
    pub fn record_success(&self, slow_inferences: u64) -> Option<HealthTransition> {
        self.consecutive_failures.store(0, Ordering::Relaxed);
        let previous = self.slow_seen.swap(slow_inferences, Ordering::Relaxed);

        if slow_inferences > previous {
            self.flagged.store(true, Ordering::Relaxed);
            return Some(HealthTransition::Degraded(format!(
                "{} inference(s) exceeded the {}ms target",
                slow_inferences - previous,
                MAX_INFERENCE_MS
            )));
        }
        if self.flagged.swap(false, Ordering::Relaxed) {
            Some(HealthTransition::Recovered)
        } else {
            None
        }
    }

    /// Record a failed or timed-out inference
    pub fn record_failure(&self, detail: &str) -> HealthTransition {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        self.flagged.store(true, Ordering::Relaxed);

        if failures >= UNHEALTHY_AFTER_FAILURES {
            HealthTransition::Unhealthy(format!(
                "{} consecutive inference failures, last: {}",
                failures, detail
            ))
        } else {
            HealthTransition::Degraded(detail.to_string())
        }
    }
}
