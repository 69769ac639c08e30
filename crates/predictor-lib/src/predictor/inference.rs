//! ONNX inference using tract
//!
//! Serves classifiers exported to ONNX with a `label` output (int64, one
//! value per row) and a `probabilities` output (float, `[1, n_classes]`).
//! ONNX graphs do not carry the training feature names, so they are read
//! from a metadata sidecar next to the model file.

use super::Classifier;
use anyhow::{bail, ensure, Context, Result};
use serde::{Deserialize, Serialize};
use tract_onnx::prelude::*;
use tracing::debug;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Sidecar metadata for an ONNX classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnnxMetadata {
    #[serde(default = "default_onnx_version")]
    pub version: String,
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
    pub n_features: usize,
    pub classes: Vec<String>,
    #[serde(default)]
    pub feature_importances: Option<Vec<f64>>,
}

fn default_onnx_version() -> String {
    "unversioned".to_string()
}

impl OnnxMetadata {
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let metadata: Self =
            serde_json::from_slice(bytes).context("Failed to parse ONNX metadata")?;
        ensure!(metadata.n_features > 0, "metadata declares no input features");
        ensure!(metadata.classes.len() >= 2, "metadata needs at least two classes");
        if let Some(names) = &metadata.feature_names {
            ensure!(
                names.len() == metadata.n_features,
                "{} feature names for {} input features",
                names.len(),
                metadata.n_features
            );
        }
        Ok(metadata)
    }
}

/// ONNX-based classifier using tract for lightweight inference
pub struct OnnxClassifier {
    model: TractModel,
    metadata: OnnxMetadata,
}

impl OnnxClassifier {
    /// Create a classifier from model bytes and its metadata
    pub fn new(model_bytes: &[u8], metadata: OnnxMetadata) -> Result<Self> {
        let model = Self::load_model(model_bytes, metadata.n_features)?;
        debug!(
            n_features = metadata.n_features,
            classes = metadata.classes.len(),
            "ONNX classifier loaded"
        );
        Ok(Self { model, metadata })
    }

    /// Load and optimize an ONNX model from bytes
    fn load_model(model_bytes: &[u8], n_features: usize) -> Result<TractModel> {
        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .context("Failed to parse ONNX model")?
            .with_input_fact(0, f32::fact([1, n_features]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;
        Ok(model)
    }

    fn run(&self, features: &[f64]) -> Result<TVec<TValue>> {
        if features.len() != self.metadata.n_features {
            bail!(
                "input has {} features, model expects {}",
                features.len(),
                self.metadata.n_features
            );
        }
        let data: Vec<f32> = features.iter().map(|v| *v as f32).collect();
        let input: Tensor = tract_ndarray::Array2::from_shape_vec((1, data.len()), data)
            .context("Failed to shape input tensor")?
            .into();
        self.model.run(tvec!(input.into()))
    }
}

impl Classifier for OnnxClassifier {
    fn feature_names(&self) -> Option<&[String]> {
        self.metadata.feature_names.as_deref()
    }

    fn n_features(&self) -> usize {
        self.metadata.n_features
    }

    fn class_labels(&self) -> &[String] {
        &self.metadata.classes
    }

    fn predict(&self, features: &[f64]) -> Result<usize> {
        let outputs = self.run(features)?;
        let label = outputs.first().context("No label output from model")?;
        let view = label.to_array_view::<i64>()?;
        let class = *view.iter().next().context("Empty label output")?;
        ensure!(
            class >= 0 && (class as usize) < self.metadata.classes.len(),
            "model predicted unknown class {}",
            class
        );
        Ok(class as usize)
    }

    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>> {
        let outputs = self.run(features)?;
        let proba = outputs.get(1).context("No probability output from model")?;
        let view = proba.to_array_view::<f32>()?;
        Ok(view.iter().map(|p| *p as f64).collect())
    }

    fn model_type(&self) -> &str {
        "onnx"
    }

    fn version(&self) -> &str {
        &self.metadata.version
    }

    fn feature_importances(&self) -> Option<&[f64]> {
        self.metadata.feature_importances.as_deref()
    }
}
