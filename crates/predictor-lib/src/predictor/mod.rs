//! Prediction engine
//!
//! Request normalization, schema-aligned vector resolution and classifier
//! inference for case outcome prediction.

mod forest;
mod inference;
mod loader;
mod normalizer;
mod output;
mod resolver;
mod schema;
mod service;

pub use forest::{DecisionTree, RandomForest, TREE_LEAF};
pub use inference::{OnnxClassifier, OnnxMetadata};
pub use loader::{load_classifier, verify_checksum, ModelFormat, ModelSource, MAX_MODEL_BYTES};
pub use normalizer::{
    CategoricalPair, FieldKind, FieldSpec, NormalizedRequest, NumericPair, RequestNormalizer,
};
pub use output::{OutputFormatter, LOW_CONFIDENCE_THRESHOLD};
pub use resolver::{FieldOutcome, FieldResolution, ResolutionReport, VectorResolver};
pub use schema::FeatureSchema;
pub use service::{InferenceStats, PredictionService, MAX_INFERENCE_MS};

use anyhow::Result;

/// Trait for trained tabular classifiers
pub trait Classifier: Send + Sync {
    /// Feature names recorded at training time, in input order
    fn feature_names(&self) -> Option<&[String]>;

    /// Width of the input vector the model expects
    fn n_features(&self) -> usize;

    /// Class labels, indexed by class position
    fn class_labels(&self) -> &[String];

    /// Predicted class position for one input vector
    fn predict(&self, features: &[f64]) -> Result<usize>;

    /// Per-class probabilities for one input vector
    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>>;

    fn model_type(&self) -> &str;

    fn version(&self) -> &str;

    /// Training-time importance per feature, aligned to `feature_names`
    fn feature_importances(&self) -> Option<&[f64]> {
        None
    }
}
