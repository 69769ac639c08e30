//! Model artifact loading
//!
//! Reads a trained model from disk, enforcing a size cap and an optional
//! SHA256 checksum before any parsing happens.

use super::{Classifier, OnnxClassifier, OnnxMetadata, RandomForest};
use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Default maximum artifact size (64MB)
pub const MAX_MODEL_BYTES: usize = 64 * 1024 * 1024;

/// Serialized model format, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    /// JSON tree-array random forest
    Forest,
    /// ONNX graph with a `.meta.json` sidecar
    Onnx,
}

impl ModelFormat {
    pub fn detect(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(ModelFormat::Forest),
            Some(ext) if ext.eq_ignore_ascii_case("onnx") => Ok(ModelFormat::Onnx),
            _ => bail!(
                "Unrecognized model format for {:?}: expected .json or .onnx",
                path
            ),
        }
    }
}

/// Where to load a model from and how to check it
#[derive(Debug, Clone)]
pub struct ModelSource {
    pub path: PathBuf,
    /// Expected SHA256 of the artifact, hex encoded
    pub checksum: Option<String>,
    pub max_model_bytes: usize,
}

impl ModelSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            checksum: None,
            max_model_bytes: MAX_MODEL_BYTES,
        }
    }

    pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.checksum = Some(checksum.into());
        self
    }

    /// Metadata sidecar of an ONNX model: `case.onnx` -> `case.meta.json`
    pub fn metadata_path(&self) -> PathBuf {
        self.path.with_extension("meta.json")
    }
}

/// Load a classifier from disk
pub fn load_classifier(source: &ModelSource) -> Result<Arc<dyn Classifier>> {
    let format = ModelFormat::detect(&source.path)?;
    let bytes = read_artifact(&source.path, source.max_model_bytes)?;

    if let Some(expected) = &source.checksum {
        verify_checksum(&bytes, expected)?;
        debug!(path = %source.path.display(), "Model checksum validated");
    }

    let classifier: Arc<dyn Classifier> = match format {
        ModelFormat::Forest => {
            let forest = RandomForest::from_json(&bytes)
                .with_context(|| format!("Failed to load forest {:?}", source.path))?;
            debug!(trees = forest.n_trees(), "Forest artifact parsed");
            Arc::new(forest)
        }
        ModelFormat::Onnx => {
            let metadata_path = source.metadata_path();
            let metadata_bytes = fs::read(&metadata_path)
                .with_context(|| format!("Failed to read model metadata {:?}", metadata_path))?;
            let metadata = OnnxMetadata::from_json(&metadata_bytes)?;
            Arc::new(
                OnnxClassifier::new(&bytes, metadata)
                    .with_context(|| format!("Failed to load ONNX model {:?}", source.path))?,
            )
        }
    };

    info!(
        path = %source.path.display(),
        size = bytes.len(),
        model_type = %classifier.model_type(),
        version = %classifier.version(),
        "Model artifact loaded"
    );
    Ok(classifier)
}

fn read_artifact(path: &Path, max_bytes: usize) -> Result<Vec<u8>> {
    let size = fs::metadata(path)
        .with_context(|| format!("Failed to stat model file {:?}", path))?
        .len();
    if size > max_bytes as u64 {
        bail!("Model size {} exceeds maximum {}", size, max_bytes);
    }
    fs::read(path).with_context(|| format!("Failed to read model file {:?}", path))
}

/// Check data against an expected hex SHA256
pub fn verify_checksum(data: &[u8], expected: &str) -> Result<()> {
    let computed = compute_checksum(data);
    if !computed.eq_ignore_ascii_case(expected.trim()) {
        bail!("Checksum mismatch: expected {}, got {}", expected, computed);
    }
    Ok(())
}

fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
