//! Feature schema of a trained model
//!
//! The ordered feature-name list recorded at training time. Raw numeric
//! features keep their column name; one-hot columns are named
//! `"{prefix}{category}"`.

use super::Classifier;
use crate::error::PredictError;
use std::collections::HashMap;

/// Ordered, duplicate-free feature names with O(1) name lookup
#[derive(Debug, Clone)]
pub struct FeatureSchema {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl FeatureSchema {
    /// Load the schema recorded by a trained model
    pub fn load(model: &dyn Classifier) -> Result<Self, PredictError> {
        let names = match model.feature_names() {
            Some(names) if !names.is_empty() => names.to_vec(),
            _ => return Err(PredictError::SchemaUnavailable),
        };

        let schema = Self::from_names(names)?;
        if schema.len() != model.n_features() {
            return Err(PredictError::schema_integrity(
                schema.names.last().cloned().unwrap_or_default(),
                format!(
                    "model records {} feature names but expects {} inputs",
                    schema.len(),
                    model.n_features()
                ),
            ));
        }
        Ok(schema)
    }

    /// Build a schema from an ordered name list, rejecting duplicates
    pub fn from_names(names: Vec<String>) -> Result<Self, PredictError> {
        if names.is_empty() {
            return Err(PredictError::SchemaUnavailable);
        }

        let mut index = HashMap::with_capacity(names.len());
        for (position, name) in names.iter().enumerate() {
            if let Some(first) = index.insert(name.clone(), position) {
                return Err(PredictError::schema_integrity(
                    name.clone(),
                    format!("feature name appears at positions {} and {}", first, position),
                ));
            }
        }

        Ok(Self { names, index })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Positions of every one-hot column built with `prefix`
    pub fn one_hot_indices(&self, prefix: &str) -> Vec<usize> {
        self.names
            .iter()
            .enumerate()
            .filter(|(_, name)| name.starts_with(prefix))
            .map(|(i, _)| i)
            .collect()
    }
}
