//! Random forest evaluated from exported tree arrays
//!
//! Each estimator is stored the way scikit-learn lays out a fitted tree:
//! parallel `children_left`, `children_right`, `feature`, `threshold` and
//! `value` arrays indexed by node id, with `-1` marking a leaf. A sample goes
//! left when `x[feature] <= threshold`.

use super::Classifier;
use anyhow::{bail, ensure, Context, Result};
use serde::{Deserialize, Serialize};

/// Child index marking a leaf node
pub const TREE_LEAF: i64 = -1;

fn default_model_type() -> String {
    "random_forest".to_string()
}

fn default_version() -> String {
    "unversioned".to_string()
}

/// One fitted decision tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    /// Per-node class weights; only leaf rows are read
    pub value: Vec<Vec<f64>>,
}

impl DecisionTree {
    pub fn n_nodes(&self) -> usize {
        self.children_left.len()
    }

    pub fn n_leaves(&self) -> usize {
        self.children_left.iter().filter(|&&c| c == TREE_LEAF).count()
    }

    /// Check structure so traversal always terminates on a valid leaf
    fn validate(&self, n_features: usize, n_classes: usize) -> Result<()> {
        let n = self.n_nodes();
        ensure!(n > 0, "tree has no nodes");
        ensure!(
            self.children_right.len() == n
                && self.feature.len() == n
                && self.threshold.len() == n
                && self.value.len() == n,
            "tree arrays have mismatched lengths"
        );

        for node in 0..n {
            let left = self.children_left[node];
            let right = self.children_right[node];

            if left == TREE_LEAF || right == TREE_LEAF {
                ensure!(
                    left == right,
                    "node {} has exactly one child marked as leaf",
                    node
                );
                let row = &self.value[node];
                ensure!(
                    row.len() == n_classes,
                    "leaf {} has {} class weights, expected {}",
                    node,
                    row.len(),
                    n_classes
                );
                ensure!(
                    row.iter().all(|w| w.is_finite() && *w >= 0.0),
                    "leaf {} has a negative or non-finite class weight",
                    node
                );
                ensure!(
                    row.iter().sum::<f64>() > 0.0,
                    "leaf {} carries no class weight",
                    node
                );
                continue;
            }

            // Children always follow their parent, which rules out cycles
            for child in [left, right] {
                ensure!(
                    child > node as i64 && (child as usize) < n,
                    "node {} has out-of-order child {}",
                    node,
                    child
                );
            }
            let feature = self.feature[node];
            ensure!(
                feature >= 0 && (feature as usize) < n_features,
                "node {} splits on feature {} of {}",
                node,
                feature,
                n_features
            );
            ensure!(
                self.threshold[node].is_finite(),
                "node {} has a non-finite threshold",
                node
            );
        }
        Ok(())
    }

    fn leaf_for(&self, sample: &[f64]) -> usize {
        let mut node = 0;
        while self.children_left[node] != TREE_LEAF {
            let feature = self.feature[node] as usize;
            node = if sample[feature] <= self.threshold[node] {
                self.children_left[node] as usize
            } else {
                self.children_right[node] as usize
            };
        }
        node
    }

    /// Class distribution of the leaf the sample lands in
    pub fn predict_proba(&self, sample: &[f64]) -> Vec<f64> {
        let row = &self.value[self.leaf_for(sample)];
        let total: f64 = row.iter().sum();
        row.iter().map(|w| w / total).collect()
    }
}

/// Ensemble of decision trees averaged like a fitted random forest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    #[serde(default = "default_model_type")]
    model_type: String,
    #[serde(default = "default_version")]
    version: String,
    n_features: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    feature_names: Option<Vec<String>>,
    classes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    feature_importances: Option<Vec<f64>>,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn new(
        n_features: usize,
        feature_names: Option<Vec<String>>,
        classes: Vec<String>,
        trees: Vec<DecisionTree>,
    ) -> Result<Self> {
        let forest = Self {
            model_type: default_model_type(),
            version: default_version(),
            n_features,
            feature_names,
            classes,
            feature_importances: None,
            trees,
        };
        forest.validate()?;
        Ok(forest)
    }

    /// Parse and validate a JSON forest artifact
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let forest: Self =
            serde_json::from_slice(bytes).context("Failed to parse forest artifact")?;
        forest.validate()?;
        Ok(forest)
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self).context("Failed to serialize forest artifact")
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_feature_importances(mut self, importances: Vec<f64>) -> Result<Self> {
        ensure!(
            importances.len() == self.n_features,
            "{} importances for {} features",
            importances.len(),
            self.n_features
        );
        self.feature_importances = Some(importances);
        Ok(self)
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    fn validate(&self) -> Result<()> {
        ensure!(self.n_features > 0, "forest declares no input features");
        ensure!(self.classes.len() >= 2, "forest needs at least two classes");
        ensure!(!self.trees.is_empty(), "forest has no trees");

        if let Some(names) = &self.feature_names {
            ensure!(
                names.len() == self.n_features,
                "{} feature names for {} input features",
                names.len(),
                self.n_features
            );
        }
        if let Some(importances) = &self.feature_importances {
            ensure!(
                importances.len() == self.n_features,
                "{} importances for {} features",
                importances.len(),
                self.n_features
            );
        }

        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features, self.classes.len())
                .with_context(|| format!("invalid tree {}", i))?;
        }
        Ok(())
    }

    fn check_input(&self, features: &[f64]) -> Result<()> {
        if features.len() != self.n_features {
            bail!(
                "input has {} features, model expects {}",
                features.len(),
                self.n_features
            );
        }
        if let Some(i) = features.iter().position(|v| !v.is_finite()) {
            bail!("input feature {} is not finite", i);
        }
        Ok(())
    }
}

impl Classifier for RandomForest {
    fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn class_labels(&self) -> &[String] {
        &self.classes
    }

    fn predict(&self, features: &[f64]) -> Result<usize> {
        let proba = self.predict_proba(features)?;
        // First maximum wins, matching numpy argmax
        let mut best = 0;
        for (i, p) in proba.iter().enumerate() {
            if *p > proba[best] {
                best = i;
            }
        }
        Ok(best)
    }

    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>> {
        self.check_input(features)?;
        let mut sum = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            for (acc, p) in sum.iter_mut().zip(tree.predict_proba(features)) {
                *acc += p;
            }
        }
        let n = self.trees.len() as f64;
        Ok(sum.into_iter().map(|s| s / n).collect())
    }

    fn model_type(&self) -> &str {
        &self.model_type
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn feature_importances(&self) -> Option<&[f64]> {
        self.feature_importances.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PredictError;
    use crate::predictor::FeatureSchema;

    fn classes() -> Vec<String> {
        vec!["Not Resolved".to_string(), "Resolved".to_string()]
    }

    /// Split on `feature <= threshold`, leaves weighted `left` / `right`
    fn stump(feature: i64, threshold: f64, left: [f64; 2], right: [f64; 2]) -> DecisionTree {
        DecisionTree {
            children_left: vec![1, -1, -1],
            children_right: vec![2, -1, -1],
            feature: vec![feature, -2, -2],
            threshold: vec![threshold, -2.0, -2.0],
            value: vec![vec![0.0, 0.0], left.to_vec(), right.to_vec()],
        }
    }

    #[test]
    fn test_stump_routes_on_threshold() {
        let tree = stump(0, 10.0, [3.0, 1.0], [1.0, 3.0]);
        assert_eq!(tree.predict_proba(&[10.0]), vec![0.75, 0.25]);
        assert_eq!(tree.predict_proba(&[10.5]), vec![0.25, 0.75]);
        assert_eq!(tree.n_leaves(), 2);
    }

    #[test]
    fn test_forest_averages_trees() {
        let forest = RandomForest::new(
            2,
            None,
            classes(),
            vec![
                stump(0, 0.5, [1.0, 0.0], [0.0, 1.0]),
                stump(1, 0.5, [1.0, 0.0], [0.0, 1.0]),
            ],
        )
        .unwrap();

        assert_eq!(forest.n_trees(), 2);
        assert_eq!(forest.predict_proba(&[1.0, 0.0]).unwrap(), vec![0.5, 0.5]);
        assert_eq!(forest.predict_proba(&[1.0, 1.0]).unwrap(), vec![0.0, 1.0]);
        assert_eq!(forest.predict(&[1.0, 1.0]).unwrap(), 1);
    }

    #[test]
    fn test_ties_pick_first_class() {
        let forest = RandomForest::new(
            2,
            None,
            classes(),
            vec![
                stump(0, 0.5, [1.0, 0.0], [0.0, 1.0]),
                stump(1, 0.5, [1.0, 0.0], [0.0, 1.0]),
            ],
        )
        .unwrap();
        assert_eq!(forest.predict(&[1.0, 0.0]).unwrap(), 0);
    }

    #[test]
    fn test_input_width_checked() {
        let forest =
            RandomForest::new(2, None, classes(), vec![stump(0, 0.5, [1.0, 0.0], [0.0, 1.0])])
                .unwrap();
        let err = forest.predict_proba(&[1.0]).unwrap_err();
        assert!(err.to_string().contains("expects 2"));
        assert!(forest.predict_proba(&[f64::NAN, 0.0]).is_err());
    }

    #[test]
    fn test_rejects_backward_child() {
        let mut tree = stump(0, 0.5, [1.0, 0.0], [0.0, 1.0]);
        tree.children_right[0] = 0;
        assert!(RandomForest::new(1, None, classes(), vec![tree]).is_err());
    }

    #[test]
    fn test_rejects_split_feature_out_of_range() {
        let tree = stump(3, 0.5, [1.0, 0.0], [0.0, 1.0]);
        assert!(RandomForest::new(2, None, classes(), vec![tree]).is_err());
    }

    #[test]
    fn test_rejects_leaf_width_mismatch() {
        let mut tree = stump(0, 0.5, [1.0, 0.0], [0.0, 1.0]);
        tree.value[1] = vec![1.0, 0.0, 0.0];
        assert!(RandomForest::new(1, None, classes(), vec![tree]).is_err());
    }

    #[test]
    fn test_rejects_empty_forest() {
        assert!(RandomForest::new(1, None, classes(), Vec::new()).is_err());
    }

    #[test]
    fn test_feature_names_must_match_width() {
        let tree = stump(0, 0.5, [1.0, 0.0], [0.0, 1.0]);
        let result = RandomForest::new(2, Some(vec!["age".to_string()]), classes(), vec![tree]);
        assert!(result.is_err());
    }

    #[test]
    fn test_from_json_artifact() {
        let artifact = br#"{
            "version": "rf-2024.1",
            "n_features": 2,
            "feature_names": ["age", "escalated"],
            "classes": ["Not Resolved", "Resolved"],
            "feature_importances": [0.7, 0.3],
            "trees": [{
                "children_left": [1, -1, -1],
                "children_right": [2, -1, -1],
                "feature": [1, -2, -2],
                "threshold": [0.5, -2.0, -2.0],
                "value": [[5.0, 5.0], [1.0, 4.0], [4.0, 1.0]]
            }]
        }"#;
        let forest = RandomForest::from_json(artifact).unwrap();
        assert_eq!(forest.model_type(), "random_forest");
        assert_eq!(forest.version(), "rf-2024.1");
        assert_eq!(forest.feature_importances(), Some(&[0.7, 0.3][..]));
        assert_eq!(forest.predict(&[40.0, 0.0]).unwrap(), 1);
        assert_eq!(forest.predict(&[40.0, 1.0]).unwrap(), 0);
    }

    #[test]
    fn test_json_round_trip_keeps_predictions() {
        let forest = RandomForest::new(
            1,
            Some(vec!["age".to_string()]),
            classes(),
            vec![stump(0, 30.0, [2.0, 1.0], [1.0, 2.0])],
        )
        .unwrap()
        .with_version("v7");
        let reloaded = RandomForest::from_json(&forest.to_json().unwrap()).unwrap();
        assert_eq!(reloaded.version(), "v7");
        assert_eq!(
            reloaded.predict_proba(&[45.0]).unwrap(),
            forest.predict_proba(&[45.0]).unwrap()
        );
    }

    #[test]
    fn test_schema_load_requires_feature_names() {
        let forest =
            RandomForest::new(1, None, classes(), vec![stump(0, 0.5, [1.0, 0.0], [0.0, 1.0])])
                .unwrap();
        assert_eq!(
            FeatureSchema::load(&forest).unwrap_err(),
            PredictError::SchemaUnavailable
        );
    }

    #[test]
    fn test_schema_load_rejects_duplicate_names() {
        let forest = RandomForest::new(
            2,
            Some(vec!["age".to_string(), "age".to_string()]),
            classes(),
            vec![stump(0, 0.5, [1.0, 0.0], [0.0, 1.0])],
        )
        .unwrap();
        assert!(matches!(
            FeatureSchema::load(&forest),
            Err(PredictError::SchemaIntegrity { .. })
        ));
    }
}
