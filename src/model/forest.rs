//! Tree Ensembles
//!
//! Inference for tree ensembles exported to JSON by the training pipeline.
//!
//! # JSON Format
//!
//! ```json
//! {
//!   "model_type": "random_forest",
//!   "n_features": 16,
//!   "n_classes": 16,
//!   "trees": [
//!     { "nodes": [
//!       { "feature": 11, "threshold": 24.5, "left": 1, "right": 2, "value": null },
//!       { "feature": -1, "threshold": 0.0, "left": -1, "right": -1, "value": [12.0, 3.0, ...] }
//!     ] }
//!   ]
//! }
//! ```
//!
//! Traversal starts at node 0. `feature == -1` marks a leaf. Otherwise go left
//! when `x[feature] <= threshold` or is NaN, right otherwise.
//!
//! - `random_forest` / `decision_tree` classifier: leaf values are class counts,
//!   normalized per tree and averaged across trees.
//! - `random_forest` regressor: mean of leaf values.
//! - `gradient_boosting` regressor: `init + learning_rate * sum(leaf values)`.

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{ArtifactError, ModelError};
use crate::model::{Classifier, Regressor};

/// A single node in a decision tree
#[derive(Debug, Clone, Deserialize)]
pub struct TreeNode {
    /// Feature index to split on (-1 for leaf nodes)
    pub feature: i32,
    #[serde(default)]
    pub threshold: f64,
    #[serde(default = "no_child")]
    pub left: i32,
    #[serde(default = "no_child")]
    pub right: i32,
    /// Leaf payload (class counts or a single regression value)
    #[serde(default)]
    pub value: Option<Vec<f64>>,
}

fn no_child() -> i32 {
    -1
}

#[derive(Debug, Clone, Deserialize)]
pub struct Tree {
    pub nodes: Vec<TreeNode>,
}

impl Tree {
    /// Check child and feature indices plus leaf payload width
    fn validate(&self, tree: usize, n_features: usize, leaf_width: usize) -> Result<(), ModelError> {
        let malformed = |reason: String| ModelError::MalformedTree { tree, reason };

        if self.nodes.is_empty() {
            return Err(malformed("no nodes".to_string()));
        }

        let n_nodes = self.nodes.len();
        for (i, node) in self.nodes.iter().enumerate() {
            if node.feature < 0 {
                match &node.value {
                    Some(v) if v.len() == leaf_width => {}
                    Some(v) => {
                        return Err(malformed(format!(
                            "leaf {} has {} values, expected {}",
                            i,
                            v.len(),
                            leaf_width
                        )))
                    }
                    None => return Err(malformed(format!("leaf {} has no value", i))),
                }
                continue;
            }

            if node.feature as usize >= n_features {
                return Err(malformed(format!("node {} splits on feature {}", i, node.feature)));
            }
            for child in [node.left, node.right] {
                // Children must come after their parent, which also rules out cycles
                if child <= i as i32 || child as usize >= n_nodes {
                    return Err(malformed(format!("node {} has invalid child {}", i, child)));
                }
            }
        }

        Ok(())
    }

    /// Walk to the leaf reached by `features`
    fn leaf(&self, features: &[f64]) -> &[f64] {
        let mut idx = 0usize;
        loop {
            let node = &self.nodes[idx];
            if node.feature < 0 {
                return node.value.as_deref().unwrap_or(&[]);
            }
            let x = features[node.feature as usize];
            idx = if x.is_nan() || x <= node.threshold {
                node.left as usize
            } else {
                node.right as usize
            };
        }
    }
}

#[derive(Debug, Deserialize)]
struct EnsembleJson {
    model_type: String,
    n_features: usize,
    #[serde(default)]
    n_classes: Option<usize>,
    #[serde(default)]
    learning_rate: Option<f64>,
    #[serde(default)]
    init: Option<f64>,
    #[serde(default)]
    trees: Vec<Tree>,
    /// Single-tree exports carry `tree` instead of `trees`
    #[serde(default)]
    tree: Option<Tree>,
}

impl EnsembleJson {
    fn parse(json: &str, path: &Path) -> Result<Self, ArtifactError> {
        serde_json::from_str(json).map_err(|source| ArtifactError::Parse { path: path.to_path_buf(), source })
    }

    fn into_trees(self) -> Vec<Tree> {
        let mut trees = self.trees;
        if let Some(tree) = self.tree {
            trees.push(tree);
        }
        trees
    }
}

pub(crate) fn read_artifact(path: &Path) -> Result<String, ArtifactError> {
    fs::read_to_string(path).map_err(|source| ArtifactError::Io { path: path.to_path_buf(), source })
}

// ============================================================================
// Classifier
// ============================================================================

/// Random forest (or single decision tree) classifier
#[derive(Debug, Clone)]
pub struct ForestClassifier {
    n_features: usize,
    n_classes: usize,
    trees: Vec<Tree>,
}

impl ForestClassifier {
    /// Load a classifier export from disk
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        Self::from_json_str(&read_artifact(path)?).map_err(|e| e.at(path))
    }

    pub fn from_json_str(json: &str) -> Result<Self, ArtifactError> {
        let model = EnsembleJson::parse(json, Path::new("<classifier>"))?;

        match model.model_type.as_str() {
            "random_forest" | "decision_tree" => {}
            other => return Err(ArtifactError::UnsupportedModelType(other.to_string())),
        }

        let n_features = model.n_features;
        let n_classes = model.n_classes.ok_or(ModelError::NoClasses)?;
        if n_classes == 0 {
            return Err(ModelError::NoClasses.into());
        }

        let trees = model.into_trees();
        if trees.is_empty() {
            return Err(ModelError::MalformedTree { tree: 0, reason: "ensemble has no trees".to_string() }.into());
        }
        for (i, tree) in trees.iter().enumerate() {
            tree.validate(i, n_features, n_classes)?;
        }

        Ok(Self { n_features, n_classes, trees })
    }
}

impl Classifier for ForestClassifier {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, ModelError> {
        if features.len() != self.n_features {
            return Err(ModelError::FeatureCount { expected: self.n_features, actual: features.len() });
        }

        let mut probabilities = vec![0.0; self.n_classes];
        for tree in &self.trees {
            let leaf = tree.leaf(features);
            let total: f64 = leaf.iter().sum();
            if total <= 0.0 {
                continue;
            }
            for (p, count) in probabilities.iter_mut().zip(leaf) {
                *p += count / total;
            }
        }

        let n_trees = self.trees.len() as f64;
        for p in probabilities.iter_mut() {
            *p /= n_trees;
        }

        if probabilities.iter().any(|p| !p.is_finite()) {
            return Err(ModelError::NonFinite);
        }
        Ok(probabilities)
    }
}

// ============================================================================
// Regressor
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
enum Aggregation {
    Mean,
    Boosted { init: f64, learning_rate: f64 },
}

/// Tree-ensemble regressor (random forest mean or gradient boosting sum)
#[derive(Debug, Clone)]
pub struct TreeRegressor {
    n_features: usize,
    aggregation: Aggregation,
    trees: Vec<Tree>,
}

impl TreeRegressor {
    /// Load a regressor export from disk
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        Self::from_json_str(&read_artifact(path)?).map_err(|e| e.at(path))
    }

    pub fn from_json_str(json: &str) -> Result<Self, ArtifactError> {
        let model = EnsembleJson::parse(json, Path::new("<regressor>"))?;

        let aggregation = match model.model_type.as_str() {
            "random_forest" | "decision_tree" => Aggregation::Mean,
            "gradient_boosting" => Aggregation::Boosted {
                init: model.init.unwrap_or(0.0),
                learning_rate: model.learning_rate.unwrap_or(0.1),
            },
            other => return Err(ArtifactError::UnsupportedModelType(other.to_string())),
        };

        let n_features = model.n_features;
        let trees = model.into_trees();
        if trees.is_empty() {
            return Err(ModelError::MalformedTree { tree: 0, reason: "ensemble has no trees".to_string() }.into());
        }
        for (i, tree) in trees.iter().enumerate() {
            tree.validate(i, n_features, 1)?;
        }

        Ok(Self { n_features, aggregation, trees })
    }
}

impl Regressor for TreeRegressor {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, features: &[f64]) -> Result<f64, ModelError> {
        if features.len() != self.n_features {
            return Err(ModelError::FeatureCount { expected: self.n_features, actual: features.len() });
        }

        let sum: f64 = self.trees.iter().map(|t| t.leaf(features)[0]).sum();
        let prediction = match self.aggregation {
            Aggregation::Mean => sum / self.trees.len() as f64,
            Aggregation::Boosted { init, learning_rate } => init + learning_rate * sum,
        };

        if prediction.is_finite() {
            Ok(prediction)
        } else {
            Err(ModelError::NonFinite)
        }
    }
}
