//! Portable random-forest classifier.
//!
//! Forests are exported offline to JSON:
//!
//! ```json
//! {
//!   "n_features": 6,
//!   "trees": [
//!     {
//!       "nodes": [
//!         {"feature": 5, "threshold": 0.21, "left": 1, "right": 2},
//!         {"value": [48.0, 2.0]},
//!         {"value": [1.0, 99.0]}
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! Leaf `value`s are class weights `[fake, genuine]`. Traversal goes left when
//! `x[feature] <= threshold`, and the forest probability is the unweighted mean
//! of the per-tree leaf probabilities.

use crate::error::{ClassifierError, ResourceLoadError};
use crate::models::classifier::Classifier;
use crate::types::banknote::{FeatureVector, FEATURE_COUNT};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Tree node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: [f64; 2],
    },
}

impl Node {
    pub fn split(feature: usize, threshold: f64, left: usize, right: usize) -> Self {
        Node::Split {
            feature,
            threshold,
            left,
            right,
        }
    }

    pub fn leaf(fake: f64, genuine: f64) -> Self {
        Node::Leaf {
            value: [fake, genuine],
        }
    }
}

/// Single decision tree, root at index 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// P(genuine) at the leaf reached by `x`
    pub fn predict(&self, x: &FeatureVector) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if x[*feature] <= *threshold { *left } else { *right };
                }
                Node::Leaf { value } => return value[1] / (value[0] + value[1]),
            }
        }
    }

    /// Children must point forward so every walk terminates
    fn validate(&self) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }

        for (index, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= FEATURE_COUNT {
                        return Err(format!("node {} splits on unknown feature {}", index, feature));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {} has a non-finite threshold", index));
                    }
                    for &child in [left, right] {
                        if child <= index || child >= self.nodes.len() {
                            return Err(format!("node {} has invalid child {}", index, child));
                        }
                    }
                }
                Node::Leaf { value } => {
                    let valid = value.iter().all(|w| w.is_finite() && *w >= 0.0)
                        && value[0] + value[1] > 0.0;
                    if !valid {
                        return Err(format!("leaf {} has invalid class weights {:?}", index, value));
                    }
                }
            }
        }

        Ok(())
    }
}

/// Ensemble of decision trees averaged into P(genuine)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    n_features: usize,
    trees: Vec<Tree>,
}

impl RandomForest {
    /// Build a forest, validating every tree
    pub fn new(trees: Vec<Tree>) -> Result<Self, String> {
        let forest = Self {
            n_features: FEATURE_COUNT,
            trees,
        };
        forest.validate()?;
        Ok(forest)
    }

    /// Load a forest from a JSON artifact
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ResourceLoadError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| ResourceLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let forest: RandomForest =
            serde_json::from_slice(&bytes).map_err(|e| ResourceLoadError::Corrupt {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        forest.validate().map_err(|reason| ResourceLoadError::Corrupt {
            path: path.to_path_buf(),
            reason,
        })?;

        info!(
            path = %path.display(),
            trees = forest.tree_count(),
            "Random forest loaded"
        );

        Ok(forest)
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    /// P(genuine) for one scaled row
    pub fn predict_one(&self, x: &FeatureVector) -> f64 {
        let sum: f64 = self.trees.iter().map(|tree| tree.predict(x)).sum();
        sum / self.trees.len() as f64
    }

    fn validate(&self) -> Result<(), String> {
        if self.n_features != FEATURE_COUNT {
            return Err(format!(
                "forest expects {} features, service provides {}",
                self.n_features, FEATURE_COUNT
            ));
        }
        if self.trees.is_empty() {
            return Err("forest has no trees".to_string());
        }

        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate().map_err(|e| format!("tree {}: {}", i, e))?;
        }

        Ok(())
    }
}

impl Classifier for RandomForest {
    fn kind(&self) -> &'static str {
        "random_forest"
    }

    fn predict_genuine(&self, rows: &[FeatureVector]) -> Result<Vec<f64>, ClassifierError> {
        Ok(rows.iter().map(|row| self.predict_one(row)).collect())
    }
}
