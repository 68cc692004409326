//! Isolation-forest anomaly detector.
//!
//! Leaves carry the number of training samples that reached them.  The
//! path length of a row through one tree is its split depth plus the
//! expected depth of an unbuilt subtree over the leaf's samples, `c(n)`.
//!
//! ```text
//! score_samples(x) = −2^( −mean_tree(h(x)) / c(max_samples) )
//! anomaly        ⇔  score_samples(x) − offset < 0
//! ```
//!
//! Scores lie in [−1, 0); more negative is more anomalous.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::app::ports::AnomalyDetector;
use crate::error::ModelError;

use super::tree::Tree;
use super::check_row;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationForest {
    n_features: usize,
    /// Subsample size each tree was grown on.
    max_samples: f64,
    /// Decision threshold on `score_samples`.
    offset: f64,
    trees: Vec<Tree<f64>>,
}

impl IsolationForest {
    pub fn new(
        n_features: usize,
        max_samples: f64,
        offset: f64,
        trees: Vec<Tree<f64>>,
    ) -> Result<Self, ModelError> {
        let forest = Self {
            n_features,
            max_samples,
            offset,
            trees,
        };
        forest.validate()?;
        Ok(forest)
    }

    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let forest: Self = serde_json::from_str(json)?;
        forest.validate()?;
        Ok(forest)
    }

    pub fn load(path: &Path) -> Result<Self, ModelError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    fn validate(&self) -> Result<(), ModelError> {
        if self.trees.is_empty() {
            return Err(ModelError::EmptyEnsemble);
        }
        if !self.max_samples.is_finite() || self.max_samples < 2.0 {
            return Err(ModelError::InvalidTree("max_samples must be at least 2"));
        }
        if !self.offset.is_finite() {
            return Err(ModelError::InvalidTree("offset must be finite"));
        }
        for tree in &self.trees {
            tree.validate(self.n_features, |n| {
                if n.is_finite() && *n >= 0.0 {
                    Ok(())
                } else {
                    Err(ModelError::InvalidTree("leaf sample count must be >= 0"))
                }
            })?;
        }
        Ok(())
    }

    fn mean_path_length(&self, row: &[f64]) -> Result<f64, ModelError> {
        let mut total = 0.0;
        for tree in &self.trees {
            let hit = tree.route(row)?;
            total += hit.depth as f64 + average_path_length(*hit.leaf);
        }
        Ok(total / self.trees.len() as f64)
    }
}

impl AnomalyDetector for IsolationForest {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn score_samples(&self, features: &[f64]) -> Result<f64, ModelError> {
        check_row(features, self.n_features)?;
        let depth = self.mean_path_length(features)?;
        Ok(-(2f64.powf(-depth / average_path_length(self.max_samples))))
    }

    fn is_anomaly(&self, features: &[f64]) -> Result<bool, ModelError> {
        Ok(self.score_samples(features)? - self.offset < 0.0)
    }
}

/// Expected path length of an unsuccessful BST search over `n` samples.
pub fn average_path_length(n: f64) -> f64 {
    if n <= 1.0 {
        0.0
    } else if n <= 2.0 {
        1.0
    } else {
        2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
    }
}
