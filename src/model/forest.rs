//! Random-forest classifier.
//!
//! Leaves hold per-class weights (sample counts or fractions).  Each
//! tree's leaf is normalised to a distribution and the forest reports
//! the mean over trees, the same soft-voting rule the models were
//! trained with.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::app::ports::Classifier;
use crate::error::ModelError;

use super::tree::Tree;
use super::check_row;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestClassifier {
    classes: Vec<String>,
    n_features: usize,
    trees: Vec<Tree<Vec<f64>>>,
}

impl ForestClassifier {
    /// Build and validate.
    pub fn new(
        classes: Vec<String>,
        n_features: usize,
        trees: Vec<Tree<Vec<f64>>>,
    ) -> Result<Self, ModelError> {
        let forest = Self {
            classes,
            n_features,
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

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    fn validate(&self) -> Result<(), ModelError> {
        if self.classes.is_empty() || self.trees.is_empty() {
            return Err(ModelError::EmptyEnsemble);
        }
        let n_classes = self.classes.len();
        for tree in &self.trees {
            tree.validate(self.n_features, |weights| {
                if weights.len() != n_classes {
                    return Err(ModelError::InvalidTree("leaf width differs from class count"));
                }
                if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
                    return Err(ModelError::InvalidTree("leaf weights must be finite and >= 0"));
                }
                let total: f64 = weights.iter().sum();
                if total <= 0.0 || !total.is_finite() {
                    return Err(ModelError::InvalidTree("leaf weights must have a finite positive sum"));
                }
                Ok(())
            })?;
        }
        Ok(())
    }
}

impl Classifier for ForestClassifier {
    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, ModelError> {
        check_row(features, self.n_features)?;

        let mut proba = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            let hit = tree.route(features)?;
            let total: f64 = hit.leaf.iter().sum();
            for (acc, w) in proba.iter_mut().zip(hit.leaf) {
                *acc += w / total;
            }
        }
        let n = self.trees.len() as f64;
        proba.iter_mut().for_each(|p| *p /= n);
        Ok(proba)
    }
}
