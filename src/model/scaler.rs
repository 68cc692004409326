//! Per-feature standardisation fitted on the training set.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

use super::check_row;

/// `(x − mean) / scale`, feature by feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self, ModelError> {
        let scaler = Self { mean, scale };
        scaler.validate()?;
        Ok(scaler)
    }

    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let scaler: Self = serde_json::from_str(json)?;
        scaler.validate()?;
        Ok(scaler)
    }

    pub fn load(path: &Path) -> Result<Self, ModelError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn transform(&self, row: &[f64]) -> Result<Vec<f64>, ModelError> {
        check_row(row, self.mean.len())?;
        Ok(row
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (m, s))| (x - m) / effective_scale(*s))
            .collect())
    }

    fn validate(&self) -> Result<(), ModelError> {
        if self.mean.len() != self.scale.len() {
            return Err(ModelError::ShapeMismatch {
                expected: self.mean.len(),
                got: self.scale.len(),
            });
        }
        if self.mean.is_empty() {
            return Err(ModelError::EmptyEnsemble);
        }
        if let Some(idx) = self
            .mean
            .iter()
            .chain(&self.scale)
            .position(|v| !v.is_finite())
        {
            return Err(ModelError::NonFiniteFeature(idx % self.mean.len()));
        }
        Ok(())
    }
}

/// Constant training features were fitted with scale 0; divide by 1 instead.
fn effective_scale(s: f64) -> f64 {
    if s == 0.0 { 1.0 } else { s }
}
