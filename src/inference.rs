//! Trend inference adapter.
//!
//! Wraps the optional trend classifier.  An absent classifier (failed to
//! load at startup) and a window that is not yet full both produce the
//! same neutral result; that is a normal outcome, not an error.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::app::ports::Classifier;
use crate::error::ModelError;
use crate::window::RollingWindow;

/// Label reported while no prediction is available.
pub const NEUTRAL_LABEL: &str = "analyzing...";

/// Label substituted for a single tick whose classification failed.
pub const ERROR_LABEL: &str = "error";

/// Outcome of one classification call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub label: String,
    /// Probability per class label (0–1).
    pub probabilities: BTreeMap<String, f64>,
    /// Highest class probability (0–1).
    pub confidence: f64,
}

impl ClassificationResult {
    /// "No prediction yet": neutral label, zero confidence.
    pub fn neutral() -> Self {
        Self::empty(NEUTRAL_LABEL)
    }

    /// Placeholder for a tick whose inference call failed.
    pub fn error() -> Self {
        Self::empty(ERROR_LABEL)
    }

    fn empty(label: &str) -> Self {
        Self {
            label: label.to_owned(),
            probabilities: BTreeMap::new(),
            confidence: 0.0,
        }
    }

    /// Build from a class list and matching probability vector.
    ///
    /// Ties resolve to the first class, like an arg-max over the vector.
    pub fn from_distribution(classes: &[String], proba: &[f64]) -> Result<Self, ModelError> {
        if classes.is_empty() {
            return Err(ModelError::EmptyEnsemble);
        }
        if classes.len() != proba.len() {
            return Err(ModelError::ShapeMismatch {
                expected: classes.len(),
                got: proba.len(),
            });
        }

        let mut best = 0;
        for (i, p) in proba.iter().enumerate() {
            if *p > proba[best] {
                best = i;
            }
        }

        Ok(Self {
            label: classes[best].clone(),
            probabilities: classes.iter().cloned().zip(proba.iter().copied()).collect(),
            confidence: proba[best],
        })
    }

    /// Confidence as a 0–100 percentage.
    pub fn confidence_percent(&self) -> f64 {
        self.confidence * 100.0
    }

    pub fn is_neutral(&self) -> bool {
        self.label == NEUTRAL_LABEL
    }
}

/// Trend classification capability, present or absent.
#[derive(Clone, Default)]
pub struct TrendInference {
    classifier: Option<Arc<dyn Classifier>>,
}

impl TrendInference {
    pub fn new(classifier: Option<Arc<dyn Classifier>>) -> Self {
        Self { classifier }
    }

    /// Degraded mode: every call returns the neutral result.
    pub fn absent() -> Self {
        Self { classifier: None }
    }

    pub fn is_available(&self) -> bool {
        self.classifier.is_some()
    }

    /// Classify the current window.
    ///
    /// `Ok(neutral)` while the classifier is absent or the window is not
    /// full.  `Err` only when the classifier itself fails; the caller
    /// decides how to absorb that.
    pub fn classify(&self, window: &RollingWindow) -> Result<ClassificationResult, ModelError> {
        let Some(classifier) = &self.classifier else {
            return Ok(ClassificationResult::neutral());
        };
        if !window.is_full() {
            return Ok(ClassificationResult::neutral());
        }
        let Some(features) = window.extract() else {
            return Ok(ClassificationResult::neutral());
        };
        classifier.classify(&features.to_array())
    }
}

impl core::fmt::Debug for TrendInference {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TrendInference")
            .field("available", &self.is_available())
            .finish()
    }
}
