//! Pretrained model artifacts.
//!
//! The exported models are plain JSON: a standard scaler, an isolation
//! forest and two random forests.  Every artifact is validated on load so
//! the hot path only has to check the input row.
//!
//! ```text
//!  model_dir/
//!    trend_classifier.json    ─▶ TrendInference   (7 features)
//!    scaler.json           ┐
//!    anomaly_detector.json ├─▶ HealthAssessor     (18 features)
//!    disease_classifier.json┘
//! ```
//!
//! Each capability degrades independently: a missing or malformed file
//! leaves that capability absent and logs one warning.

pub mod forest;
pub mod isolation;
pub mod scaler;
pub mod tree;

use std::sync::Arc;

use log::{info, warn};

pub use forest::ForestClassifier;
pub use isolation::IsolationForest;
pub use scaler::StandardScaler;

use crate::app::ports::{AnomalyDetector, Classifier};
use crate::config::StreamConfig;
use crate::error::ModelError;
use crate::health::{HealthAssessor, HealthModels};
use crate::inference::TrendInference;
use crate::window::TrendFeatures;

/// Reject rows of the wrong width or containing NaN/∞.
pub(crate) fn check_row(row: &[f64], n_features: usize) -> Result<(), ModelError> {
    if row.len() != n_features {
        return Err(ModelError::ShapeMismatch {
            expected: n_features,
            got: row.len(),
        });
    }
    match row.iter().position(|v| !v.is_finite()) {
        Some(idx) => Err(ModelError::NonFiniteFeature(idx)),
        None => Ok(()),
    }
}

/// Every model capability the process loaded at startup.
#[derive(Debug, Clone, Default)]
pub struct ModelSet {
    pub trend: TrendInference,
    pub health: HealthAssessor,
}

impl ModelSet {
    /// Load all artifacts named by `config`.  Never fails; absent
    /// capabilities run in degraded mode.
    pub fn load(config: &StreamConfig) -> Self {
        let trend = match load_trend(config) {
            Ok(classifier) => {
                info!(
                    "Trend classifier loaded ({} classes, {} trees)",
                    classifier.classes().len(),
                    classifier.tree_count()
                );
                TrendInference::new(Some(Arc::new(classifier)))
            }
            Err(e) => {
                warn!(
                    "Trend classifier unavailable ({}): live readings will report no trend",
                    e
                );
                TrendInference::absent()
            }
        };

        let health = match load_health(config) {
            Ok(models) => {
                info!("Health models loaded");
                HealthAssessor::new(Some(models))
            }
            Err(e) => {
                warn!(
                    "Health models unavailable ({}): assessments will be neutral",
                    e
                );
                HealthAssessor::absent()
            }
        };

        Self { trend, health }
    }

    /// Both capabilities absent.
    pub fn absent() -> Self {
        Self::default()
    }
}

fn load_trend(config: &StreamConfig) -> Result<ForestClassifier, ModelError> {
    let classifier = ForestClassifier::load(&config.artifact_path(&config.trend_model))?;
    if classifier.n_features() != TrendFeatures::LEN {
        return Err(ModelError::ShapeMismatch {
            expected: TrendFeatures::LEN,
            got: classifier.n_features(),
        });
    }
    Ok(classifier)
}

fn load_health(config: &StreamConfig) -> Result<HealthModels, ModelError> {
    let scaler = StandardScaler::load(&config.artifact_path(&config.scaler))?;
    let anomaly: Arc<dyn AnomalyDetector> = Arc::new(IsolationForest::load(
        &config.artifact_path(&config.anomaly_model),
    )?);
    let disease: Arc<dyn Classifier> = Arc::new(ForestClassifier::load(
        &config.artifact_path(&config.disease_model),
    )?);
    HealthModels::new(anomaly, disease)?.with_scaler(scaler)
}
