//! Composite health assessment.
//!
//! A stateless call path: one raw 18-field sensor vector in, one fused
//! [`HealthAssessment`] out.  The anomaly detector and the disease
//! classifier each see the standardised vector; their outputs combine
//! into a single 0–100 score.
//!
//! ```text
//!  anomaly_score = clamp(50 − 100·s, 0, 100)
//!  healthy:  score = clamp(100 − anomaly_score, 50, 100)
//!  else:     score = clamp(100 − anomaly_score − (1 − confidence/100)·30, 0, 100)
//! ```
//!
//! Internal arithmetic is full precision; rounding to one decimal
//! happens only when the assessment is built.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::app::ports::{AnomalyDetector, Classifier};
use crate::error::ModelError;
use crate::model::StandardScaler;

/// Disease label that selects the lenient scoring branch.
pub const HEALTHY_LABEL: &str = "healthy";

/// Label reported when no health capability is loaded.
pub const UNKNOWN_LABEL: &str = "unknown";

// ═══════════════════════════════════════════════════════════════
//  Input vector
// ═══════════════════════════════════════════════════════════════

/// Raw wearable reading, one row of the training schema.
///
/// Missing fields deserialize as 0, so partial readings are accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthFeatures {
    pub hour_of_day: f64,
    pub heart_rate: f64,
    pub body_temperature: f64,
    pub accel_magnitude: f64,
    pub gyro_x: f64,
    pub gyro_y: f64,
    pub gyro_z: f64,
    pub ambient_temperature: f64,
    pub humidity: f64,
    pub activity_level: f64,
    pub step_count: f64,
    pub sleep_indicator: f64,
    pub movement_intensity: f64,
    pub distance_meters: f64,
    pub calories_burned: f64,
    pub stress_score: f64,
    pub home_distance_m: f64,
    pub geofence_alert: f64,
}

impl HealthFeatures {
    pub const LEN: usize = 18;

    pub const FIELD_NAMES: [&'static str; Self::LEN] = [
        "hour_of_day",
        "heart_rate",
        "body_temperature",
        "accel_magnitude",
        "gyro_x",
        "gyro_y",
        "gyro_z",
        "ambient_temperature",
        "humidity",
        "activity_level",
        "step_count",
        "sleep_indicator",
        "movement_intensity",
        "distance_meters",
        "calories_burned",
        "stress_score",
        "home_distance_m",
        "geofence_alert",
    ];

    /// Values in model input order.
    pub fn to_array(&self) -> [f64; Self::LEN] {
        [
            self.hour_of_day,
            self.heart_rate,
            self.body_temperature,
            self.accel_magnitude,
            self.gyro_x,
            self.gyro_y,
            self.gyro_z,
            self.ambient_temperature,
            self.humidity,
            self.activity_level,
            self.step_count,
            self.sleep_indicator,
            self.movement_intensity,
            self.distance_meters,
            self.calories_burned,
            self.stress_score,
            self.home_distance_m,
            self.geofence_alert,
        ]
    }
}

// ═══════════════════════════════════════════════════════════════
//  Output record
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthAssessment {
    pub disease_label: String,
    /// Disease classifier confidence (0–100).
    pub confidence: f64,
    /// Normalised anomaly score (0–100, higher is more unusual).
    pub anomaly_score: f64,
    pub is_anomaly: bool,
    /// Fused score (0–100, higher is healthier).
    pub composite_health_score: f64,
    /// Per-class probability (0–100).
    pub class_probabilities: BTreeMap<String, f64>,
}

impl HealthAssessment {
    /// Result when no health capability is available.
    pub fn neutral() -> Self {
        Self {
            disease_label: UNKNOWN_LABEL.to_owned(),
            confidence: 0.0,
            anomaly_score: 0.0,
            is_anomaly: false,
            composite_health_score: 0.0,
            class_probabilities: BTreeMap::new(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Scoring
// ═══════════════════════════════════════════════════════════════

/// Map a raw isolation score (lower = more anomalous) onto 0–100.
pub fn normalize_anomaly_score(raw: f64) -> f64 {
    (50.0 - 100.0 * raw).clamp(0.0, 100.0)
}

/// Fuse anomaly deviation and classifier confidence (both 0–100).
pub fn composite_health_score(label: &str, anomaly_score: f64, confidence_pct: f64) -> f64 {
    if label == HEALTHY_LABEL {
        (100.0 - anomaly_score).clamp(50.0, 100.0)
    } else {
        (100.0 - anomaly_score - (1.0 - confidence_pct / 100.0) * 30.0).clamp(0.0, 100.0)
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

// ═══════════════════════════════════════════════════════════════
//  Capability + assessor
// ═══════════════════════════════════════════════════════════════

/// The anomaly/disease model pair plus the scaler that feeds both.
#[derive(Clone)]
pub struct HealthModels {
    scaler: Option<StandardScaler>,
    anomaly: Arc<dyn AnomalyDetector>,
    disease: Arc<dyn Classifier>,
}

impl HealthModels {
    /// Pair two capabilities; both must accept the 18-field vector.
    pub fn new(
        anomaly: Arc<dyn AnomalyDetector>,
        disease: Arc<dyn Classifier>,
    ) -> Result<Self, ModelError> {
        expect_width(anomaly.n_features())?;
        expect_width(disease.n_features())?;
        Ok(Self {
            scaler: None,
            anomaly,
            disease,
        })
    }

    /// Standardise inputs before both models.
    pub fn with_scaler(mut self, scaler: StandardScaler) -> Result<Self, ModelError> {
        expect_width(scaler.n_features())?;
        self.scaler = Some(scaler);
        Ok(self)
    }

    fn prepare(&self, features: &HealthFeatures) -> Result<Vec<f64>, ModelError> {
        let raw = features.to_array();
        match &self.scaler {
            Some(scaler) => scaler.transform(&raw),
            None => Ok(raw.to_vec()),
        }
    }
}

fn expect_width(got: usize) -> Result<(), ModelError> {
    if got == HealthFeatures::LEN {
        Ok(())
    } else {
        Err(ModelError::ShapeMismatch {
            expected: HealthFeatures::LEN,
            got,
        })
    }
}

/// Stateless assessor over an optional [`HealthModels`] capability.
#[derive(Clone, Default)]
pub struct HealthAssessor {
    models: Option<HealthModels>,
}

impl HealthAssessor {
    pub fn new(models: Option<HealthModels>) -> Self {
        Self { models }
    }

    /// Degraded mode: every call returns [`HealthAssessment::neutral`].
    pub fn absent() -> Self {
        Self { models: None }
    }

    pub fn is_available(&self) -> bool {
        self.models.is_some()
    }

    /// Assess one reading.  Model failures are logged and absorbed into
    /// the neutral assessment.
    pub fn assess(&self, features: &HealthFeatures) -> HealthAssessment {
        match self.try_assess(features) {
            Ok(a) => a,
            Err(e) => {
                warn!("Health assessment failed: {}", e);
                HealthAssessment::neutral()
            }
        }
    }

    /// Assess one reading, surfacing model failures to the caller.
    pub fn try_assess(&self, features: &HealthFeatures) -> Result<HealthAssessment, ModelError> {
        let Some(models) = &self.models else {
            return Ok(HealthAssessment::neutral());
        };
        let row = models.prepare(features)?;

        let raw_score = models.anomaly.score_samples(&row)?;
        let anomaly_score = normalize_anomaly_score(raw_score);
        let is_anomaly = models.anomaly.is_anomaly(&row)?;

        let disease = models.disease.classify(&row)?;
        let confidence = disease.confidence * 100.0;
        let score = composite_health_score(&disease.label, anomaly_score, confidence);

        Ok(HealthAssessment {
            disease_label: disease.label,
            confidence: round1(confidence),
            anomaly_score: round1(anomaly_score),
            is_anomaly,
            composite_health_score: round1(score),
            class_probabilities: disease
                .probabilities
                .into_iter()
                .map(|(label, p)| (label, round1(p * 100.0)))
                .collect(),
        })
    }
}

impl core::fmt::Debug for HealthAssessor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HealthAssessor")
            .field("available", &self.is_available())
            .finish()
    }
}
