//! Model artifacts on disk → ModelSet → health assessment and trend labels.

use std::path::PathBuf;
use std::time::Duration;

use serde_json::json;

use petvitals::app::service::StreamService;
use petvitals::config::StreamConfig;
use petvitals::health::{HealthFeatures, composite_health_score, normalize_anomaly_score};
use petvitals::model::ModelSet;
use petvitals::model::isolation::average_path_length;
use petvitals::StreamCommand;

use crate::mocks::id;

/// Scratch model directory, removed on drop.
struct ModelDir(PathBuf);

impl ModelDir {
    fn new(tag: &str) -> Self {
        let dir = std::env::temp_dir().join(format!(
            "petvitals-models-{}-{}",
            tag,
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        Self(dir)
    }

    fn write(&self, name: &str, value: &serde_json::Value) {
        std::fs::write(self.0.join(name), value.to_string()).unwrap();
    }

    fn config(&self) -> StreamConfig {
        StreamConfig {
            model_dir: self.0.clone(),
            tick_interval_ms: 10,
            ..StreamConfig::default()
        }
    }
}

impl Drop for ModelDir {
    fn drop(&mut self) {
        std::fs::remove_dir_all(&self.0).ok();
    }
}

/// Identity scaler, so split thresholds below are in raw units.
fn scaler() -> serde_json::Value {
    json!({ "mean": vec![0.0; 18], "scale": vec![1.0; 18] })
}

/// Heart rate above 150 is isolated after one split.
fn anomaly_detector() -> serde_json::Value {
    json!({
        "n_features": 18, "max_samples": 256.0, "offset": -0.5,
        "trees": [{ "nodes": [
            { "feature": 1, "threshold": 150.0, "left": 1, "right": 2 },
            { "leaf": 200.0 },
            { "leaf": 1.0 }
        ]}]
    })
}

/// Body temperature above 39.5 reads as fever.
fn disease_classifier() -> serde_json::Value {
    json!({
        "classes": ["fever", "healthy"], "n_features": 18,
        "trees": [{ "nodes": [
            { "feature": 2, "threshold": 39.5, "left": 1, "right": 2 },
            { "leaf": [1.0, 9.0] },
            { "leaf": [8.0, 2.0] }
        ]}]
    })
}

fn trend_classifier() -> serde_json::Value {
    json!({
        "classes": ["anxiety_attack", "fever_onset", "healthy"], "n_features": 7,
        "trees": [{ "nodes": [
            { "feature": 0, "threshold": 1000.0, "left": 1, "right": 2 },
            { "leaf": [0.0, 1.0, 3.0] },
            { "leaf": [1.0, 0.0, 0.0] }
        ]}]
    })
}

fn full_model_dir(tag: &str) -> ModelDir {
    let dir = ModelDir::new(tag);
    dir.write("scaler.json", &scaler());
    dir.write("anomaly_detector.json", &anomaly_detector());
    dir.write("disease_classifier.json", &disease_classifier());
    dir.write("trend_classifier.json", &trend_classifier());
    dir
}

fn raw_score(depth: f64, leaf_samples: f64) -> f64 {
    -(2f64.powf(-(depth + average_path_length(leaf_samples)) / average_path_length(256.0)))
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

#[test]
fn healthy_reading_through_loaded_models() {
    let dir = full_model_dir("healthy");
    let models = ModelSet::load(&dir.config());
    assert!(models.health.is_available());
    assert!(models.trend.is_available());

    let out = models.health.assess(&HealthFeatures {
        heart_rate: 90.0,
        body_temperature: 38.7,
        ..HealthFeatures::default()
    });

    let anomaly = normalize_anomaly_score(raw_score(1.0, 200.0));
    assert_eq!(out.disease_label, "healthy");
    assert_eq!(out.confidence, 90.0);
    assert_eq!(out.anomaly_score, round1(anomaly));
    assert!(!out.is_anomaly);
    assert_eq!(
        out.composite_health_score,
        round1(composite_health_score("healthy", anomaly, 90.0))
    );
    assert!((50.0..=100.0).contains(&out.composite_health_score));
    assert_eq!(out.class_probabilities["fever"], 10.0);
    assert_eq!(out.class_probabilities["healthy"], 90.0);
}

#[test]
fn feverish_outlier_through_loaded_models() {
    let dir = full_model_dir("fever");
    let models = ModelSet::load(&dir.config());

    let out = models.health.assess(&HealthFeatures {
        heart_rate: 180.0,
        body_temperature: 40.2,
        ..HealthFeatures::default()
    });

    let anomaly = normalize_anomaly_score(raw_score(1.0, 1.0));
    assert_eq!(out.disease_label, "fever");
    assert_eq!(out.confidence, 80.0);
    assert!(out.is_anomaly);
    assert_eq!(out.anomaly_score, round1(anomaly));
    assert_eq!(
        out.composite_health_score,
        round1(composite_health_score("fever", anomaly, 80.0))
    );
}

#[test]
fn missing_health_artifact_degrades_only_health() {
    let dir = full_model_dir("partial");
    std::fs::remove_file(dir.0.join("anomaly_detector.json")).unwrap();

    let models = ModelSet::load(&dir.config());
    assert!(models.trend.is_available());
    assert!(!models.health.is_available());

    let out = models.health.assess(&HealthFeatures {
        heart_rate: 199.0,
        ..HealthFeatures::default()
    });
    assert_eq!(out.disease_label, "unknown");
    assert_eq!(out.composite_health_score, 0.0);
    assert!(!out.is_anomaly);
    assert!(out.class_probabilities.is_empty());
}

#[test]
fn malformed_or_misshapen_artifacts_degrade() {
    let dir = full_model_dir("broken");
    dir.write("trend_classifier.json", &json!({"classes": "nope"}));
    // A disease model trained on the wrong width is rejected at load.
    dir.write(
        "disease_classifier.json",
        &json!({
            "classes": ["healthy"], "n_features": 7,
            "trees": [{ "nodes": [{ "leaf": [1.0] }] }]
        }),
    );

    let models = ModelSet::load(&dir.config());
    assert!(!models.trend.is_available());
    assert!(!models.health.is_available());
}

#[test]
fn loaded_trend_model_labels_live_readings() {
    let dir = full_model_dir("trend");
    let config = dir.config();
    let svc = StreamService::new(&config, ModelSet::load(&config));
    let sub = svc.connect();
    svc.handle_command(&sub, StreamCommand::Subscribe(id(12))).unwrap();

    let frames: Vec<_> = (0..6)
        .map(|_| sub.recv_timeout(Duration::from_secs(2)).expect("no reading"))
        .collect();
    svc.shutdown();

    assert_eq!(frames[3].trend_label, "analyzing...");
    assert_eq!(frames[4].trend_label, "healthy");
    assert_eq!(frames[5].trend_confidence, 75.0);
}
