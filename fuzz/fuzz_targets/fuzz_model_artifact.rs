//! Fuzz target: model artifact loading and evaluation
//!
//! Parses arbitrary bytes as each artifact family.  Whatever validation
//! accepts must then evaluate a row of the declared width without
//! panicking or looping.
//!
//! cargo fuzz run fuzz_model_artifact

#![no_main]

use libfuzzer_sys::fuzz_target;
use petvitals::app::ports::{AnomalyDetector, Classifier};
use petvitals::model::{ForestClassifier, IsolationForest, StandardScaler};

fuzz_target!(|data: &[u8]| {
    let Ok(json) = core::str::from_utf8(data) else {
        return;
    };

    if let Ok(forest) = ForestClassifier::from_json(json) {
        let row = vec![0.5; forest.n_features()];
        if let Ok(proba) = forest.predict_proba(&row) {
            assert_eq!(proba.len(), forest.classes().len());
            let sum: f64 = proba.iter().sum();
            assert!((sum - 1.0).abs() < 1e-6, "probabilities sum to {sum}");
        }
    }

    if let Ok(detector) = IsolationForest::from_json(json) {
        let row = vec![0.5; detector.n_features()];
        if let Ok(score) = detector.score_samples(&row) {
            assert!((-1.0..=0.0).contains(&score), "score {score}");
        }
    }

    if let Ok(scaler) = StandardScaler::from_json(json) {
        let row = vec![1.0; scaler.n_features()];
        let _ = scaler.transform(&row);
    }
});
