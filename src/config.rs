//! Streaming configuration parameters.
//!
//! All tunable parameters for the vitals streaming core.  Values come
//! from a JSON file through a [`ConfigPort`](crate::app::ports::ConfigPort)
//! adapter; every field has a default so partial files are accepted.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;

/// Shortest accepted tick period.
const MIN_TICK_MS: u32 = 10;
/// Longest accepted tick period.
const MAX_TICK_MS: u32 = 60_000;
/// Smallest stack we will hand to a session thread.
const MIN_STACK_KB: usize = 16;
/// Largest stack we will hand to a session thread.
const MAX_STACK_KB: usize = 16 * 1024;

/// Core streaming configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    // --- Timing ---
    /// Wall-clock spacing between session ticks (milliseconds).
    pub tick_interval_ms: u32,

    // --- Model artifacts ---
    /// Directory holding the exported model artifacts.
    pub model_dir: PathBuf,
    /// Trend classifier file (7-field rolling statistics input).
    pub trend_model: String,
    /// Standard scaler applied before both health models.
    pub scaler: String,
    /// Isolation-forest anomaly detector.
    pub anomaly_model: String,
    /// Random-forest disease classifier.
    pub disease_model: String,

    // --- Sessions ---
    /// Stop an entity's simulation when its last subscriber leaves.
    pub stop_on_last_unsubscribe: bool,
    /// Fixed RNG seed for reproducible runs.  `None` seeds from entropy.
    pub rng_seed: Option<u64>,
    /// Stack size for each session thread (KiB).
    pub session_stack_kb: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000, // 1 Hz

            model_dir: PathBuf::from("models"),
            trend_model: "trend_classifier.json".into(),
            scaler: "scaler.json".into(),
            anomaly_model: "anomaly_detector.json".into(),
            disease_model: "disease_classifier.json".into(),

            stop_on_last_unsubscribe: true,
            rng_seed: None,
            session_stack_kb: 64,
        }
    }
}

impl StreamConfig {
    /// Range-check every field.  Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_TICK_MS..=MAX_TICK_MS).contains(&self.tick_interval_ms) {
            return Err(ConfigError::ValidationFailed(
                "tick_interval_ms must be within 10..=60000",
            ));
        }
        if !(MIN_STACK_KB..=MAX_STACK_KB).contains(&self.session_stack_kb) {
            return Err(ConfigError::ValidationFailed(
                "session_stack_kb must be within 16..=16384",
            ));
        }
        if self.trend_model.is_empty()
            || self.scaler.is_empty()
            || self.anomaly_model.is_empty()
            || self.disease_model.is_empty()
        {
            return Err(ConfigError::ValidationFailed(
                "model artifact file names must not be empty",
            ));
        }
        Ok(())
    }

    /// Parse and validate a JSON document.  Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|_| ConfigError::Corrupted)?;
        config.validate()?;
        Ok(config)
    }

    /// Full path of a model artifact inside `model_dir`.
    pub fn artifact_path(&self, file: &str) -> PathBuf {
        self.model_dir.join(file)
    }

    /// Session thread stack in bytes.  Unvalidated values are clamped
    /// into the accepted range.
    pub fn session_stack_bytes(&self) -> usize {
        self.session_stack_kb.clamp(MIN_STACK_KB, MAX_STACK_KB) * 1024
    }

    /// Tick period as a [`Duration`](std::time::Duration).
    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(u64::from(self.tick_interval_ms))
    }
}
