//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ StreamService (domain)
//! ```
//!
//! Model capabilities, payload sinks, lifecycle observers and config
//! sources implement these traits.  The domain core only sees the trait
//! objects, so every test can swap in a scripted double.

use crate::config::StreamConfig;
use crate::entity::EntityId;
use crate::error::ModelError;
use crate::inference::ClassificationResult;
use crate::vitals::VitalsState;

use super::events::TickPayload;

// ───────────────────────────────────────────────────────────────
// Model capabilities (driven adapters: domain → pretrained models)
// ───────────────────────────────────────────────────────────────

/// A read-only multi-class classifier.
///
/// Implementations must be safe to share across session threads; they
/// are loaded once and never mutated.
pub trait Classifier: Send + Sync {
    /// Class labels, in the order `predict_proba` reports them.
    fn classes(&self) -> &[String];

    /// Width of the input vector the model was trained on.
    fn n_features(&self) -> usize;

    /// Per-class probabilities for one input row.
    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, ModelError>;

    /// Arg-max label, its probability, and the full distribution.
    fn classify(&self, features: &[f64]) -> Result<ClassificationResult, ModelError> {
        let proba = self.predict_proba(features)?;
        ClassificationResult::from_distribution(self.classes(), &proba)
    }
}

/// A read-only anomaly detector producing a raw score and a verdict.
pub trait AnomalyDetector: Send + Sync {
    /// Width of the input vector the model was trained on.
    fn n_features(&self) -> usize;

    /// Raw normality score: lower is more anomalous.
    fn score_samples(&self, features: &[f64]) -> Result<f64, ModelError>;

    /// Binary anomaly verdict for the same input.
    fn is_anomaly(&self, features: &[f64]) -> Result<bool, ModelError>;
}

// ───────────────────────────────────────────────────────────────
// Tick sink (driven adapter: domain → fan-out)
// ───────────────────────────────────────────────────────────────

/// Receives every per-tick payload from every session.
///
/// Called concurrently from session threads.  Implementations must not
/// block on slow consumers.
pub trait TickSink: Send + Sync {
    fn publish(&self, entity: EntityId, payload: &TickPayload);
}

// ───────────────────────────────────────────────────────────────
// Session observer (lifecycle side-channel)
// ───────────────────────────────────────────────────────────────

/// Callback trait the registry invokes around session task lifetimes.
///
/// `on_task_started` runs on the session thread before its first tick;
/// `on_task_exited` runs on the same thread after it observes
/// cancellation.  Counting the two gives the number of live tasks.
pub trait SessionObserver: Send + Sync {
    fn on_task_started(&self, entity: EntityId, initial: &VitalsState);
    fn on_task_exited(&self, entity: EntityId, ticks: u64);
}

// ───────────────────────────────────────────────────────────────
// Configuration port
// ───────────────────────────────────────────────────────────────

/// Loads streaming configuration.
///
/// Implementations MUST validate before returning; invalid ranges are
/// rejected with [`ConfigError::ValidationFailed`], not clamped.
pub trait ConfigPort {
    /// Returns [`StreamConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<StreamConfig, ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug)]
pub enum ConfigError {
    /// No config found at the requested location.
    NotFound,
    /// Stored config failed to deserialize.
    Corrupted,
    /// A config field failed range validation.
    ValidationFailed(&'static str),
    /// Generic I/O error from the backing store.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for ConfigError {}
