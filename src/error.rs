//! Unified error types for the vitals streaming core.
//!
//! A single top-level [`Error`] that every subsystem converts into, with
//! narrower enums per concern.  Nothing on the per-tick streaming path
//! returns these to a caller: tick failures are absorbed into degraded
//! payloads.  They surface only at load time and at thread spawn.

use core::fmt;

pub use crate::app::ports::ConfigError;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the crate funnels into this type.
#[derive(Debug)]
pub enum Error {
    /// A model artifact could not be loaded or evaluated.
    Model(ModelError),
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
    /// The OS refused to create a session thread.
    Spawn(std::io::Error),
    /// The session registry was shut down and accepts no new sessions.
    ShutDown,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Model(e) => write!(f, "model: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Spawn(e) => write!(f, "spawn: {e}"),
            Self::ShutDown => f.write_str("registry is shut down"),
        }
    }
}

impl std::error::Error for Error {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<ModelError> for Error {
    fn from(e: ModelError) -> Self {
        Self::Model(e)
    }
}

// ---------------------------------------------------------------------------
// Model errors
// ---------------------------------------------------------------------------

/// Failures loading or evaluating a model artifact.
#[derive(Debug)]
pub enum ModelError {
    /// The artifact file could not be read.
    Io(std::io::Error),
    /// The artifact is not valid JSON for the expected model family.
    Parse(serde_json::Error),
    /// Input vector width does not match what the model was trained on.
    ShapeMismatch { expected: usize, got: usize },
    /// A tree node references a child or feature outside its bounds.
    InvalidTree(&'static str),
    /// The ensemble contains no trees, or the classifier no classes.
    EmptyEnsemble,
    /// An input feature is NaN or infinite.
    NonFiniteFeature(usize),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Parse(e) => write!(f, "parse error: {e}"),
            Self::ShapeMismatch { expected, got } => {
                write!(f, "expected {expected} features, got {got}")
            }
            Self::InvalidTree(msg) => write!(f, "invalid tree: {msg}"),
            Self::EmptyEnsemble => write!(f, "empty ensemble"),
            Self::NonFiniteFeature(idx) => write!(f, "feature {idx} is not finite"),
        }
    }
}

impl std::error::Error for ModelError {}

impl From<std::io::Error> for ModelError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
