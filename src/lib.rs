//! Per-pet vitals streaming library.
//!
//! Simulates physiological telemetry per entity, classifies its short
//! term trend, fans each reading out to the entity's subscribers and
//! offers a stateless composite health assessment.  The modules are
//! exposed for the binary, integration tests and fuzz targets.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod diagnostics;
pub mod entity;
pub mod error;
pub mod health;
pub mod inference;
pub mod model;
pub mod pubsub;
pub mod scheduler;
pub mod session;
pub mod vitals;
pub mod window;

pub use app::commands::StreamCommand;
pub use app::events::{LIVE_READING_EVENT, TickPayload};
pub use app::service::StreamService;
pub use config::StreamConfig;
pub use entity::{EntityId, Topic};
pub use error::{Error, ModelError, Result};
pub use health::{HealthAssessment, HealthFeatures};
pub use model::ModelSet;
