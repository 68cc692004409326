//! petvitals: live vitals streaming demo host.
//!
//! Hexagonal layout with a logging transport standing in for the
//! network-facing one.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  JsonConfigFile (ConfigPort)      LogTransport (subscribers)   │
//! │  ModelSet (Classifier · AnomalyDetector)                       │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              StreamService                             │    │
//! │  │  Broker · SessionRegistry · HealthAssessor             │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  one "session-E" thread per streamed entity                    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Usage: `petvitals [config.json]`.  `PETVITALS_ENTITIES` (comma
//! separated ids, default `1`) and `PETVITALS_RUN_SECS` (default 10)
//! control the demo run.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use log::{info, warn};

use petvitals::adapters::config_file::JsonConfigFile;
use petvitals::adapters::log_sink::LogTransport;
use petvitals::app::ports::ConfigPort;
use petvitals::{EntityId, HealthFeatures, ModelSet, StreamConfig, StreamService};

const DEFAULT_CONFIG_PATH: &str = "petvitals.json";
const DEFAULT_RUN_SECS: u64 = 10;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("petvitals v{}", env!("CARGO_PKG_VERSION"));

    // ── Configuration ─────────────────────────────────────────
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_owned());
    let config: StreamConfig = JsonConfigFile::new(&config_path)
        .load()
        .with_context(|| format!("loading config from {config_path}"))?;

    let entities = parse_entities(
        &std::env::var("PETVITALS_ENTITIES").unwrap_or_else(|_| "1".to_owned()),
    )?;
    let run_secs = match std::env::var("PETVITALS_RUN_SECS") {
        Ok(v) => v
            .trim()
            .parse::<u64>()
            .with_context(|| format!("PETVITALS_RUN_SECS={v:?} is not a number"))?,
        Err(_) => DEFAULT_RUN_SECS,
    };

    // ── Models + service ──────────────────────────────────────
    let models = ModelSet::load(&config);
    let service = Arc::new(StreamService::new(&config, models));

    let sample = service.assess_health(&sample_reading());
    info!("Sample health assessment: {}", serde_json::to_string(&sample)?);

    // ── Stream ────────────────────────────────────────────────
    let transport = LogTransport::spawn(service.clone(), &entities)
        .context("starting log transport")?;
    info!("Streaming {:?} for {}s", entities, run_secs);
    std::thread::sleep(Duration::from_secs(run_secs));

    let logged = transport.stop();
    let joined = service.shutdown();
    let metrics = service.metrics();
    if metrics.frames_dropped > 0 {
        warn!("{} frames dropped on full subscriber queues", metrics.frames_dropped);
    }
    info!(
        "Done: {} payloads logged, {} session threads joined",
        logged, joined
    );
    println!("{}", serde_json::to_string_pretty(&metrics)?);
    Ok(())
}

fn parse_entities(raw: &str) -> Result<Vec<EntityId>> {
    let mut ids = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let n: u64 = part
            .parse()
            .with_context(|| format!("invalid entity id {part:?}"))?;
        match EntityId::new(n) {
            Some(id) if !ids.contains(&id) => ids.push(id),
            Some(_) => {}
            None => bail!("entity id 0 is reserved"),
        }
    }
    if ids.is_empty() {
        bail!("PETVITALS_ENTITIES names no entities");
    }
    Ok(ids)
}

/// A resting, healthy-looking reading for the startup self-check.
fn sample_reading() -> HealthFeatures {
    HealthFeatures {
        hour_of_day: 14.0,
        heart_rate: 85.0,
        body_temperature: 38.6,
        accel_magnitude: 1.0,
        ambient_temperature: 22.0,
        humidity: 45.0,
        activity_level: 12.0,
        step_count: 40.0,
        movement_intensity: 0.2,
        distance_meters: 25.0,
        calories_burned: 3.0,
        stress_score: 18.0,
        home_distance_m: 5.0,
        ..HealthFeatures::default()
    }
}
