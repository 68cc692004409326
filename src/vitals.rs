//! Simulated physiological state and its per-tick evolution.
//!
//! Each tick applies independent random-walk updates to heart rate, body
//! temperature and stress, clamped to physiological bounds, plus a
//! two-phase activity process:
//!
//! ```text
//!            p = 0.05                      otherwise
//!   ┌────────────────────────┐    ┌──────────────────────────┐
//!   │ Burst: activity ←      │    │ Decay: activity ←        │
//!   │   N(50, 20), floor 0   │    │   max(activity − 1, 0)   │
//!   └────────────────────────┘    └──────────────────────────┘
//! ```
//!
//! No state is kept for the activity process beyond the current value.
//! Activity has a floor of zero and no ceiling.

use chrono::{DateTime, Utc};
use rand::Rng;
use rand_distr::StandardNormal;

// ── Bounds ────────────────────────────────────────────────────

pub const HEART_RATE_MIN: f64 = 40.0;
pub const HEART_RATE_MAX: f64 = 200.0;
pub const BODY_TEMP_MIN: f64 = 37.0;
pub const BODY_TEMP_MAX: f64 = 41.0;
pub const STRESS_MIN: f64 = 0.0;
pub const STRESS_MAX: f64 = 100.0;
pub const ACTIVITY_MIN: f64 = 0.0;

// ── Random walk parameters ────────────────────────────────────

const HEART_RATE_SIGMA: f64 = 2.0;
const BODY_TEMP_SIGMA: f64 = 0.1;
const STRESS_SIGMA: f64 = 2.0;

const BURST_PROBABILITY: f64 = 0.05;
const BURST_MEAN: f64 = 50.0;
const BURST_SIGMA: f64 = 20.0;
const DECAY_PER_TICK: f64 = 1.0;

// ── Initial state ─────────────────────────────────────────────

const INITIAL_HEART_RATE: f64 = 80.0;
const INITIAL_BODY_TEMP: f64 = 38.5;
const INITIAL_ACTIVITY: f64 = 10.0;
const INITIAL_STRESS: f64 = 20.0;

/// Mutable vitals of one simulated entity.
///
/// Owned by exactly one session task; nothing else writes it.
#[derive(Debug, Clone, PartialEq)]
pub struct VitalsState {
    pub heart_rate: f64,
    pub body_temperature: f64,
    pub activity_level: f64,
    pub stress_score: f64,
    pub last_update: DateTime<Utc>,
}

impl VitalsState {
    /// Fixed starting point for every new session.
    pub fn initial(now: DateTime<Utc>) -> Self {
        Self {
            heart_rate: INITIAL_HEART_RATE,
            body_temperature: INITIAL_BODY_TEMP,
            activity_level: INITIAL_ACTIVITY,
            stress_score: INITIAL_STRESS,
            last_update: now,
        }
    }

    /// True if every field is inside its bound.
    pub fn within_bounds(&self) -> bool {
        (HEART_RATE_MIN..=HEART_RATE_MAX).contains(&self.heart_rate)
            && (BODY_TEMP_MIN..=BODY_TEMP_MAX).contains(&self.body_temperature)
            && (STRESS_MIN..=STRESS_MAX).contains(&self.stress_score)
            && self.activity_level >= ACTIVITY_MIN
    }

    /// The subset of fields the rolling window keeps.
    pub fn snapshot(&self) -> VitalsSnapshot {
        VitalsSnapshot {
            heart_rate: self.heart_rate,
            body_temperature: self.body_temperature,
            stress_score: self.stress_score,
        }
    }
}

/// One rolling-window entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VitalsSnapshot {
    pub heart_rate: f64,
    pub body_temperature: f64,
    pub stress_score: f64,
}

/// Which branch the activity process took on a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityPhase {
    Burst,
    Decay,
}

/// Advances a [`VitalsState`] by one tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct VitalsEngine;

impl VitalsEngine {
    pub fn new() -> Self {
        Self
    }

    /// Apply one tick of random-walk updates in place.
    pub fn advance<R: Rng + ?Sized>(
        &self,
        state: &mut VitalsState,
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> ActivityPhase {
        state.heart_rate = (state.heart_rate + gaussian(rng, 0.0, HEART_RATE_SIGMA))
            .clamp(HEART_RATE_MIN, HEART_RATE_MAX);
        state.body_temperature = (state.body_temperature + gaussian(rng, 0.0, BODY_TEMP_SIGMA))
            .clamp(BODY_TEMP_MIN, BODY_TEMP_MAX);
        state.stress_score = (state.stress_score + gaussian(rng, 0.0, STRESS_SIGMA))
            .clamp(STRESS_MIN, STRESS_MAX);

        let phase = if rng.gen_bool(BURST_PROBABILITY) {
            // A burst draw can land below zero; the activity floor still holds.
            state.activity_level = gaussian(rng, BURST_MEAN, BURST_SIGMA).max(ACTIVITY_MIN);
            ActivityPhase::Burst
        } else {
            state.activity_level = (state.activity_level - DECAY_PER_TICK).max(ACTIVITY_MIN);
            ActivityPhase::Decay
        };

        state.last_update = now;
        phase
    }
}

fn gaussian<R: Rng + ?Sized>(rng: &mut R, mean: f64, sigma: f64) -> f64 {
    let z: f64 = rng.sample(StandardNormal);
    mean + sigma * z
}
