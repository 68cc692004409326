//! Per-entity simulation session.
//!
//! A [`Session`] owns everything one entity's task mutates: the vitals
//! state, the rolling window and the RNG.  It is moved into the session
//! thread on start and dropped when that thread exits, so none of it is
//! ever shared.
//!
//! ```text
//!   tick(now)
//!     │  VitalsEngine::advance      state ← state + noise (clamped)
//!     │  RollingWindow::push        window ← snapshot
//!     │  TrendInference::classify   neutral / label / error
//!     ▼
//!   TickPayload
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use log::warn;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::app::events::TickPayload;
use crate::entity::EntityId;
use crate::error::ModelError;
use crate::inference::{ClassificationResult, TrendInference};
use crate::vitals::{ActivityPhase, VitalsEngine, VitalsState};
use crate::window::RollingWindow;

// ── Cancellation ──────────────────────────────────────────────

/// Cooperative cancellation flag shared by the registry and one task.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

// ── Session ───────────────────────────────────────────────────

/// Result of one tick.
#[derive(Debug)]
pub struct TickOutcome {
    pub payload: TickPayload,
    pub phase: ActivityPhase,
    /// Set when the trend classifier failed on this tick.  The payload
    /// then carries the error label.
    pub inference_error: Option<ModelError>,
}

#[derive(Debug)]
pub struct Session {
    entity: EntityId,
    state: VitalsState,
    window: RollingWindow,
    engine: VitalsEngine,
    rng: StdRng,
    ticks: u64,
}

impl Session {
    /// Fresh session at the fixed initial vitals with an empty window.
    ///
    /// With a `seed` the RNG is derived from `seed ^ entity_id`, so each
    /// entity gets its own reproducible stream.
    pub fn new(entity: EntityId, seed: Option<u64>, now: DateTime<Utc>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ entity.get()),
            None => StdRng::from_entropy(),
        };
        Self {
            entity,
            state: VitalsState::initial(now),
            window: RollingWindow::new(),
            engine: VitalsEngine::new(),
            rng,
            ticks: 0,
        }
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn state(&self) -> &VitalsState {
        &self.state
    }

    pub fn window(&self) -> &RollingWindow {
        &self.window
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Run one simulation step and build its payload.
    ///
    /// A classifier failure affects this tick only: the payload is
    /// labelled `"error"` and the session keeps going.
    pub fn tick(&mut self, trend: &TrendInference, now: DateTime<Utc>) -> TickOutcome {
        let phase = self.engine.advance(&mut self.state, &mut self.rng, now);
        self.window.push(self.state.snapshot());
        self.ticks += 1;

        let (result, inference_error) = match trend.classify(&self.window) {
            Ok(r) => (r, None),
            Err(e) => {
                warn!("Entity {}: trend inference failed: {}", self.entity, e);
                (ClassificationResult::error(), Some(e))
            }
        };

        TickOutcome {
            payload: TickPayload::new(self.entity, &self.state, &result),
            phase,
            inference_error,
        }
    }
}
