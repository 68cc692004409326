//! Mock adapters for integration tests.
//!
//! Records every payload and lifecycle callback so tests can assert on
//! the full history without a transport.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use petvitals::app::events::TickPayload;
use petvitals::app::ports::{Classifier, SessionObserver, TickSink};
use petvitals::entity::EntityId;
use petvitals::error::ModelError;
use petvitals::vitals::VitalsState;

pub fn id(n: u64) -> EntityId {
    EntityId::new(n).unwrap()
}

/// Poll `cond` until it holds or `timeout` passes.
pub fn wait_for(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    frames: Mutex<Vec<TickPayload>>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn for_entity(&self, entity: EntityId) -> Vec<TickPayload> {
        self.frames
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.entity_id == entity)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.frames.lock().unwrap().len()
    }
}

impl TickSink for RecordingSink {
    fn publish(&self, entity: EntityId, payload: &TickPayload) {
        assert_eq!(entity, payload.entity_id);
        self.frames.lock().unwrap().push(payload.clone());
    }
}

// ── LifecycleRecorder ─────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Lifecycle {
    Started(VitalsState),
    Exited { ticks: u64 },
}

/// Records task starts and exits per entity, in order.
#[derive(Default)]
pub struct LifecycleRecorder {
    events: Mutex<HashMap<EntityId, Vec<Lifecycle>>>,
}

#[allow(dead_code)]
impl LifecycleRecorder {
    pub fn events(&self, entity: EntityId) -> Vec<Lifecycle> {
        self.events
            .lock()
            .unwrap()
            .get(&entity)
            .cloned()
            .unwrap_or_default()
    }

    pub fn started(&self, entity: EntityId) -> usize {
        self.events(entity)
            .iter()
            .filter(|e| matches!(e, Lifecycle::Started(_)))
            .count()
    }

    pub fn exited(&self, entity: EntityId) -> usize {
        self.events(entity)
            .iter()
            .filter(|e| matches!(e, Lifecycle::Exited { .. }))
            .count()
    }

    pub fn total_started(&self) -> usize {
        self.events
            .lock()
            .unwrap()
            .values()
            .flatten()
            .filter(|e| matches!(e, Lifecycle::Started(_)))
            .count()
    }

    pub fn total_exited(&self) -> usize {
        self.events
            .lock()
            .unwrap()
            .values()
            .flatten()
            .filter(|e| matches!(e, Lifecycle::Exited { .. }))
            .count()
    }
}

impl SessionObserver for LifecycleRecorder {
    fn on_task_started(&self, entity: EntityId, initial: &VitalsState) {
        self.events
            .lock()
            .unwrap()
            .entry(entity)
            .or_default()
            .push(Lifecycle::Started(initial.clone()));
    }

    fn on_task_exited(&self, entity: EntityId, ticks: u64) {
        self.events
            .lock()
            .unwrap()
            .entry(entity)
            .or_default()
            .push(Lifecycle::Exited { ticks });
    }
}

// ── ScriptedClassifier ────────────────────────────────────────

/// Returns a fixed distribution; optionally fails every `fail_every`th call.
pub struct ScriptedClassifier {
    classes: Vec<String>,
    proba: Vec<f64>,
    fail_every: Option<u64>,
    calls: AtomicU64,
}

#[allow(dead_code)]
impl ScriptedClassifier {
    pub fn new(classes: &[&str], proba: &[f64]) -> Self {
        Self {
            classes: classes.iter().map(|c| (*c).to_owned()).collect(),
            proba: proba.to_vec(),
            fail_every: None,
            calls: AtomicU64::new(0),
        }
    }

    pub fn failing_every(mut self, n: u64) -> Self {
        self.fail_every = Some(n);
        self
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Classifier for ScriptedClassifier {
    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn n_features(&self) -> usize {
        7
    }

    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, ModelError> {
        assert_eq!(features.len(), 7);
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        match self.fail_every {
            Some(k) if n % k == 0 => Err(ModelError::InvalidTree("scripted failure")),
            _ => Ok(self.proba.clone()),
        }
    }
}
