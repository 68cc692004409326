//! Session registry and per-session tick scheduler.
//!
//! The registry is the single source of truth for "is entity E being
//! simulated".  Its map is only touched under one mutex, held for the
//! insert/remove/lookup and never across a tick.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  SessionRegistry                                             │
//! │  Mutex<HashMap<EntityId, SessionHandle>>                     │
//! │        │ start(E)                        │ stop(E)           │
//! │        ▼                                 ▼                   │
//! │  spawn "session-E" thread          cancel flag + unpark      │
//! └────────┬─────────────────────────────────────────────────────┘
//!          ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │  session thread (owns Session: state, window, rng)           │
//! │                                                              │
//! │  loop {                                                      │
//! │      cancelled? ──yes──▶ exit                                │
//! │      Session::tick ──▶ TickSink::publish                     │
//! │      park until start + n·period (or unpark)                 │
//! │  }                                                           │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Cancellation is cooperative.  A stopped task finishes its in-flight
//! tick, including its publish, then exits; latency is at most one tick.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::Utc;
use log::{error, info};

use crate::app::ports::{SessionObserver, TickSink};
use crate::config::StreamConfig;
use crate::diagnostics::RuntimeMetrics;
use crate::entity::EntityId;
use crate::error::{Error, Result};
use crate::inference::TrendInference;
use crate::session::{CancelToken, Session};

// ═══════════════════════════════════════════════════════════════
//  Task context
// ═══════════════════════════════════════════════════════════════

/// Everything a session thread needs besides its own [`Session`].
#[derive(Clone)]
struct TaskContext {
    period: Duration,
    trend: TrendInference,
    sink: Arc<dyn TickSink>,
    observer: Option<Arc<dyn SessionObserver>>,
    metrics: Arc<RuntimeMetrics>,
}

struct SessionHandle {
    cancel: CancelToken,
    thread: JoinHandle<()>,
}

impl SessionHandle {
    fn signal(&self) {
        self.cancel.cancel();
        self.thread.thread().unpark();
    }
}

// ═══════════════════════════════════════════════════════════════
//  Registry
// ═══════════════════════════════════════════════════════════════

pub struct SessionRegistry {
    sessions: Mutex<HashMap<EntityId, SessionHandle>>,
    /// Cancelled tasks not yet joined.
    retired: Mutex<Vec<JoinHandle<()>>>,
    /// Set by [`shutdown`](Self::shutdown); no session starts afterwards.
    closed: AtomicBool,
    ctx: TaskContext,
    rng_seed: Option<u64>,
    stack_bytes: usize,
}

impl SessionRegistry {
    pub fn new(
        config: &StreamConfig,
        trend: TrendInference,
        sink: Arc<dyn TickSink>,
        metrics: Arc<RuntimeMetrics>,
    ) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            retired: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            ctx: TaskContext {
                period: config.tick_interval(),
                trend,
                sink,
                observer: None,
                metrics,
            },
            rng_seed: config.rng_seed,
            stack_bytes: config.session_stack_bytes(),
        }
    }

    /// Attach a lifecycle side-channel invoked from every session thread.
    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.ctx.observer = Some(observer);
        self
    }

    /// Start simulating `entity`.  Idempotent.
    ///
    /// Returns `Ok(true)` if a new task was launched and `Ok(false)` if
    /// one already existed.  The thread is spawned while the map lock is
    /// held, so concurrent callers can never launch two.  Fails with
    /// [`Error::ShutDown`] once the registry has been shut down.
    pub fn start(&self, entity: EntityId) -> Result<bool> {
        let mut sessions = self.lock_sessions();
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::ShutDown);
        }
        if sessions.contains_key(&entity) {
            return Ok(false);
        }

        let cancel = CancelToken::new();
        let session = Session::new(entity, self.rng_seed, Utc::now());
        let ctx = self.ctx.clone();
        let task_cancel = cancel.clone();
        let thread = thread::Builder::new()
            .name(format!("session-{entity}"))
            .stack_size(self.stack_bytes)
            .spawn(move || run_session(ctx, session, task_cancel))
            .map_err(Error::Spawn)?;

        sessions.insert(entity, SessionHandle { cancel, thread });
        self.ctx.metrics.record_session_started();
        info!("Session {} started ({} active)", entity, sessions.len());
        Ok(true)
    }

    /// Stop simulating `entity`.  Idempotent; returns whether a session
    /// was removed.
    pub fn stop(&self, entity: EntityId) -> bool {
        let Some(handle) = self.lock_sessions().remove(&entity) else {
            return false;
        };
        handle.signal();
        info!("Session {} stop requested", entity);

        let mut retired = self.lock_retired();
        retired.retain(|h| !h.is_finished());
        retired.push(handle.thread);
        true
    }

    pub fn is_active(&self, entity: EntityId) -> bool {
        self.lock_sessions().contains_key(&entity)
    }

    pub fn active_count(&self) -> usize {
        self.lock_sessions().len()
    }

    /// Currently simulated entities, ascending.
    pub fn active_entities(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.lock_sessions().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Cancel every session and wait for all session threads, including
    /// previously stopped ones, to exit.  Returns the number joined.
    pub fn shutdown(&self) -> usize {
        self.closed.store(true, Ordering::SeqCst);
        let drained: Vec<(EntityId, SessionHandle)> = self.lock_sessions().drain().collect();
        for (_, handle) in &drained {
            handle.signal();
        }

        let mut threads: Vec<JoinHandle<()>> = self.lock_retired().drain(..).collect();
        threads.extend(drained.into_iter().map(|(_, h)| h.thread));

        let joined = threads.len();
        for thread in threads {
            let name = thread.thread().name().unwrap_or("session").to_owned();
            if thread.join().is_err() {
                error!("{} panicked", name);
            }
        }
        info!("Registry shut down ({} session threads joined)", joined);
        joined
    }

    fn lock_sessions(&self) -> MutexGuard<'_, HashMap<EntityId, SessionHandle>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_retired(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.retired.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for SessionRegistry {
    fn drop(&mut self) {
        for handle in self.lock_sessions().values() {
            handle.signal();
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Session task
// ═══════════════════════════════════════════════════════════════

fn run_session(ctx: TaskContext, mut session: Session, cancel: CancelToken) {
    let entity = session.entity();
    if let Some(observer) = &ctx.observer {
        observer.on_task_started(entity, session.state());
    }

    let mut deadline = Instant::now();
    while !cancel.is_cancelled() {
        let outcome = session.tick(&ctx.trend, Utc::now());
        ctx.metrics.record_tick();
        if outcome.inference_error.is_some() {
            ctx.metrics.record_inference_error();
        }
        ctx.sink.publish(entity, &outcome.payload);

        deadline += ctx.period;
        let now = Instant::now();
        if now > deadline + ctx.period {
            // Fell more than a tick behind; re-anchor rather than burst.
            deadline = now;
        }
        park_until(deadline, &cancel);
    }

    let ticks = session.ticks();
    ctx.metrics.record_session_stopped();
    if let Some(observer) = &ctx.observer {
        observer.on_task_exited(entity, ticks);
    }
    info!("Session {} exited after {} ticks", entity, ticks);
}

/// Sleep until `deadline`, returning early once `cancel` is set.
/// Spurious unparks are absorbed.
fn park_until(deadline: Instant, cancel: &CancelToken) {
    loop {
        if cancel.is_cancelled() {
            return;
        }
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        thread::park_timeout(deadline - now);
    }
}
