//! Runtime diagnostics.
//!
//! Process-wide counters shared by every session thread and the fan-out
//! path.  All counters are monotonic and updated with relaxed atomics;
//! [`RuntimeMetrics::snapshot`] gives a serializable point-in-time copy
//! for the diagnostics response and the shutdown report.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug)]
pub struct RuntimeMetrics {
    started_at: DateTime<Utc>,
    ticks: AtomicU64,
    payloads_delivered: AtomicU64,
    frames_dropped: AtomicU64,
    inference_errors: AtomicU64,
    sessions_started: AtomicU64,
    sessions_stopped: AtomicU64,
}

impl Default for RuntimeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeMetrics {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            ticks: AtomicU64::new(0),
            payloads_delivered: AtomicU64::new(0),
            frames_dropped: AtomicU64::new(0),
            inference_errors: AtomicU64::new(0),
            sessions_started: AtomicU64::new(0),
            sessions_stopped: AtomicU64::new(0),
        }
    }

    pub fn record_tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delivered(&self, n: u64) {
        self.payloads_delivered.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_dropped(&self, n: u64) {
        self.frames_dropped.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_inference_error(&self) {
        self.inference_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session_started(&self) {
        self.sessions_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session_stopped(&self) {
        self.sessions_stopped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let now = Utc::now();
        MetricsSnapshot {
            uptime_secs: (now - self.started_at).num_seconds().max(0) as u64,
            ticks: self.ticks.load(Ordering::Relaxed),
            payloads_delivered: self.payloads_delivered.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            inference_errors: self.inference_errors.load(Ordering::Relaxed),
            sessions_started: self.sessions_started.load(Ordering::Relaxed),
            sessions_stopped: self.sessions_stopped.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`RuntimeMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub ticks: u64,
    pub payloads_delivered: u64,
    pub frames_dropped: u64,
    pub inference_errors: u64,
    pub sessions_started: u64,
    pub sessions_stopped: u64,
}

impl MetricsSnapshot {
    /// Sessions started and not yet stopped.
    pub fn live_sessions(&self) -> u64 {
        self.sessions_started.saturating_sub(self.sessions_stopped)
    }
}
