//! Rolling window of recent vitals and the trend feature extractor.
//!
//! The window is a fixed-capacity FIFO (stack-allocated, no heap) holding
//! the last [`WINDOW_CAPACITY`] snapshots.  Feature extraction treats the
//! whole buffer as one window, matching how the trend classifier was
//! trained.

use heapless::Deque;

use crate::vitals::VitalsSnapshot;

/// Number of snapshots the trend classifier expects.
pub const WINDOW_CAPACITY: usize = 5;

/// Minimum entries before statistics are defined.
const MIN_ENTRIES_FOR_FEATURES: usize = 2;

/// Bounded FIFO of recent vitals snapshots, oldest evicted first.
#[derive(Debug, Clone, Default)]
pub struct RollingWindow {
    entries: Deque<VitalsSnapshot, WINDOW_CAPACITY>,
}

impl RollingWindow {
    pub fn new() -> Self {
        Self {
            entries: Deque::new(),
        }
    }

    /// Append a snapshot, evicting the oldest if the window is full.
    pub fn push(&mut self, snapshot: VitalsSnapshot) {
        if self.entries.is_full() {
            let _ = self.entries.pop_front();
        }
        // Cannot fail: a slot was freed above if needed.
        let _ = self.entries.push_back(snapshot);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True once the window holds [`WINDOW_CAPACITY`] entries.
    pub fn is_full(&self) -> bool {
        self.entries.is_full()
    }

    /// Snapshots from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &VitalsSnapshot> {
        self.entries.iter()
    }

    /// Compute rolling statistics over the current contents.
    ///
    /// Returns `None` ("not ready") with fewer than two entries.
    pub fn extract(&self) -> Option<TrendFeatures> {
        if self.entries.len() < MIN_ENTRIES_FOR_FEATURES {
            return None;
        }
        let first = self.entries.front()?;
        let last = self.entries.back()?;

        let hr = column(self, |s| s.heart_rate);
        let temp = column(self, |s| s.body_temperature);
        let stress = column(self, |s| s.stress_score);

        Some(TrendFeatures {
            hr_mean: defined(mean(&hr)),
            hr_std: defined(sample_std(&hr)),
            temp_mean: defined(mean(&temp)),
            temp_std: defined(sample_std(&temp)),
            stress_mean: defined(mean(&stress)),
            hr_trend: defined(last.heart_rate - first.heart_rate),
            temp_trend: defined(last.body_temperature - first.body_temperature),
        })
    }
}

/// Rolling statistics consumed by the trend classifier.
///
/// Field order is fixed; see [`TrendFeatures::FIELD_NAMES`].
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct TrendFeatures {
    pub hr_mean: f64,
    pub hr_std: f64,
    pub temp_mean: f64,
    pub temp_std: f64,
    pub stress_mean: f64,
    pub hr_trend: f64,
    pub temp_trend: f64,
}

impl TrendFeatures {
    pub const LEN: usize = 7;

    pub const FIELD_NAMES: [&'static str; Self::LEN] = [
        "hr_mean",
        "hr_std",
        "temp_mean",
        "temp_std",
        "stress_mean",
        "hr_trend",
        "temp_trend",
    ];

    /// Values in classifier input order.
    pub fn to_array(&self) -> [f64; Self::LEN] {
        [
            self.hr_mean,
            self.hr_std,
            self.temp_mean,
            self.temp_std,
            self.stress_mean,
            self.hr_trend,
            self.temp_trend,
        ]
    }
}

// ── Internal ──────────────────────────────────────────────────

fn column(
    window: &RollingWindow,
    field: impl Fn(&VitalsSnapshot) -> f64,
) -> heapless::Vec<f64, WINDOW_CAPACITY> {
    window.iter().map(field).collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n − 1 denominator).
fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (ss / (values.len() - 1) as f64).sqrt()
}

/// Substitute 0 for any undefined statistic.
fn defined(v: f64) -> f64 {
    if v.is_finite() { v } else { 0.0 }
}
