//! Outbound stream events.
//!
//! Every session tick produces one [`TickPayload`], handed to the
//! [`TickSink`](super::ports::TickSink) port and fanned out to the
//! entity's subscribers under the [`LIVE_READING_EVENT`] name.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};

use crate::entity::EntityId;
use crate::inference::ClassificationResult;
use crate::vitals::VitalsState;

/// Event name subscribers receive each payload under.
pub const LIVE_READING_EVENT: &str = "live_reading";

/// One per-tick reading for one entity.
///
/// Rounded for presentation: heart rate, activity, stress and confidence
/// to one decimal, temperature to two.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickPayload {
    pub entity_id: EntityId,
    #[serde(serialize_with = "rfc3339")]
    pub timestamp: DateTime<Utc>,
    pub heart_rate: f64,
    pub body_temperature: f64,
    pub activity_level: f64,
    pub stress_score: f64,
    pub trend_label: String,
    /// Trend confidence (0–100).
    pub trend_confidence: f64,
}

impl TickPayload {
    pub fn new(entity_id: EntityId, state: &VitalsState, trend: &ClassificationResult) -> Self {
        Self {
            entity_id,
            timestamp: state.last_update,
            heart_rate: round_to(state.heart_rate, 1),
            body_temperature: round_to(state.body_temperature, 2),
            activity_level: round_to(state.activity_level, 1),
            stress_score: round_to(state.stress_score, 1),
            trend_label: trend.label.clone(),
            trend_confidence: round_to(trend.confidence_percent(), 1),
        }
    }

    /// Serialize as the JSON body subscribers receive.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

fn round_to(v: f64, decimals: i32) -> f64 {
    let k = 10f64.powi(decimals);
    (v * k).round() / k
}

fn rfc3339<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
}
