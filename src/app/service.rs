//! Stream service: the hexagonal core.
//!
//! [`StreamService`] wires the topic broker, the session registry and the
//! health assessor together and plays the "first subscriber starts the
//! simulation" role that transports rely on.
//!
//! ```text
//!  transport event ──▶ StreamCommand ──▶ ┌──────────────────────┐
//!                                        │    StreamService     │
//!                                        │  Broker · Registry   │
//!  HealthFeatures  ──▶ assess_health ──▶ │  HealthAssessor      │
//!                                        └──────────┬───────────┘
//!                                                   ▼
//!                              session threads ──▶ TickSink (Broker)
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, info, warn};
use serde_json::Value;

use crate::config::StreamConfig;
use crate::diagnostics::{MetricsSnapshot, RuntimeMetrics};
use crate::entity::EntityId;
use crate::error::Result;
use crate::health::{HealthAssessment, HealthAssessor, HealthFeatures};
use crate::model::ModelSet;
use crate::pubsub::{Broker, Subscriber};
use crate::scheduler::SessionRegistry;

use super::commands::StreamCommand;
use super::ports::SessionObserver;

// ───────────────────────────────────────────────────────────────
// StreamService
// ───────────────────────────────────────────────────────────────

pub struct StreamService {
    stop_on_last_unsubscribe: bool,
    /// Held across each topic change and the session start/stop it
    /// implies, so "topic has subscribers" and "session is running" move
    /// together.
    membership: Mutex<()>,
    broker: Arc<Broker>,
    registry: SessionRegistry,
    health: HealthAssessor,
    metrics: Arc<RuntimeMetrics>,
}

impl StreamService {
    /// Build the service around already-loaded models.
    pub fn new(config: &StreamConfig, models: ModelSet) -> Self {
        Self::build(config, models, None)
    }

    /// Same as [`new`](Self::new), with a session lifecycle observer.
    pub fn with_observer(
        config: &StreamConfig,
        models: ModelSet,
        observer: Arc<dyn SessionObserver>,
    ) -> Self {
        Self::build(config, models, Some(observer))
    }

    fn build(
        config: &StreamConfig,
        models: ModelSet,
        observer: Option<Arc<dyn SessionObserver>>,
    ) -> Self {
        let metrics = Arc::new(RuntimeMetrics::new());
        let broker = Arc::new(Broker::new(metrics.clone()));
        let mut registry =
            SessionRegistry::new(config, models.trend, broker.clone(), metrics.clone());
        if let Some(observer) = observer {
            registry = registry.with_observer(observer);
        }
        info!(
            "StreamService ready (tick={}ms, trend={}, health={})",
            config.tick_interval_ms,
            if models.health.is_available() { "loaded" } else { "absent" },
            if config.stop_on_last_unsubscribe { "stop-on-empty" } else { "keep-running" },
        );
        Self {
            stop_on_last_unsubscribe: config.stop_on_last_unsubscribe,
            membership: Mutex::new(()),
            broker,
            registry,
            health: models.health,
            metrics,
        }
    }

    // ── Connections ───────────────────────────────────────────

    /// Register a new transport connection.
    pub fn connect(&self) -> Subscriber {
        self.broker.connect()
    }

    /// Apply one parsed command on behalf of `subscriber`.
    ///
    /// A subscribe whose session cannot be started leaves the subscriber
    /// off the topic.
    pub fn handle_command(&self, subscriber: &Subscriber, cmd: StreamCommand) -> Result<()> {
        let _guard = self.lock_membership();
        match cmd {
            StreamCommand::Subscribe(entity) => {
                let first = self.broker.subscribe(subscriber, entity);
                if let Err(e) = self.registry.start(entity) {
                    warn!("{}: cannot start {}: {}", subscriber.id(), entity.topic(), e);
                    self.broker.unsubscribe(subscriber, entity);
                    return Err(e);
                }
                if first {
                    info!("{} is the first subscriber of {}", subscriber.id(), entity.topic());
                }
            }
            StreamCommand::Unsubscribe(entity) => {
                let remaining = self.broker.unsubscribe(subscriber, entity);
                self.after_leave(entity, remaining);
            }
        }
        Ok(())
    }

    /// Parse and apply a raw transport event.  Returns `false` when the
    /// event was ignored as unknown or malformed.
    pub fn handle_event(&self, subscriber: &Subscriber, event: &str, data: &Value) -> Result<bool> {
        match StreamCommand::parse(event, data) {
            Some(cmd) => {
                self.handle_command(subscriber, cmd)?;
                Ok(true)
            }
            None => {
                debug!("{}: ignored event '{}' ({})", subscriber.id(), event, data);
                Ok(false)
            }
        }
    }

    /// The connection went away: leave every topic it had joined.
    pub fn disconnect(&self, subscriber: &Subscriber) {
        let _guard = self.lock_membership();
        for entity in self.broker.remove_subscriber(subscriber) {
            self.after_leave(entity, 0);
        }
    }

    fn after_leave(&self, entity: EntityId, remaining: usize) {
        if remaining == 0 && self.stop_on_last_unsubscribe && self.registry.stop(entity) {
            info!("Last subscriber left {}, session stopped", entity.topic());
        }
    }

    fn lock_membership(&self) -> MutexGuard<'_, ()> {
        self.membership.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Queries ───────────────────────────────────────────────

    /// Stateless composite health assessment.
    pub fn assess_health(&self, features: &HealthFeatures) -> HealthAssessment {
        self.health.assess(features)
    }

    pub fn is_streaming(&self, entity: EntityId) -> bool {
        self.registry.is_active(entity)
    }

    pub fn active_entities(&self) -> Vec<EntityId> {
        self.registry.active_entities()
    }

    pub fn subscriber_count(&self, entity: EntityId) -> usize {
        self.broker.subscriber_count(entity)
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn broker(&self) -> &Arc<Broker> {
        &self.broker
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Stop every session and join its thread.
    pub fn shutdown(&self) -> usize {
        self.registry.shutdown()
    }
}
