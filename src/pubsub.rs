//! Topic-based fan-out of tick payloads.
//!
//! ```text
//!   session thread ──publish(E)──▶ Broker ──try_send──▶ Subscriber queue (32)
//!                                    │    ──try_send──▶ Subscriber queue (32)
//!                                    ▼
//!                              topics: E → [subscribers]
//! ```
//!
//! Each [`Subscriber`] owns a bounded `embassy-sync` channel.  Publishing
//! never blocks: a full queue drops that frame for that subscriber only
//! and bumps its drop counter.  Frames reach any one subscriber in the
//! order they were published on a topic.
//!
//! Membership is independent of sessions; a topic can have subscribers
//! with no session behind it and the other way round.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::debug;

use crate::app::events::TickPayload;
use crate::app::ports::TickSink;
use crate::diagnostics::RuntimeMetrics;
use crate::entity::EntityId;

/// Frames buffered per subscriber before new ones are dropped.
pub const SUBSCRIBER_QUEUE_DEPTH: usize = 32;

type Queue = Channel<CriticalSectionRawMutex, TickPayload, SUBSCRIBER_QUEUE_DEPTH>;

// ═══════════════════════════════════════════════════════════════
//  Subscriber
// ═══════════════════════════════════════════════════════════════

/// Connection-scoped identifier handed out by [`Broker::connect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl core::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

struct SubscriberInner {
    id: SubscriberId,
    queue: Queue,
    dropped: AtomicU64,
}

/// Receiving end of one client connection.  Cheap to clone; clones
/// share the same queue.
#[derive(Clone)]
pub struct Subscriber {
    inner: Arc<SubscriberInner>,
}

impl Subscriber {
    fn new(id: SubscriberId) -> Self {
        Self {
            inner: Arc::new(SubscriberInner {
                id,
                queue: Channel::new(),
                dropped: AtomicU64::new(0),
            }),
        }
    }

    pub fn id(&self) -> SubscriberId {
        self.inner.id
    }

    /// Next buffered frame, if any.
    pub fn try_recv(&self) -> Option<TickPayload> {
        self.inner.queue.try_receive().ok()
    }

    /// Wait for the next frame.
    pub async fn recv(&self) -> TickPayload {
        self.inner.queue.receive().await
    }

    /// Block the calling thread until a frame arrives or `timeout` passes.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<TickPayload> {
        futures_lite::future::block_on(futures_lite::future::or(
            async { Some(self.recv().await) },
            async {
                async_io_mini::Timer::after(timeout).await;
                None
            },
        ))
    }

    /// Drain everything currently buffered.
    pub fn drain(&self) -> Vec<TickPayload> {
        core::iter::from_fn(|| self.try_recv()).collect()
    }

    /// Frames discarded because this subscriber's queue was full.
    pub fn dropped(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }

    fn offer(&self, payload: TickPayload) -> bool {
        if self.inner.queue.try_send(payload).is_ok() {
            true
        } else {
            self.inner.dropped.fetch_add(1, Ordering::Relaxed);
            false
        }
    }
}

impl PartialEq for Subscriber {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Subscriber {}

impl core::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.inner.id)
            .field("dropped", &self.dropped())
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════
//  Broker
// ═══════════════════════════════════════════════════════════════

/// Topic membership table plus the publish path.
pub struct Broker {
    topics: Mutex<HashMap<EntityId, Vec<Subscriber>>>,
    next_id: AtomicU64,
    metrics: Arc<RuntimeMetrics>,
}

impl Broker {
    pub fn new(metrics: Arc<RuntimeMetrics>) -> Self {
        Self {
            topics: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            metrics,
        }
    }

    /// Register a new client connection.
    pub fn connect(&self) -> Subscriber {
        Subscriber::new(SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed)))
    }

    /// Join `entity`'s topic.  Returns `true` if this made the subscriber
    /// the topic's first member.  Joining twice is a no-op.
    pub fn subscribe(&self, subscriber: &Subscriber, entity: EntityId) -> bool {
        let mut topics = self.lock();
        let members = topics.entry(entity).or_default();
        if members.contains(subscriber) {
            return false;
        }
        members.push(subscriber.clone());
        debug!("{} joined {}", subscriber.id(), entity.topic());
        members.len() == 1
    }

    /// Leave `entity`'s topic.  Returns the members left behind.
    pub fn unsubscribe(&self, subscriber: &Subscriber, entity: EntityId) -> usize {
        let mut topics = self.lock();
        let Some(members) = topics.get_mut(&entity) else {
            return 0;
        };
        members.retain(|s| s != subscriber);
        let remaining = members.len();
        if remaining == 0 {
            topics.remove(&entity);
        }
        remaining
    }

    /// Leave every topic.  Returns the entities whose topic is now empty.
    pub fn remove_subscriber(&self, subscriber: &Subscriber) -> Vec<EntityId> {
        let mut topics = self.lock();
        let mut emptied = Vec::new();
        topics.retain(|entity, members| {
            let before = members.len();
            members.retain(|s| s != subscriber);
            if members.is_empty() && before > 0 {
                emptied.push(*entity);
            }
            !members.is_empty()
        });
        emptied.sort_unstable();
        emptied
    }

    pub fn subscriber_count(&self, entity: EntityId) -> usize {
        self.lock().get(&entity).map_or(0, Vec::len)
    }

    /// Deliver `payload` to every current member of `entity`'s topic.
    /// Returns how many queues accepted it.
    pub fn publish(&self, entity: EntityId, payload: &TickPayload) -> usize {
        // Snapshot membership so the lock is not held while queueing.
        let members = match self.lock().get(&entity) {
            Some(members) => members.clone(),
            None => return 0,
        };

        let mut delivered = 0;
        for subscriber in &members {
            if subscriber.offer(payload.clone()) {
                delivered += 1;
            } else {
                debug!(
                    "{} queue full, dropped frame for {}",
                    subscriber.id(),
                    entity.topic()
                );
            }
        }
        self.metrics.record_delivered(delivered as u64);
        self.metrics.record_dropped((members.len() - delivered) as u64);
        delivered
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<EntityId, Vec<Subscriber>>> {
        self.topics.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TickSink for Broker {
    fn publish(&self, entity: EntityId, payload: &TickPayload) {
        Broker::publish(self, entity, payload);
    }
}
