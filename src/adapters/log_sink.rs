//! Log-based transport adapter.
//!
//! Stands in for a network transport: it joins one topic per entity,
//! drains each subscriber on a dedicated thread and writes every payload
//! to the logger as a single `TICK | ...` line.
//!
//! ```text
//!  ┌──────────────────────────────────────────────────────┐
//!  │  "log-transport" thread                              │
//!  │  futures_lite::block_on                              │
//!  │  ┌────────────────────────────────────────────────┐  │
//!  │  │  edge_executor::LocalExecutor                  │  │
//!  │  │  ┌──────────┐ ┌──────────┐     ┌────────────┐  │  │
//!  │  │  │ drain E1 │ │ drain E2 │ ... │ stop watch │  │  │
//!  │  │  │ recv().. │ │ recv().. │     │ 50ms ⏱     │  │  │
//!  │  │  └──────────┘ └──────────┘     └────────────┘  │  │
//!  │  └────────────────────────────────────────────────┘  │
//!  └──────────────────────────────────────────────────────┘
//! ```

use core::cell::Cell;
use core::time::Duration;
use std::rc::Rc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{error, info, warn};

use crate::app::commands::StreamCommand;
use crate::app::events::{LIVE_READING_EVENT, TickPayload};
use crate::app::service::StreamService;
use crate::entity::EntityId;
use crate::error::{Error, Result};
use crate::pubsub::Subscriber;
use crate::session::CancelToken;

/// Executor task slots: one per stream plus the stop watcher.
const EXECUTOR_SLOTS: usize = 32;

/// Most entities one transport will follow.
pub const MAX_STREAMS: usize = EXECUTOR_SLOTS - 1;

const STOP_POLL: Duration = Duration::from_millis(50);

/// Render one payload as a log line.
pub fn format_tick(payload: &TickPayload) -> String {
    format!(
        "TICK | {} | {} | HR={:.1}bpm T={:.2}\u{00b0}C act={:.1} stress={:.1} | \
         trend={} ({:.1}%)",
        payload.entity_id.topic(),
        payload.timestamp.format("%H:%M:%S%.3f"),
        payload.heart_rate,
        payload.body_temperature,
        payload.activity_level,
        payload.stress_score,
        payload.trend_label,
        payload.trend_confidence,
    )
}

/// A running log transport.  Dropping it without [`stop`](Self::stop)
/// leaves the thread running until process exit.
pub struct LogTransport {
    service: Arc<StreamService>,
    subscribers: Vec<Subscriber>,
    stop: CancelToken,
    thread: JoinHandle<u64>,
}

impl LogTransport {
    /// Subscribe to each entity (which starts its session) and begin
    /// logging its payloads.
    pub fn spawn(service: Arc<StreamService>, entities: &[EntityId]) -> Result<Self> {
        if entities.len() > MAX_STREAMS {
            warn!(
                "LogTransport: following the first {} of {} entities",
                MAX_STREAMS,
                entities.len()
            );
        }

        let mut subscribers = Vec::new();
        for &entity in entities.iter().take(MAX_STREAMS) {
            let subscriber = service.connect();
            service.handle_command(&subscriber, StreamCommand::Subscribe(entity))?;
            subscribers.push(subscriber);
        }

        let stop = CancelToken::new();
        let task_subscribers = subscribers.clone();
        let task_stop = stop.clone();
        let thread = thread::Builder::new()
            .name("log-transport".into())
            .spawn(move || run_log_loop(task_subscribers, task_stop))
            .map_err(Error::Spawn)?;

        info!(
            "LogTransport: streaming '{}' for {} entities",
            LIVE_READING_EVENT,
            subscribers.len()
        );
        Ok(Self {
            service,
            subscribers,
            stop,
            thread,
        })
    }

    /// Stop logging, leave every topic and return the number of payloads
    /// written.
    pub fn stop(self) -> u64 {
        self.stop.cancel();
        let logged = self.thread.join().unwrap_or_else(|_| {
            error!("LogTransport: thread panicked");
            0
        });
        for subscriber in &self.subscribers {
            self.service.disconnect(subscriber);
        }
        let dropped: u64 = self.subscribers.iter().map(Subscriber::dropped).sum();
        info!("LogTransport: stopped ({} logged, {} dropped)", logged, dropped);
        logged
    }
}

async fn drain(subscriber: Subscriber, logged: Rc<Cell<u64>>) {
    loop {
        let payload = subscriber.recv().await;
        info!("{}", format_tick(&payload));
        logged.set(logged.get() + 1);
    }
}

async fn watch(stop: CancelToken) {
    while !stop.is_cancelled() {
        async_io_mini::Timer::after(STOP_POLL).await;
    }
}

fn run_log_loop(subscribers: Vec<Subscriber>, stop: CancelToken) -> u64 {
    let executor: edge_executor::LocalExecutor<'_, EXECUTOR_SLOTS> =
        edge_executor::LocalExecutor::new();
    let logged = Rc::new(Cell::new(0));

    for subscriber in subscribers {
        executor.spawn(drain(subscriber, logged.clone())).detach();
    }

    futures_lite::future::block_on(executor.run(watch(stop)));
    logged.get()
}
