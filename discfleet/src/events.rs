//! Fleet event bus.
//!
//! Components publish state and recovery events here; the HTTP event feed and
//! any in-process subscriber receive them through a broadcast channel. A slow
//! subscriber lags and drops events rather than blocking publishers.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

use crate::status::{CrashEvent, DriveStatus};
use crate::time::SharedClock;

/// Capacity of the broadcast channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// What initiated a bus reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResetTrigger {
    Automatic,
    Manual,
}

impl std::fmt::Display for ResetTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ResetTrigger::Automatic => "automatic",
            ResetTrigger::Manual => "manual",
        })
    }
}

/// Notification of an executed bus reset.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetEvent {
    pub bus_id: String,
    /// Every drive on the bus.
    pub devices: Vec<String>,
    /// Drives the reset was recorded against in the ledger.
    pub recorded: Vec<String>,
    pub trigger: ResetTrigger,
    pub timestamp: f64,
}

/// Event payloads, serialized as `{"type": ..., "data": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum FleetEvent {
    /// Full drive snapshot after a change.
    Drives(Vec<DriveStatus>),
    Crash(CrashEvent),
    Reset(ResetEvent),
}

impl FleetEvent {
    /// Event type name as it appears on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            FleetEvent::Drives(_) => "drives",
            FleetEvent::Crash(_) => "crash",
            FleetEvent::Reset(_) => "reset",
        }
    }
}

/// Event plus publication time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventEnvelope {
    #[serde(flatten)]
    pub event: FleetEvent,
    pub timestamp: f64,
}

/// Broadcast hub for fleet events.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EventEnvelope>,
    clock: SharedClock,
}

impl EventBus {
    pub fn new(clock: SharedClock) -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx, clock }
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn publish(&self, event: FleetEvent) {
        let kind = event.kind();
        let envelope = EventEnvelope {
            event,
            timestamp: self.clock.now(),
        };
        let receivers = self.tx.send(envelope).unwrap_or(0);
        trace!(kind, receivers, "Published fleet event");
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
