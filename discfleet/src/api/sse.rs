//! Server-Sent Events feed.
//!
//! Each subscriber first receives the current drive snapshot, then every
//! event published on the bus. A subscriber that falls behind skips the
//! events it missed.

use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, Stream, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use super::ApiState;
use crate::events::{EventEnvelope, FleetEvent};

const KEEP_ALIVE: Duration = Duration::from_secs(15);

fn to_sse(envelope: &EventEnvelope) -> Result<Event, axum::Error> {
    Event::default()
        .event(envelope.event.kind())
        .json_data(envelope)
}

pub(super) async fn events(
    State(state): State<ApiState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let rx = state.events.subscribe();
    debug!(subscribers = state.events.subscriber_count(), "Event subscriber connected");

    let initial = EventEnvelope {
        event: FleetEvent::Drives(state.aggregator.snapshot()),
        timestamp: state.clock.now(),
    };

    // Ends on shutdown so graceful shutdown is not held open by subscribers
    let shutdown = state.shutdown.clone();
    let live = stream::unfold(rx, move |mut rx| {
        let shutdown = shutdown.clone();
        async move {
            loop {
                let received = tokio::select! {
                    _ = shutdown.cancelled() => return None,
                    received = rx.recv() => received,
                };
                match received {
                    Ok(envelope) => return Some((to_sse(&envelope), rx)),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Event subscriber lagged");
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        }
    });

    let stream = stream::once(async move { to_sse(&initial) }).chain(live);
    Sse::new(stream).keep_alive(KeepAlive::new().interval(KEEP_ALIVE))
}
