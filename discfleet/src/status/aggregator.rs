//! Status aggregator and crash detector.
//!
//! The aggregator owns the authoritative drive map. Each refresh re-reads every
//! drive's status record; a drive that claims to be ripping but has not
//! written a heartbeat within the crash timeout becomes a crash suspect. The
//! crash check then probes each suspect with a bounded identification
//! request:
//!
//! - probe times out: the firmware is wedged, the drive becomes `crashed`
//! - probe completes: the drive is alive and merely slow, it stays `ripping`
//!
//! `crashed` is sticky. Only a record with a newer heartbeat than the one seen
//! at crash time, which is itself fresh and not `crashed`, clears it.
//!
//! # Usage
//!
//! ```ignore
//! let aggregator = StatusAggregator::new(config, enumerator, probe, clock, events);
//!
//! aggregator.refresh();
//! for crash in aggregator.check_crashes().await {
//!     orchestrator.handle_crash(&crash).await;
//! }
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::drive::{CrashEvent, DriveState, DriveStatus};
use super::probe::DeviceProbe;
use super::record::read_status;
use crate::config::{DEFAULT_CRASH_TIMEOUT_SECS, DEFAULT_PROBE_TIMEOUT_SECS};
use crate::devices::DeviceEnumerator;
use crate::events::{EventBus, FleetEvent};
use crate::time::SharedClock;

/// Capacity of the crash event channel.
const CRASH_CHANNEL_CAPACITY: usize = 32;

/// Configuration for the status aggregator.
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Directory holding `<device>.json` status records.
    pub status_dir: PathBuf,
    /// Heartbeat age beyond which a ripping drive is suspected.
    pub crash_timeout: Duration,
    /// Upper bound on a single probe.
    pub probe_timeout: Duration,
}

impl AggregatorConfig {
    pub fn new(status_dir: impl Into<PathBuf>) -> Self {
        Self {
            status_dir: status_dir.into(),
            crash_timeout: Duration::from_secs(DEFAULT_CRASH_TIMEOUT_SECS),
            probe_timeout: Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS),
        }
    }
}

/// Heartbeat observed when a crash was confirmed.
#[derive(Debug, Clone, Copy)]
struct CrashMark {
    heartbeat: f64,
    heartbeat_age: f64,
}

struct DriveEntry {
    status: DriveStatus,
    crash: Option<CrashMark>,
    /// Whether the last refresh saw this drive as a suspect, for log edges.
    suspected: bool,
}

/// Maintains drive state and detects crashed drives.
pub struct StatusAggregator {
    config: AggregatorConfig,
    enumerator: Arc<dyn DeviceEnumerator>,
    probe: Arc<dyn DeviceProbe>,
    clock: SharedClock,
    events: EventBus,
    drives: RwLock<BTreeMap<String, DriveEntry>>,
    /// Device order from the last enumeration.
    order: RwLock<Vec<String>>,
    crash_tx: broadcast::Sender<CrashEvent>,
}

impl StatusAggregator {
    pub fn new(
        config: AggregatorConfig,
        enumerator: Arc<dyn DeviceEnumerator>,
        probe: Arc<dyn DeviceProbe>,
        clock: SharedClock,
        events: EventBus,
    ) -> Self {
        let (crash_tx, _) = broadcast::channel(CRASH_CHANNEL_CAPACITY);
        Self {
            config,
            enumerator,
            probe,
            clock,
            events,
            drives: RwLock::new(BTreeMap::new()),
            order: RwLock::new(Vec::new()),
            crash_tx,
        }
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    fn is_stale(&self, status: &DriveStatus, now: f64) -> bool {
        status.heartbeat_age(now) > self.config.crash_timeout.as_secs_f64()
    }

    /// Combine a freshly read record with an existing crash mark.
    ///
    /// Returns the status to expose and the crash mark to keep.
    fn merge(
        &self,
        read: DriveStatus,
        crash: Option<CrashMark>,
        now: f64,
    ) -> (DriveStatus, Option<CrashMark>) {
        let Some(mark) = crash else {
            return (read, None);
        };

        let recovered = read.state != DriveState::Crashed
            && read.heartbeat > mark.heartbeat
            && !self.is_stale(&read, now);
        if recovered {
            return (read, None);
        }

        let mut status = read;
        status.state = DriveState::Crashed;
        status.error_message = Some(format!(
            "Drive unresponsive: no heartbeat for {:.0}s and identification probe timed out",
            mark.heartbeat_age
        ));
        (status, Some(mark))
    }

    /// Re-enumerate drives and re-read every status record.
    ///
    /// Publishes a `drives` event when the snapshot changed.
    pub fn refresh(&self) -> Vec<DriveStatus> {
        let devices = self.enumerator.devices();
        let now = self.clock.now();

        let reads: Vec<DriveStatus> = devices
            .iter()
            .map(|device| read_status(&self.config.status_dir, device))
            .collect();

        let (snapshot, changed) = {
            let mut drives = self.drives.write();
            let before = collect_snapshot(&drives, &self.order.read());

            let mut next = BTreeMap::new();
            for read in reads {
                let device = read.device.clone();
                let previous = drives.remove(&device);
                if previous.is_none() {
                    debug!(device = %device, "Drive discovered");
                }
                let (crash, was_suspected) = previous
                    .map(|p| (p.crash, p.suspected))
                    .unwrap_or((None, false));

                let was_crashed = crash.is_some();
                let (status, crash) = self.merge(read, crash, now);
                if was_crashed && crash.is_none() {
                    info!(device = %device, state = %status.state, "Drive recovered from crash");
                }
                let suspected =
                    crash.is_none() && status.is_ripping() && self.is_stale(&status, now);
                if suspected && !was_suspected {
                    debug!(
                        device = %device,
                        heartbeat_age = status.heartbeat_age(now),
                        "Crash suspected, heartbeat stale"
                    );
                }

                next.insert(
                    device,
                    DriveEntry {
                        status,
                        crash,
                        suspected,
                    },
                );
            }

            for gone in drives.keys() {
                info!(device = %gone, "Drive disappeared");
            }
            *drives = next;
            *self.order.write() = devices;

            let after = collect_snapshot(&drives, &self.order.read());
            let changed = after != before;
            (after, changed)
        };

        if changed {
            self.events.publish(FleetEvent::Drives(snapshot.clone()));
        }
        snapshot
    }

    /// Probe every crash suspect and confirm the ones whose probe times out.
    ///
    /// Returns the newly confirmed crashes. A drive already `crashed` is never
    /// reported again.
    pub async fn check_crashes(&self) -> Vec<CrashEvent> {
        let now = self.clock.now();
        let suspects: Vec<(String, f64)> = {
            let drives = self.drives.read();
            drives
                .values()
                .filter(|e| {
                    e.crash.is_none() && e.status.is_ripping() && self.is_stale(&e.status, now)
                })
                .map(|e| (e.status.device.clone(), e.status.heartbeat))
                .collect()
        };

        if suspects.is_empty() {
            return Vec::new();
        }

        let timeout = self.config.probe_timeout;
        let probes = suspects.iter().map(|(device, _)| async move {
            let outcome = tokio::time::timeout(timeout, self.probe.probe(device)).await;
            (device.as_str(), outcome)
        });

        let mut confirmed = Vec::new();
        for (device, outcome) in join_all(probes).await {
            match outcome {
                Err(_) => confirmed.push(device.to_string()),
                Ok(Ok(())) => {
                    debug!(device, "Probe answered, drive is slow rather than crashed");
                }
                Ok(Err(e)) => {
                    warn!(device, error = %e, "Probe failed, not treating as crash evidence");
                }
            }
        }

        if confirmed.is_empty() {
            return Vec::new();
        }

        let now = self.clock.now();
        let (events, snapshot) = {
            let mut drives = self.drives.write();
            let mut events = Vec::new();
            for device in confirmed {
                let Some(entry) = drives.get_mut(&device) else {
                    continue;
                };
                let probed_heartbeat = suspects
                    .iter()
                    .find(|(d, _)| *d == device)
                    .map(|(_, hb)| *hb);
                // A refresh during the probe may have brought a newer heartbeat
                if entry.crash.is_some()
                    || !entry.status.is_ripping()
                    || Some(entry.status.heartbeat) != probed_heartbeat
                {
                    continue;
                }

                let heartbeat_age = entry.status.heartbeat_age(now);
                let mark = CrashMark {
                    heartbeat: entry.status.heartbeat,
                    heartbeat_age,
                };
                let (status, crash) = self.merge(entry.status.clone(), Some(mark), now);
                entry.status = status;
                entry.crash = crash;
                entry.suspected = false;

                warn!(device = %device, heartbeat_age, "Drive crash confirmed");
                events.push(CrashEvent {
                    device,
                    timestamp: now,
                    heartbeat_age,
                });
            }
            (events, collect_snapshot(&drives, &self.order.read()))
        };

        for event in &events {
            // No receivers is fine; crashes are also returned to the caller
            let _ = self.crash_tx.send(event.clone());
            self.events.publish(FleetEvent::Crash(event.clone()));
        }
        if !events.is_empty() {
            self.events.publish(FleetEvent::Drives(snapshot));
        }
        events
    }

    /// Lazy sequence of confirmed crashes.
    pub fn crash_events(&self) -> broadcast::Receiver<CrashEvent> {
        self.crash_tx.subscribe()
    }

    /// Current in-memory drive states in enumeration order.
    pub fn snapshot(&self) -> Vec<DriveStatus> {
        collect_snapshot(&self.drives.read(), &self.order.read())
    }

    /// Current in-memory state of one drive.
    pub fn get(&self, device: &str) -> Option<DriveStatus> {
        self.drives.read().get(device).map(|e| e.status.clone())
    }

    /// Re-read one drive's record now without updating the map.
    ///
    /// Crash marks still apply, so a crashed drive whose worker has not
    /// recovered reads as `crashed`.
    pub fn peek(&self, device: &str) -> DriveStatus {
        let read = read_status(&self.config.status_dir, device);
        let crash = self.drives.read().get(device).and_then(|e| e.crash);
        self.merge(read, crash, self.clock.now()).0
    }
}

fn collect_snapshot(drives: &BTreeMap<String, DriveEntry>, order: &[String]) -> Vec<DriveStatus> {
    order
        .iter()
        .filter_map(|device| drives.get(device).map(|e| e.status.clone()))
        .collect()
}
