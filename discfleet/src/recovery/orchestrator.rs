//! Recovery orchestrator.
//!
//! Turns confirmed crashes into bus resets while holding one rule: a bus with
//! a drive that is actively ripping is never reset unless an operator
//! explicitly confirms. Every safety decision reads drive status fresh from
//! disk at decision time rather than trusting the last refresh.
//!
//! ```text
//! automatic: CrashEvent -> record crash -> safety check -> reset | defer
//! manual:    request    -> safety check -> reset | confirmation required
//! ```
//!
//! Deferred drives are retried on every crash check tick until they reset or
//! stop being crashed.

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::error::RecoveryError;
use crate::events::{EventBus, FleetEvent, ResetEvent, ResetTrigger};
use crate::ledger::DriveStatsLedger;
use crate::status::{CrashEvent, StatusAggregator};
use crate::time::SharedClock;
use crate::topology::{Bus, BusTopology, BusType, TopologyError};

/// Result of an executed reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetReport {
    pub bus_id: String,
    pub bus_type: BusType,
    /// Every drive on the bus.
    pub devices: Vec<String>,
    /// Crashed drives the reset was recorded against.
    pub recorded: Vec<String>,
    pub trigger: ResetTrigger,
    pub timestamp: f64,
}

/// What the automatic path did with a crash.
#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryOutcome {
    /// The bus was reset.
    Reset(ResetReport),
    /// A sibling is ripping; retried on a later tick.
    Deferred {
        bus_id: String,
        active_devices: Vec<String>,
    },
    /// Automatic reset is turned off.
    Disabled,
    /// The drive's bus cannot be reset.
    Unsupported { bus_id: String },
    /// Another reset of the same bus is already running.
    InProgress { bus_id: String },
    /// The reset was attempted and failed.
    Failed { bus_id: String, error: String },
    /// The drive recovered before its deferred reset ran.
    Recovered,
}

/// Drives crash recovery for the fleet.
pub struct RecoveryOrchestrator {
    aggregator: Arc<StatusAggregator>,
    topology: Arc<BusTopology>,
    ledger: Arc<DriveStatsLedger>,
    events: EventBus,
    clock: SharedClock,
    auto_reset: bool,
    deferred: Mutex<BTreeSet<String>>,
}

impl RecoveryOrchestrator {
    pub fn new(
        aggregator: Arc<StatusAggregator>,
        topology: Arc<BusTopology>,
        ledger: Arc<DriveStatsLedger>,
        events: EventBus,
        clock: SharedClock,
        auto_reset: bool,
    ) -> Self {
        Self {
            aggregator,
            topology,
            ledger,
            events,
            clock,
            auto_reset,
            deferred: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn auto_reset(&self) -> bool {
        self.auto_reset
    }

    /// Drives waiting for their bus to become idle.
    pub fn deferred(&self) -> Vec<String> {
        self.deferred.lock().iter().cloned().collect()
    }

    /// Handle a newly confirmed crash.
    pub async fn handle_crash(&self, crash: &CrashEvent) -> RecoveryOutcome {
        self.ledger.record_crash(&crash.device);
        self.attempt_automatic(&crash.device).await
    }

    /// Retry every deferred drive that is still crashed.
    pub async fn retry_deferred(&self) -> Vec<(String, RecoveryOutcome)> {
        let pending = self.deferred();
        let mut outcomes = Vec::new();

        for device in pending {
            // An earlier reset in this pass may have covered it
            if !self.deferred.lock().contains(&device) {
                continue;
            }

            let still_crashed = self
                .aggregator
                .get(&device)
                .is_some_and(|status| status.is_crashed());
            if !still_crashed {
                debug!(device = %device, "Deferred drive no longer crashed");
                self.deferred.lock().remove(&device);
                outcomes.push((device, RecoveryOutcome::Recovered));
                continue;
            }

            let outcome = self.attempt_automatic(&device).await;
            outcomes.push((device, outcome));
        }
        outcomes
    }

    async fn attempt_automatic(&self, device: &str) -> RecoveryOutcome {
        if !self.auto_reset {
            info!(device, "Automatic reset disabled, leaving crashed drive for operator");
            return RecoveryOutcome::Disabled;
        }

        let Some(bus) = self.topology.find_bus_for(device) else {
            warn!(device, "No bus found for crashed drive");
            return RecoveryOutcome::Unsupported {
                bus_id: Bus::unknown(device).id,
            };
        };
        if !bus.reset_supported {
            warn!(device, bus_id = %bus.id, "Crashed drive's bus does not support reset");
            self.deferred.lock().remove(device);
            return RecoveryOutcome::Unsupported { bus_id: bus.id };
        }

        let active_devices = self.active_members(&bus);
        if !active_devices.is_empty() {
            let newly = self.deferred.lock().insert(device.to_string());
            if newly {
                info!(
                    device,
                    bus_id = %bus.id,
                    active = ?active_devices,
                    "Reset deferred, sibling drives are ripping"
                );
            }
            return RecoveryOutcome::Deferred {
                bus_id: bus.id,
                active_devices,
            };
        }

        let bus_id = bus.id.clone();
        match self.execute(bus, ResetTrigger::Automatic, Some(device)).await {
            Ok(report) => RecoveryOutcome::Reset(report),
            Err(TopologyError::ResetInProgress(bus_id)) => {
                // The running reset snapshotted its crashed members before this one
                debug!(device, bus_id = %bus_id, "Bus already resetting, deferring");
                self.deferred.lock().insert(device.to_string());
                RecoveryOutcome::InProgress { bus_id }
            }
            Err(e) => {
                self.deferred.lock().remove(device);
                RecoveryOutcome::Failed {
                    bus_id,
                    error: e.to_string(),
                }
            }
        }
    }

    /// Operator-requested reset of a bus.
    ///
    /// Without `confirm`, a bus with ripping drives is refused with
    /// [`RecoveryError::ConfirmationRequired`] listing exactly those drives.
    pub async fn manual_reset(
        &self,
        bus_id: &str,
        confirm: bool,
    ) -> Result<ResetReport, RecoveryError> {
        let bus = self
            .topology
            .get(bus_id)
            .ok_or_else(|| TopologyError::NotFound(bus_id.to_string()))?;
        if !bus.reset_supported {
            return Err(TopologyError::Unsupported(bus.id).into());
        }

        let active_devices = self.active_members(&bus);
        if !active_devices.is_empty() {
            if !confirm {
                info!(bus_id, active = ?active_devices, "Manual reset needs confirmation");
                return Err(RecoveryError::ConfirmationRequired {
                    bus_id: bus.id,
                    active_devices,
                });
            }
            warn!(bus_id, active = ?active_devices, "Resetting bus with active rips by operator override");
        }

        Ok(self.execute(bus, ResetTrigger::Manual, None).await?)
    }

    /// Members of `bus` whose current record says `ripping`.
    fn active_members(&self, bus: &Bus) -> Vec<String> {
        bus.devices
            .iter()
            .filter(|device| self.aggregator.peek(device).is_ripping())
            .cloned()
            .collect()
    }

    async fn execute(
        &self,
        bus: Bus,
        trigger: ResetTrigger,
        crashed_device: Option<&str>,
    ) -> Result<ResetReport, TopologyError> {
        let mut recorded: Vec<String> = bus
            .devices
            .iter()
            .filter(|device| self.aggregator.peek(device).is_crashed())
            .cloned()
            .collect();
        if let Some(device) = crashed_device {
            if !recorded.iter().any(|d| d == device) {
                recorded.push(device.to_string());
            }
        }

        self.topology.reset(&bus.id).await?;

        for device in &recorded {
            self.ledger.record_reset(device);
        }
        {
            let mut deferred = self.deferred.lock();
            for device in &recorded {
                deferred.remove(device);
            }
        }

        let report = ResetReport {
            bus_id: bus.id,
            bus_type: bus.bus_type,
            devices: bus.devices,
            recorded,
            trigger,
            timestamp: self.clock.now(),
        };
        info!(
            bus_id = %report.bus_id,
            %trigger,
            recorded = ?report.recorded,
            "Bus reset recorded"
        );
        self.events.publish(FleetEvent::Reset(ResetEvent {
            bus_id: report.bus_id.clone(),
            devices: report.devices.clone(),
            recorded: report.recorded.clone(),
            trigger,
            timestamp: report.timestamp,
        }));
        Ok(report)
    }
}
