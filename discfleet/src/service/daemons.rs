//! Periodic fleet activities.
//!
//! Each daemon owns one `tokio::time::interval` and exits when the shutdown
//! token is cancelled. None of them hold a lock across an await; the only
//! suspensions are the bounded probe and reset delays.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::recovery::{RecoveryOrchestrator, RecoveryOutcome};
use crate::status::StatusAggregator;

/// Re-reads status records on a fixed tick, or earlier when woken.
pub struct StatusRefreshDaemon {
    aggregator: Arc<StatusAggregator>,
    interval: Duration,
    wake: Option<Arc<Notify>>,
}

impl StatusRefreshDaemon {
    pub fn new(aggregator: Arc<StatusAggregator>, interval: Duration) -> Self {
        Self {
            aggregator,
            interval,
            wake: None,
        }
    }

    /// Refresh early whenever `wake` is notified.
    pub fn with_wake(mut self, wake: Arc<Notify>) -> Self {
        self.wake = Some(wake);
        self
    }

    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_ms = self.interval.as_millis() as u64,
            watched = self.wake.is_some(),
            "Status refresh daemon starting"
        );

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let wake = self.wake.clone();

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Status refresh daemon shutting down");
                    break;
                }

                _ = interval.tick() => {
                    self.aggregator.refresh();
                }

                _ = wait_for(wake.as_deref()) => {
                    self.aggregator.refresh();
                }
            }
        }
    }
}

async fn wait_for(wake: Option<&Notify>) {
    match wake {
        Some(notify) => notify.notified().await,
        None => std::future::pending().await,
    }
}

/// Confirms crashes and hands them to the orchestrator.
pub struct CrashMonitorDaemon {
    aggregator: Arc<StatusAggregator>,
    orchestrator: Arc<RecoveryOrchestrator>,
    interval: Duration,
}

impl CrashMonitorDaemon {
    pub fn new(
        aggregator: Arc<StatusAggregator>,
        orchestrator: Arc<RecoveryOrchestrator>,
        interval: Duration,
    ) -> Self {
        Self {
            aggregator,
            orchestrator,
            interval,
        }
    }

    /// One pass: confirm crashes, recover them concurrently, retry deferrals.
    pub async fn tick(&self) {
        let crashes = self.aggregator.check_crashes().await;
        if !crashes.is_empty() {
            let outcomes = join_all(
                crashes
                    .iter()
                    .map(|crash| self.orchestrator.handle_crash(crash)),
            )
            .await;
            for (crash, outcome) in crashes.iter().zip(outcomes) {
                log_outcome(&crash.device, &outcome);
            }
        }

        for (device, outcome) in self.orchestrator.retry_deferred().await {
            if !matches!(outcome, RecoveryOutcome::Deferred { .. }) {
                log_outcome(&device, &outcome);
            }
        }
    }

    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            auto_reset = self.orchestrator.auto_reset(),
            "Crash monitor daemon starting"
        );

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // Skip the first immediate tick
        interval.tick().await;

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Crash monitor daemon shutting down");
                    break;
                }

                _ = interval.tick() => {
                    self.tick().await;
                }
            }
        }
    }
}

fn log_outcome(device: &str, outcome: &RecoveryOutcome) {
    match outcome {
        RecoveryOutcome::Reset(report) => {
            info!(device, bus_id = %report.bus_id, "Crashed drive recovered by bus reset")
        }
        RecoveryOutcome::Deferred { bus_id, .. } => {
            debug!(device, bus_id = %bus_id, "Recovery deferred")
        }
        RecoveryOutcome::Failed { bus_id, error } => {
            warn!(device, bus_id = %bus_id, error = %error, "Automatic reset failed")
        }
        RecoveryOutcome::Unsupported { bus_id } => {
            warn!(device, bus_id = %bus_id, "Crashed drive needs manual attention")
        }
        RecoveryOutcome::InProgress { .. }
        | RecoveryOutcome::Disabled
        | RecoveryOutcome::Recovered => debug!(device, ?outcome, "Recovery outcome"),
    }
}
