//! Ledger flush daemon.
//!
//! Periodically prunes expired history and writes the ledger to disk when it
//! has unsaved changes. On shutdown it performs one last flush so events
//! recorded since the previous tick survive a restart.
//!
//! # Example
//!
//! ```ignore
//! use discfleet::ledger::LedgerFlushDaemon;
//!
//! let daemon = LedgerFlushDaemon::new(Arc::clone(&ledger));
//! tokio::spawn(daemon.run(shutdown_token));
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::store::DriveStatsLedger;
use crate::config::DEFAULT_LEDGER_FLUSH_INTERVAL_SECS;

/// Background daemon that persists the drive stats ledger.
pub struct LedgerFlushDaemon {
    ledger: Arc<DriveStatsLedger>,
    flush_interval: Duration,
}

impl LedgerFlushDaemon {
    /// Creates a daemon with the default flush interval.
    pub fn new(ledger: Arc<DriveStatsLedger>) -> Self {
        Self {
            ledger,
            flush_interval: Duration::from_secs(DEFAULT_LEDGER_FLUSH_INTERVAL_SECS),
        }
    }

    /// Sets a custom flush interval.
    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    /// One flush pass: prune then write if dirty.
    ///
    /// File I/O runs on the blocking pool so recording is never stalled by a
    /// slow disk.
    async fn tick(&self) {
        let ledger = Arc::clone(&self.ledger);
        let result = tokio::task::spawn_blocking(move || {
            ledger.prune();
            ledger.flush()
        })
        .await;

        match result {
            Ok(Ok(true)) => debug!("Ledger flush tick wrote changes"),
            Ok(Ok(false)) => {}
            Ok(Err(e)) => warn!(error = %e, "Ledger flush failed, will retry next interval"),
            Err(e) => warn!(error = %e, "Ledger flush task panicked"),
        }
    }

    /// Runs the daemon until shutdown is signalled, then flushes once more.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            flush_interval_secs = self.flush_interval.as_secs(),
            path = %self.ledger.path().display(),
            "Ledger flush daemon starting"
        );

        let mut interval = tokio::time::interval(self.flush_interval);
        // Skip the first immediate tick
        interval.tick().await;

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Ledger flush daemon shutting down");
                    break;
                }

                _ = interval.tick() => {
                    self.tick().await;
                }
            }
        }

        if let Err(e) = self.ledger.flush() {
            warn!(error = %e, "Final ledger flush failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::HealthPolicy;
    use crate::time::ManualClock;
    use tempfile::TempDir;

    fn ledger(dir: &TempDir) -> Arc<DriveStatsLedger> {
        Arc::new(DriveStatsLedger::open(
            dir.path().join("drive_stats.json"),
            HealthPolicy::default(),
            Arc::new(ManualClock::new(1_700_000_000.0)),
        ))
    }

    #[tokio::test]
    async fn test_flushes_on_interval() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger(&dir);
        ledger.record_crash("sr0");

        let token = CancellationToken::new();
        let daemon =
            LedgerFlushDaemon::new(Arc::clone(&ledger)).with_flush_interval(Duration::from_millis(20));
        let handle = tokio::spawn(daemon.run(token.clone()));

        for _ in 0..50 {
            if !ledger.is_dirty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!ledger.is_dirty());
        assert!(ledger.path().exists());

        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_final_flush_on_shutdown() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger(&dir);

        let token = CancellationToken::new();
        let daemon =
            LedgerFlushDaemon::new(Arc::clone(&ledger)).with_flush_interval(Duration::from_secs(3600));
        let handle = tokio::spawn(daemon.run(token.clone()));

        ledger.record_reset("sr3");
        token.cancel();
        handle.await.unwrap();

        assert!(!ledger.is_dirty());
        let text = std::fs::read_to_string(ledger.path()).unwrap();
        assert!(text.contains("sr3"));
    }
}
