//! Status directory watcher.
//!
//! Polls a cheap fingerprint of the status directory (file names, sizes and
//! modification times) and wakes the refresh loop as soon as it changes, so
//! the dashboard reacts faster than the fixed refresh tick. The periodic
//! refresh keeps running regardless; this only shortens latency.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Default fingerprint poll interval.
pub const DEFAULT_WATCH_INTERVAL_MS: u64 = 250;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    name: String,
    len: u64,
    modified: Option<SystemTime>,
}

/// Snapshot of a directory's visible state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DirFingerprint(Vec<Entry>);

impl DirFingerprint {
    /// Fingerprint `*.json` files in `dir`. A missing directory is empty.
    pub fn take(dir: &Path) -> Self {
        let Ok(entries) = fs::read_dir(dir) else {
            return Self::default();
        };

        let mut files: Vec<Entry> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
            .filter_map(|e| {
                let meta = e.metadata().ok()?;
                Some(Entry {
                    name: e.file_name().to_string_lossy().into_owned(),
                    len: meta.len(),
                    modified: meta.modified().ok(),
                })
            })
            .collect();
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Self(files)
    }
}

/// Wakes a [`Notify`] whenever the status directory changes.
pub struct StatusWatcher {
    status_dir: PathBuf,
    poll_interval: Duration,
    wake: Arc<Notify>,
}

impl StatusWatcher {
    pub fn new(status_dir: impl Into<PathBuf>, wake: Arc<Notify>) -> Self {
        Self {
            status_dir: status_dir.into(),
            poll_interval: Duration::from_millis(DEFAULT_WATCH_INTERVAL_MS),
            wake,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Runs until shutdown is signalled.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            path = %self.status_dir.display(),
            poll_ms = self.poll_interval.as_millis() as u64,
            "Status watcher starting"
        );

        let mut last = DirFingerprint::take(&self.status_dir);
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.tick().await;

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Status watcher shutting down");
                    break;
                }

                _ = interval.tick() => {
                    let current = DirFingerprint::take(&self.status_dir);
                    if current != last {
                        debug!("Status directory changed");
                        last = current;
                        self.wake.notify_one();
                    }
                }
            }
        }
    }
}
