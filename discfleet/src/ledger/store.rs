//! The drive stats ledger.
//!
//! Recording is in-memory only and never touches disk; persistence happens
//! through [`DriveStatsLedger::flush`], driven by the flush daemon and once
//! more at shutdown. A generation counter tracks unsaved changes so a change
//! recorded while a flush is writing is not lost.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::record::{DriveHealth, DriveHealthRecord, HealthEventKind, HealthPolicy};
use crate::time::SharedClock;

/// Ledger file format version.
const LEDGER_FORMAT_VERSION: u32 = 1;

/// Errors from ledger persistence.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Failed to write the ledger file
    #[error("Failed to write drive stats to {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    /// Failed to encode the ledger
    #[error("Failed to encode drive stats: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct LedgerFile {
    version: u32,
    #[serde(default)]
    drives: BTreeMap<String, DriveHealthRecord>,
}

#[derive(Debug, Default)]
struct LedgerInner {
    records: BTreeMap<String, DriveHealthRecord>,
    /// Bumped on every mutation.
    generation: u64,
    /// Generation last written to disk.
    flushed_generation: u64,
}

impl LedgerInner {
    fn touch(&mut self) {
        self.generation += 1;
    }
}

/// Persistent per-drive crash/reset ledger.
pub struct DriveStatsLedger {
    path: PathBuf,
    policy: HealthPolicy,
    clock: SharedClock,
    inner: Mutex<LedgerInner>,
    /// Serializes writers so an older snapshot never overwrites a newer one.
    write_lock: Mutex<()>,
}

impl DriveStatsLedger {
    /// Open the ledger at `path`, loading and pruning existing history.
    ///
    /// A missing file yields an empty ledger. An unreadable or corrupt file is
    /// logged and also yields an empty ledger; it is overwritten on the next
    /// flush.
    pub fn open(path: impl Into<PathBuf>, policy: HealthPolicy, clock: SharedClock) -> Self {
        let path = path.into();
        let mut records = load_records(&path);

        let cutoff = policy.retention_cutoff(clock.now());
        let pruned: usize = records.values_mut().map(|r| r.prune(cutoff)).sum();
        if pruned > 0 {
            debug!(pruned, "Pruned expired drive history on load");
        }

        info!(
            path = %path.display(),
            drives = records.len(),
            "Drive stats ledger opened"
        );

        Self {
            path,
            policy,
            clock,
            inner: Mutex::new(LedgerInner {
                records,
                generation: u64::from(pruned > 0),
                flushed_generation: 0,
            }),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Tier policy in effect.
    pub fn policy(&self) -> &HealthPolicy {
        &self.policy
    }

    /// Record a confirmed crash for `device`.
    pub fn record_crash(&self, device: &str) {
        self.record(device, HealthEventKind::Crash);
    }

    /// Record a bus reset that affected `device`.
    pub fn record_reset(&self, device: &str) {
        self.record(device, HealthEventKind::Reset);
    }

    fn record(&self, device: &str, kind: HealthEventKind) {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        inner
            .records
            .entry(device.to_string())
            .or_default()
            .record(kind, now);
        inner.touch();
        debug!(device, ?kind, "Recorded drive event");
    }

    /// Health snapshot for one device, if it has ever crashed or been reset.
    pub fn get(&self, device: &str) -> Option<DriveHealth> {
        let now = self.clock.now();
        let inner = self.inner.lock();
        inner
            .records
            .get(device)
            .map(|r| r.snapshot(device, &self.policy, now))
    }

    /// Health snapshot for one device, defaulting to a pristine record.
    pub fn get_or_pristine(&self, device: &str) -> DriveHealth {
        self.get(device)
            .unwrap_or_else(|| DriveHealth::pristine(device))
    }

    /// Health snapshots for every device with history, ordered by device id.
    pub fn get_all(&self) -> Vec<DriveHealth> {
        let now = self.clock.now();
        let inner = self.inner.lock();
        inner
            .records
            .iter()
            .map(|(device, r)| r.snapshot(device, &self.policy, now))
            .collect()
    }

    /// Discard all history for `device`, e.g. after the drive was replaced.
    ///
    /// Returns false if the device had no record.
    pub fn reset_device(&self, device: &str) -> bool {
        let mut inner = self.inner.lock();
        let existed = inner.records.remove(device).is_some();
        if existed {
            inner.touch();
            info!(device, "Drive stats cleared");
        }
        existed
    }

    /// Drop history outside the retention window. Returns events removed.
    pub fn prune(&self) -> usize {
        let cutoff = self.policy.retention_cutoff(self.clock.now());
        let mut inner = self.inner.lock();
        let removed: usize = inner.records.values_mut().map(|r| r.prune(cutoff)).sum();
        if removed > 0 {
            inner.touch();
            debug!(removed, "Pruned expired drive history");
        }
        removed
    }

    /// True if there are changes not yet written to disk.
    pub fn is_dirty(&self) -> bool {
        let inner = self.inner.lock();
        inner.generation != inner.flushed_generation
    }

    /// Write the ledger to disk if dirty.
    ///
    /// Returns `Ok(true)` if a write happened. On failure the in-memory state
    /// stays dirty so the next flush retries.
    pub fn flush(&self) -> Result<bool, LedgerError> {
        let _writer = self.write_lock.lock();

        let (file, generation) = {
            let inner = self.inner.lock();
            if inner.generation == inner.flushed_generation {
                return Ok(false);
            }
            (
                LedgerFile {
                    version: LEDGER_FORMAT_VERSION,
                    drives: inner.records.clone(),
                },
                inner.generation,
            )
        };

        let json = serde_json::to_vec_pretty(&file)?;
        write_atomic(&self.path, &json).map_err(|source| LedgerError::Write {
            path: self.path.clone(),
            source,
        })?;

        let mut inner = self.inner.lock();
        inner.flushed_generation = inner.flushed_generation.max(generation);
        debug!(
            path = %self.path.display(),
            drives = file.drives.len(),
            "Drive stats flushed"
        );
        Ok(true)
    }
}

fn load_records(path: &Path) -> BTreeMap<String, DriveHealthRecord> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return BTreeMap::new(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read drive stats, starting empty");
            return BTreeMap::new();
        }
    };

    match serde_json::from_slice::<LedgerFile>(&bytes) {
        Ok(file) => file.drives,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Corrupt drive stats file, starting empty");
            BTreeMap::new()
        }
    }
}

/// Write via a sibling temp file and rename so readers never see a torn file.
fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, data)?;
    fs::rename(&tmp, path)
}
