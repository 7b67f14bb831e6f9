//! Time-related utility functions.
//!
//! Heartbeats written by rip workers are wall-clock epoch seconds (fractional),
//! so every component that compares against them reads time through a
//! [`Clock`]. Production code uses [`SystemClock`]; tests drive a
//! [`ManualClock`] to make staleness deterministic.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Seconds in one day.
pub const SECS_PER_DAY: f64 = 86_400.0;

/// Source of wall-clock time in epoch seconds.
pub trait Clock: Send + Sync {
    /// Current time as fractional seconds since the Unix epoch.
    fn now(&self) -> f64;
}

/// Shared clock handle.
pub type SharedClock = Arc<dyn Clock>;

/// Clock backed by [`SystemTime`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        system_time_to_epoch_secs(SystemTime::now())
    }
}

/// Manually advanced clock for tests and simulations.
///
/// Stores time as microseconds so it can be shared across threads without a lock.
#[derive(Debug, Default)]
pub struct ManualClock {
    micros: AtomicU64,
}

impl ManualClock {
    /// Create a clock frozen at `epoch_secs`.
    pub fn new(epoch_secs: f64) -> Self {
        Self {
            micros: AtomicU64::new(secs_to_micros(epoch_secs)),
        }
    }

    /// Jump to an absolute time.
    pub fn set(&self, epoch_secs: f64) {
        self.micros
            .store(secs_to_micros(epoch_secs), Ordering::SeqCst);
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        self.micros
            .fetch_add(by.as_micros() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.micros.load(Ordering::SeqCst) as f64 / 1_000_000.0
    }
}

/// Convert a `SystemTime` to fractional epoch seconds.
///
/// Times before the epoch clamp to zero.
pub fn system_time_to_epoch_secs(time: SystemTime) -> f64 {
    time.duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

fn secs_to_micros(secs: f64) -> u64 {
    (secs.max(0.0) * 1_000_000.0).round() as u64
}
