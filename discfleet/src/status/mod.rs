//! Drive status aggregation and crash detection.
//!
//! Rip workers publish one JSON status record per drive. This module turns
//! those records into authoritative drive state and decides when a silent
//! drive has actually crashed.

mod aggregator;
mod drive;
mod probe;
mod record;
mod watcher;

pub use aggregator::{AggregatorConfig, StatusAggregator};
pub use drive::{CrashEvent, DriveState, DriveStatus};
pub use probe::{CommandProbe, DeviceProbe};
pub use record::{read_status, status_path, StatusRecord};
pub use watcher::{DirFingerprint, StatusWatcher, DEFAULT_WATCH_INTERVAL_MS};
