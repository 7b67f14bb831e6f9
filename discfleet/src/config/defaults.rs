//! Default values and constants for all configuration settings.
//!
//! Contains all `DEFAULT_*` constants and the `ConfigFile::default()`
//! implementation.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use super::file::config_directory;
use super::settings::*;

// =============================================================================
// Monitor
// =============================================================================

/// Status refresh tick.
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 2;

/// Heartbeat staleness threshold for ripping drives.
pub const DEFAULT_CRASH_TIMEOUT_SECS: u64 = 300;

/// Bound on the crash confirmation probe.
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 5;

/// Crash confirmation tick.
pub const DEFAULT_CRASH_CHECK_INTERVAL_SECS: u64 = 5;

/// Optical drives appear as `sr0`, `sr1`, ...
pub const DEFAULT_DEVICE_PREFIX: &str = "sr";

/// SCSI INQUIRY via sg3_utils.
pub const DEFAULT_PROBE_COMMAND: &str = "sg_inq";

/// Default hardware-description filesystem.
pub const DEFAULT_SYSFS_ROOT: &str = "/sys";

// =============================================================================
// Topology
// =============================================================================

/// Bus discovery cache lifetime.
pub const DEFAULT_BUS_CACHE_TTL_SECS: u64 = 60;

/// USB deauthorize hold time.
pub const DEFAULT_USB_SETTLE_MS: u64 = 1_000;

/// Post-reset re-enumeration wait.
pub const DEFAULT_REENUMERATE_MS: u64 = 3_000;

// =============================================================================
// Ledger
// =============================================================================

/// Ledger flush tick.
pub const DEFAULT_LEDGER_FLUSH_INTERVAL_SECS: u64 = 30;

/// 7-day crash count for the `warning` tier.
pub const DEFAULT_WARNING_CRASHES: u32 = 3;

/// 7-day crash count for the `replace` tier.
pub const DEFAULT_REPLACE_CRASHES: u32 = 5;

/// Event history retention.
pub const DEFAULT_RETENTION_DAYS: u32 = 30;

// =============================================================================
// Server
// =============================================================================

/// Default query surface port.
pub const DEFAULT_LISTEN_PORT: u16 = 8787;

/// Loopback on the default port.
pub fn default_listen_addr() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), DEFAULT_LISTEN_PORT)
}

impl Default for ConfigFile {
    fn default() -> Self {
        let base = config_directory();

        Self {
            paths: PathSettings {
                status_dir: base.join("status"),
                history_path: base.join("history.jsonl"),
                stats_path: base.join("drive_stats.json"),
                log_dir: base.join("logs"),
            },
            monitor: MonitorSettings {
                refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
                crash_timeout_secs: DEFAULT_CRASH_TIMEOUT_SECS,
                probe_timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
                crash_check_interval_secs: DEFAULT_CRASH_CHECK_INTERVAL_SECS,
                device_prefix: DEFAULT_DEVICE_PREFIX.to_string(),
                probe_command: DEFAULT_PROBE_COMMAND.to_string(),
                watch_enabled: true,
                sysfs_root: DEFAULT_SYSFS_ROOT.into(),
            },
            topology: TopologySettings {
                cache_ttl_secs: DEFAULT_BUS_CACHE_TTL_SECS,
                usb_settle_ms: DEFAULT_USB_SETTLE_MS,
                reenumerate_ms: DEFAULT_REENUMERATE_MS,
            },
            recovery: RecoverySettings { auto_reset: true },
            ledger: LedgerSettings {
                flush_interval_secs: DEFAULT_LEDGER_FLUSH_INTERVAL_SECS,
                warning_crashes: DEFAULT_WARNING_CRASHES,
                replace_crashes: DEFAULT_REPLACE_CRASHES,
                retention_days: DEFAULT_RETENTION_DAYS,
            },
            server: ServerSettings {
                listen: default_listen_addr(),
            },
            logging: LoggingSettings {
                file: base.join("discfleet.log"),
            },
        }
    }
}
