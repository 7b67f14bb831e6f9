//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    /// Filesystem locations shared with the rip workers
    pub paths: PathSettings,
    /// Status polling and crash detection
    pub monitor: MonitorSettings,
    /// Bus discovery and reset timing
    pub topology: TopologySettings,
    /// Automatic recovery policy
    pub recovery: RecoverySettings,
    /// Drive stats ledger persistence and health tiers
    pub ledger: LedgerSettings,
    /// Query/event HTTP surface
    pub server: ServerSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

/// Paths to files written by the rip workflow or owned by the fleet manager.
#[derive(Debug, Clone, PartialEq)]
pub struct PathSettings {
    /// Directory holding one `<device>.json` status record per drive
    pub status_dir: PathBuf,
    /// Append-only rip history (JSON lines)
    pub history_path: PathBuf,
    /// Drive stats ledger file
    pub stats_path: PathBuf,
    /// Directory holding one `<device>.log` per drive
    pub log_dir: PathBuf,
}

/// Status aggregation and crash detection settings.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorSettings {
    /// Interval between status refresh ticks
    pub refresh_interval_secs: u64,
    /// Heartbeat age after which a ripping drive becomes a crash suspect
    pub crash_timeout_secs: u64,
    /// Hard bound on the identification probe
    pub probe_timeout_secs: u64,
    /// Interval between crash confirmation ticks
    pub crash_check_interval_secs: u64,
    /// Block device name prefix identifying optical drives
    pub device_prefix: String,
    /// Identification command invoked as `<command> /dev/<device>`
    pub probe_command: String,
    /// Wake the refresh loop early when status files change
    pub watch_enabled: bool,
    /// Root of the hardware-description filesystem
    pub sysfs_root: PathBuf,
}

/// Bus topology settings.
#[derive(Debug, Clone, PartialEq)]
pub struct TopologySettings {
    /// How long a discovered topology stays cached
    pub cache_ttl_secs: u64,
    /// Hold time between USB deauthorize and reauthorize
    pub usb_settle_ms: u64,
    /// Wait after a reset before the bus is considered re-enumerated
    pub reenumerate_ms: u64,
}

/// Recovery settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RecoverySettings {
    /// Reset buses automatically when a crash is confirmed
    pub auto_reset: bool,
}

/// Drive stats ledger settings.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerSettings {
    /// Interval between flushes of a dirty ledger
    pub flush_interval_secs: u64,
    /// 7-day crash count at which a drive is flagged `warning`
    pub warning_crashes: u32,
    /// 7-day crash count at which a drive is flagged `replace`
    pub replace_crashes: u32,
    /// Days of event history retained
    pub retention_days: u32,
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerSettings {
    /// Listen address for the query surface
    pub listen: SocketAddr,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    /// Fleet manager log file
    pub file: PathBuf,
}
