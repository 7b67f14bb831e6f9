//! Configuration for the fleet manager.
//!
//! Configuration is read from `~/.discfleet/config.ini` (all keys optional)
//! and then overlaid with `DISCFLEET_*` environment variables.
//!
//! # Example
//!
//! ```
//! use discfleet::config::ConfigFile;
//!
//! let mut config = ConfigFile::default();
//! config
//!     .apply_env(|name| (name == "DISCFLEET_CRASH_TIMEOUT").then(|| "600".to_string()))
//!     .unwrap();
//! assert_eq!(config.monitor.crash_timeout_secs, 600);
//! ```

mod defaults;
mod env;
mod file;
mod parser;
mod settings;
mod writer;

pub use env::*;
pub use file::{
    config_directory, config_file_path, default_listen_addr, ConfigFile, ConfigFileError,
    DEFAULT_BUS_CACHE_TTL_SECS, DEFAULT_CRASH_CHECK_INTERVAL_SECS, DEFAULT_CRASH_TIMEOUT_SECS,
    DEFAULT_DEVICE_PREFIX, DEFAULT_LEDGER_FLUSH_INTERVAL_SECS, DEFAULT_LISTEN_PORT,
    DEFAULT_PROBE_COMMAND, DEFAULT_PROBE_TIMEOUT_SECS, DEFAULT_REENUMERATE_MS,
    DEFAULT_REFRESH_INTERVAL_SECS, DEFAULT_REPLACE_CRASHES, DEFAULT_RETENTION_DAYS,
    DEFAULT_SYSFS_ROOT, DEFAULT_USB_SETTLE_MS, DEFAULT_WARNING_CRASHES,
};
pub use settings::{
    LedgerSettings, LoggingSettings, MonitorSettings, PathSettings, RecoverySettings,
    ServerSettings, TopologySettings,
};
