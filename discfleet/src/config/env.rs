//! Environment variable overrides.
//!
//! Rip hosts are usually provisioned through service unit files, so the
//! options operators change most often can be set with `DISCFLEET_*`
//! variables. Environment values take precedence over config.ini.

use std::path::PathBuf;

use super::file::ConfigFileError;
use super::parser::{expand_tilde, parse_bool};
use super::settings::ConfigFile;

/// Status record directory.
pub const ENV_STATUS_DIR: &str = "DISCFLEET_STATUS_DIR";
/// Rip history file.
pub const ENV_HISTORY_PATH: &str = "DISCFLEET_HISTORY_PATH";
/// Drive stats ledger file.
pub const ENV_STATS_PATH: &str = "DISCFLEET_STATS_PATH";
/// Per-device log directory.
pub const ENV_LOG_DIR: &str = "DISCFLEET_LOG_DIR";
/// Heartbeat staleness threshold in seconds.
pub const ENV_CRASH_TIMEOUT: &str = "DISCFLEET_CRASH_TIMEOUT";
/// Probe bound in seconds.
pub const ENV_PROBE_TIMEOUT: &str = "DISCFLEET_PROBE_TIMEOUT";
/// Automatic reset toggle.
pub const ENV_AUTO_RESET: &str = "DISCFLEET_AUTO_RESET";
/// Query surface listen address.
pub const ENV_LISTEN: &str = "DISCFLEET_LISTEN";
/// Hardware-description filesystem root.
pub const ENV_SYSFS_ROOT: &str = "DISCFLEET_SYSFS_ROOT";
/// Identification probe command.
pub const ENV_PROBE_COMMAND: &str = "DISCFLEET_PROBE_COMMAND";

impl ConfigFile {
    /// Overlay environment overrides using `lookup` to resolve variable names.
    ///
    /// Taking a lookup function keeps this testable without mutating the
    /// process environment.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigFileError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(ENV_STATUS_DIR) {
            self.paths.status_dir = expand_tilde(v.trim());
        }
        if let Some(v) = get(ENV_HISTORY_PATH) {
            self.paths.history_path = expand_tilde(v.trim());
        }
        if let Some(v) = get(ENV_STATS_PATH) {
            self.paths.stats_path = expand_tilde(v.trim());
        }
        if let Some(v) = get(ENV_LOG_DIR) {
            self.paths.log_dir = expand_tilde(v.trim());
        }
        if let Some(v) = get(ENV_CRASH_TIMEOUT) {
            self.monitor.crash_timeout_secs = parse_secs(ENV_CRASH_TIMEOUT, &v)?;
        }
        if let Some(v) = get(ENV_PROBE_TIMEOUT) {
            self.monitor.probe_timeout_secs = parse_secs(ENV_PROBE_TIMEOUT, &v)?;
        }
        if let Some(v) = get(ENV_AUTO_RESET) {
            self.recovery.auto_reset = parse_bool(&v);
        }
        if let Some(v) = get(ENV_LISTEN) {
            self.server.listen = v.trim().parse().map_err(|_| ConfigFileError::InvalidEnv {
                name: ENV_LISTEN.to_string(),
                value: v.clone(),
                reason: "expected host:port".to_string(),
            })?;
        }
        if let Some(v) = get(ENV_SYSFS_ROOT) {
            self.monitor.sysfs_root = PathBuf::from(v.trim());
        }
        if let Some(v) = get(ENV_PROBE_COMMAND) {
            self.monitor.probe_command = v.trim().to_string();
        }

        Ok(())
    }
}

fn parse_secs(name: &str, value: &str) -> Result<u64, ConfigFileError> {
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(secs),
        _ => Err(ConfigFileError::InvalidEnv {
            name: name.to_string(),
            value: value.to_string(),
            reason: "expected a positive number of seconds".to_string(),
        }),
    }
}
