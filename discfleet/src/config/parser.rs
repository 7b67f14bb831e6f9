//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This module contains the `parse_ini()` function and its helpers.
//! It is the single place where INI key names are mapped to struct fields.

use ini::Ini;
use std::path::PathBuf;
use std::str::FromStr;

use super::file::ConfigFileError;
use super::settings::ConfigFile;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [paths] section
    if let Some(section) = ini.section(Some("paths")) {
        if let Some(v) = non_empty(section.get("status_dir")) {
            config.paths.status_dir = expand_tilde(v);
        }
        if let Some(v) = non_empty(section.get("history_path")) {
            config.paths.history_path = expand_tilde(v);
        }
        if let Some(v) = non_empty(section.get("stats_path")) {
            config.paths.stats_path = expand_tilde(v);
        }
        if let Some(v) = non_empty(section.get("log_dir")) {
            config.paths.log_dir = expand_tilde(v);
        }
    }

    // [monitor] section
    if let Some(section) = ini.section(Some("monitor")) {
        if let Some(v) = section.get("refresh_interval_secs") {
            config.monitor.refresh_interval_secs =
                parse_positive("monitor", "refresh_interval_secs", v)?;
        }
        if let Some(v) = section.get("crash_timeout_secs") {
            config.monitor.crash_timeout_secs = parse_positive("monitor", "crash_timeout_secs", v)?;
        }
        if let Some(v) = section.get("probe_timeout_secs") {
            config.monitor.probe_timeout_secs = parse_positive("monitor", "probe_timeout_secs", v)?;
        }
        if let Some(v) = section.get("crash_check_interval_secs") {
            config.monitor.crash_check_interval_secs =
                parse_positive("monitor", "crash_check_interval_secs", v)?;
        }
        if let Some(v) = non_empty(section.get("device_prefix")) {
            config.monitor.device_prefix = v.to_string();
        }
        if let Some(v) = non_empty(section.get("probe_command")) {
            config.monitor.probe_command = v.to_string();
        }
        if let Some(v) = section.get("watch_enabled") {
            config.monitor.watch_enabled = parse_bool(v);
        }
        if let Some(v) = non_empty(section.get("sysfs_root")) {
            config.monitor.sysfs_root = expand_tilde(v);
        }
    }

    // [topology] section
    if let Some(section) = ini.section(Some("topology")) {
        if let Some(v) = section.get("cache_ttl_secs") {
            config.topology.cache_ttl_secs = parse_value("topology", "cache_ttl_secs", v)?;
        }
        if let Some(v) = section.get("usb_settle_ms") {
            config.topology.usb_settle_ms = parse_value("topology", "usb_settle_ms", v)?;
        }
        if let Some(v) = section.get("reenumerate_ms") {
            config.topology.reenumerate_ms = parse_value("topology", "reenumerate_ms", v)?;
        }
    }

    // [recovery] section
    if let Some(section) = ini.section(Some("recovery")) {
        if let Some(v) = section.get("auto_reset") {
            config.recovery.auto_reset = parse_bool(v);
        }
    }

    // [ledger] section
    if let Some(section) = ini.section(Some("ledger")) {
        if let Some(v) = section.get("flush_interval_secs") {
            config.ledger.flush_interval_secs =
                parse_positive("ledger", "flush_interval_secs", v)?;
        }
        if let Some(v) = section.get("warning_crashes") {
            config.ledger.warning_crashes = parse_value("ledger", "warning_crashes", v)?;
        }
        if let Some(v) = section.get("replace_crashes") {
            config.ledger.replace_crashes = parse_value("ledger", "replace_crashes", v)?;
        }
        if let Some(v) = section.get("retention_days") {
            config.ledger.retention_days = parse_value("ledger", "retention_days", v)?;
        }
        if config.ledger.warning_crashes > config.ledger.replace_crashes {
            return Err(ConfigFileError::InvalidValue {
                section: "ledger".to_string(),
                key: "warning_crashes".to_string(),
                value: config.ledger.warning_crashes.to_string(),
                reason: format!(
                    "must not exceed replace_crashes ({})",
                    config.ledger.replace_crashes
                ),
            });
        }
    }

    // [server] section
    if let Some(section) = ini.section(Some("server")) {
        if let Some(v) = non_empty(section.get("listen")) {
            config.server.listen = parse_value("server", "listen", v)?;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = non_empty(section.get("file")) {
            config.logging.file = expand_tilde(v);
        }
    }

    Ok(config)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_value<T: FromStr>(section: &str, key: &str, value: &str) -> Result<T, ConfigFileError> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| ConfigFileError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            reason: format!("expected {}", std::any::type_name::<T>()),
        })
}

fn parse_positive(section: &str, key: &str, value: &str) -> Result<u64, ConfigFileError> {
    let parsed: u64 = parse_value(section, key, value)?;
    if parsed == 0 {
        return Err(ConfigFileError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(parsed)
}

/// Parse a boolean value from a config string.
/// Accepts: true/false, yes/no, 1/0, on/off (case-insensitive)
pub(super) fn parse_bool(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    v == "true" || v == "1" || v == "yes" || v == "on"
}

/// Expand ~ to home directory in paths.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
