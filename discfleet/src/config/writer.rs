//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! This module contains the `to_config_string()` function that produces
//! the commented INI representation written to `config.ini`.

use std::path::Path;

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    format!(
        r#"[paths]
; Directory where rip workers write one <device>.json status record per drive
status_dir = {}
; Append-only rip history written by the rip workflow (JSON lines)
history_path = {}
; Drive crash/reset ledger owned by the fleet manager
stats_path = {}
; Directory holding per-drive rip logs (<device>.log)
log_dir = {}

[monitor]
; Seconds between status record refreshes
refresh_interval_secs = {}
; A ripping drive whose heartbeat is older than this becomes a crash suspect
crash_timeout_secs = {}
; Upper bound on the identification probe used to confirm a crash
probe_timeout_secs = {}
; Seconds between crash confirmation passes
crash_check_interval_secs = {}
; Block device prefix for optical drives
device_prefix = {}
; Identification command, invoked as: <probe_command> /dev/<device>
probe_command = {}
; Refresh early when status files change (the periodic refresh always runs)
watch_enabled = {}
; Root of the sysfs tree used for device and bus discovery
sysfs_root = {}

[topology]
; Seconds a discovered bus topology stays cached
cache_ttl_secs = {}
; Milliseconds a USB port stays deauthorized during a reset
usb_settle_ms = {}
; Milliseconds to wait for devices to re-enumerate after a reset
reenumerate_ms = {}

[recovery]
; Reset a crashed drive's bus automatically when no sibling is ripping
auto_reset = {}

[ledger]
; Seconds between ledger flushes (only written when changed)
flush_interval_secs = {}
; 7-day crash count flagging a drive as 'warning'
warning_crashes = {}
; 7-day crash count flagging a drive as 'replace'
replace_crashes = {}
; Days of crash/reset history kept (never less than 30)
retention_days = {}

[server]
; Listen address for the HTTP query surface and event feed
listen = {}

[logging]
; Fleet manager log file
file = {}
"#,
        path_to_string(&config.paths.status_dir),
        path_to_string(&config.paths.history_path),
        path_to_string(&config.paths.stats_path),
        path_to_string(&config.paths.log_dir),
        config.monitor.refresh_interval_secs,
        config.monitor.crash_timeout_secs,
        config.monitor.probe_timeout_secs,
        config.monitor.crash_check_interval_secs,
        config.monitor.device_prefix,
        config.monitor.probe_command,
        config.monitor.watch_enabled,
        path_to_string(&config.monitor.sysfs_root),
        config.topology.cache_ttl_secs,
        config.topology.usb_settle_ms,
        config.topology.reenumerate_ms,
        config.recovery.auto_reset,
        config.ledger.flush_interval_secs,
        config.ledger.warning_crashes,
        config.ledger.replace_crashes,
        config.ledger.retention_days,
        config.server.listen,
        path_to_string(&config.logging.file),
    )
}

fn path_to_string(path: &Path) -> String {
    path.to_string_lossy().to_string()
}
