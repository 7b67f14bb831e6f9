//! Optical drive enumeration.
//!
//! Both the status aggregator and the topology resolver need the current set
//! of drive devices. Production code lists `<sysfs>/block`; tests use a
//! [`StaticEnumerator`] whose contents they control.

use std::fs;
use std::path::PathBuf;

use parking_lot::RwLock;
use tracing::debug;

/// Source of the current drive device ids (e.g. `sr0`).
pub trait DeviceEnumerator: Send + Sync {
    /// Current devices in display order.
    fn devices(&self) -> Vec<String>;
}

/// Sort `sr2` before `sr10`.
pub fn sort_devices(devices: &mut [String]) {
    devices.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
}

/// Lists block devices whose name starts with a prefix.
#[derive(Debug, Clone)]
pub struct SysfsEnumerator {
    sysfs_root: PathBuf,
    prefix: String,
}

impl SysfsEnumerator {
    pub fn new(sysfs_root: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            sysfs_root: sysfs_root.into(),
            prefix: prefix.into(),
        }
    }
}

impl DeviceEnumerator for SysfsEnumerator {
    fn devices(&self) -> Vec<String> {
        let block = self.sysfs_root.join("block");
        let entries = match fs::read_dir(&block) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(path = %block.display(), error = %e, "Cannot list block devices");
                return Vec::new();
            }
        };

        let mut devices: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with(&self.prefix))
            .collect();
        sort_devices(&mut devices);
        devices
    }
}

/// Fixed device list, replaceable at runtime.
#[derive(Debug, Default)]
pub struct StaticEnumerator {
    devices: RwLock<Vec<String>>,
}

impl StaticEnumerator {
    pub fn new<I, S>(devices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let enumerator = Self::default();
        enumerator.set(devices);
        enumerator
    }

    /// Replace the device list.
    pub fn set<I, S>(&self, devices: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut list: Vec<String> = devices.into_iter().map(Into::into).collect();
        sort_devices(&mut list);
        *self.devices.write() = list;
    }
}

impl DeviceEnumerator for StaticEnumerator {
    fn devices(&self) -> Vec<String> {
        self.devices.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sysfs_enumerator_filters_prefix() {
        let dir = TempDir::new().unwrap();
        for name in ["sr10", "sda", "sr0", "sr2", "loop0"] {
            fs::create_dir_all(dir.path().join("block").join(name)).unwrap();
        }

        let devices = SysfsEnumerator::new(dir.path(), "sr").devices();
        assert_eq!(devices, vec!["sr0", "sr2", "sr10"]);
    }

    #[test]
    fn test_sysfs_enumerator_missing_root() {
        let dir = TempDir::new().unwrap();
        let devices = SysfsEnumerator::new(dir.path().join("nope"), "sr").devices();
        assert!(devices.is_empty());
    }

    #[test]
    fn test_static_enumerator_set() {
        let enumerator = StaticEnumerator::new(["sr1", "sr0"]);
        assert_eq!(enumerator.devices(), vec!["sr0", "sr1"]);

        enumerator.set(["sr3"]);
        assert_eq!(enumerator.devices(), vec!["sr3"]);
    }
}
