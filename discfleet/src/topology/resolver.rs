//! Bus topology resolver.
//!
//! Groups drives by the hardware unit that would be reset to recover them and
//! executes those resets. Discovery is cached for a short TTL because the
//! recovery path and the query surface both ask for it repeatedly; every reset
//! evicts the cache since devices re-enumerate afterwards.
//!
//! No safety checking happens here. Callers decide whether a reset is allowed.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::classify::classify;
use super::error::TopologyError;
use super::types::{Bus, BusType};
use crate::config::{DEFAULT_BUS_CACHE_TTL_SECS, DEFAULT_REENUMERATE_MS, DEFAULT_USB_SETTLE_MS};
use crate::devices::{sort_devices, DeviceEnumerator};

/// Timing knobs for discovery and resets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TopologyTimings {
    /// How long a discovery result is reused.
    pub cache_ttl: Duration,
    /// How long a USB port stays deauthorized.
    pub usb_settle: Duration,
    /// Wait after a reset for devices to come back.
    pub reenumerate: Duration,
}

impl Default for TopologyTimings {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(DEFAULT_BUS_CACHE_TTL_SECS),
            usb_settle: Duration::from_millis(DEFAULT_USB_SETTLE_MS),
            reenumerate: Duration::from_millis(DEFAULT_REENUMERATE_MS),
        }
    }
}

impl TopologyTimings {
    /// No delays and no caching, for tests.
    pub fn immediate() -> Self {
        Self {
            cache_ttl: Duration::ZERO,
            usb_settle: Duration::ZERO,
            reenumerate: Duration::ZERO,
        }
    }
}

struct CachedTopology {
    buses: Vec<Bus>,
    discovered_at: Instant,
}

/// Discovers buses and executes bus resets.
pub struct BusTopology {
    sysfs_root: PathBuf,
    enumerator: Arc<dyn DeviceEnumerator>,
    timings: TopologyTimings,
    cache: Mutex<Option<CachedTopology>>,
    resetting: Mutex<HashSet<String>>,
}

impl BusTopology {
    pub fn new(
        sysfs_root: impl Into<PathBuf>,
        enumerator: Arc<dyn DeviceEnumerator>,
        timings: TopologyTimings,
    ) -> Self {
        Self {
            sysfs_root: sysfs_root.into(),
            enumerator,
            timings,
            cache: Mutex::new(None),
            resetting: Mutex::new(HashSet::new()),
        }
    }

    /// Root of the sysfs tree used for discovery.
    pub fn sysfs_root(&self) -> &Path {
        &self.sysfs_root
    }

    /// Current buses, sorted by id. Served from cache while fresh.
    pub fn discover(&self) -> Vec<Bus> {
        {
            let cache = self.cache.lock();
            if let Some(cached) = cache.as_ref() {
                if cached.discovered_at.elapsed() < self.timings.cache_ttl {
                    return cached.buses.clone();
                }
            }
        }

        let buses = self.scan();
        *self.cache.lock() = Some(CachedTopology {
            buses: buses.clone(),
            discovered_at: Instant::now(),
        });
        buses
    }

    fn scan(&self) -> Vec<Bus> {
        let mut buses: BTreeMap<String, Bus> = BTreeMap::new();

        for device in self.enumerator.devices() {
            match classify(&self.sysfs_root, &device) {
                Some(c) => {
                    let id = c.bus_id();
                    buses
                        .entry(id.clone())
                        .or_insert_with(|| Bus {
                            id,
                            bus_type: c.kind,
                            controller: c.controller(),
                            devices: Vec::new(),
                            reset_supported: true,
                            reset_handle: Some(c.reset_handle.clone()),
                        })
                        .devices
                        .push(device);
                }
                None => {
                    debug!(device = %device, "Drive bus not classified");
                    let bus = Bus::unknown(&device);
                    buses.insert(bus.id.clone(), bus);
                }
            }
        }

        let buses: Vec<Bus> = buses
            .into_values()
            .map(|mut bus| {
                sort_devices(&mut bus.devices);
                bus
            })
            .collect();
        debug!(count = buses.len(), "Bus topology discovered");
        buses
    }

    /// Drop the cached discovery result.
    pub fn invalidate(&self) {
        *self.cache.lock() = None;
    }

    /// Bus with the given id. Rescans once on a miss in case the cache is stale.
    pub fn get(&self, bus_id: &str) -> Option<Bus> {
        self.lookup(|bus| bus.id == bus_id)
    }

    /// Bus containing `device`. Rescans once on a miss.
    pub fn find_bus_for(&self, device: &str) -> Option<Bus> {
        self.lookup(|bus| bus.contains(device))
    }

    fn lookup(&self, pred: impl Fn(&Bus) -> bool) -> Option<Bus> {
        if let Some(bus) = self.discover().into_iter().find(|b| pred(b)) {
            return Some(bus);
        }
        self.invalidate();
        self.discover().into_iter().find(|b| pred(b))
    }

    /// True while a reset of `bus_id` is executing.
    pub fn is_resetting(&self, bus_id: &str) -> bool {
        self.resetting.lock().contains(bus_id)
    }

    /// Reset a bus and wait for its devices to re-enumerate.
    ///
    /// Returns the bus as it was before the reset.
    pub async fn reset(&self, bus_id: &str) -> Result<Bus, TopologyError> {
        let bus = self
            .get(bus_id)
            .ok_or_else(|| TopologyError::NotFound(bus_id.to_string()))?;

        let handle = match (&bus.reset_handle, bus.reset_supported) {
            (Some(handle), true) => handle.clone(),
            _ => return Err(TopologyError::Unsupported(bus_id.to_string())),
        };

        let _guard = ResetGuard::acquire(&self.resetting, bus_id)?;

        info!(
            bus_id,
            bus_type = %bus.bus_type,
            handle = %handle.display(),
            devices = ?bus.devices,
            "Resetting bus"
        );

        let result = self.execute(&bus, &handle).await;
        self.invalidate();

        match &result {
            Ok(()) => info!(bus_id, "Bus reset complete"),
            Err(e) => warn!(bus_id, error = %e, "Bus reset failed"),
        }
        result.map(|()| bus)
    }

    async fn execute(&self, bus: &Bus, handle: &Path) -> Result<(), TopologyError> {
        match bus.bus_type {
            BusType::Usb => {
                write_control(&bus.id, handle, "0").await?;
                tokio::time::sleep(self.timings.usb_settle).await;
                write_control(&bus.id, handle, "1").await?;
            }
            BusType::Pci | BusType::Sata => {
                write_control(&bus.id, handle, "1").await?;
            }
            BusType::Unknown => return Err(TopologyError::Unsupported(bus.id.clone())),
        }
        tokio::time::sleep(self.timings.reenumerate).await;
        Ok(())
    }
}

async fn write_control(bus_id: &str, handle: &Path, value: &str) -> Result<(), TopologyError> {
    tokio::fs::write(handle, value)
        .await
        .map_err(|source| TopologyError::ResetFailed {
            bus_id: bus_id.to_string(),
            handle: handle.to_path_buf(),
            source,
        })
}

/// Marks a bus as mid-reset until dropped.
struct ResetGuard<'a> {
    resetting: &'a Mutex<HashSet<String>>,
    bus_id: String,
}

impl<'a> ResetGuard<'a> {
    fn acquire(resetting: &'a Mutex<HashSet<String>>, bus_id: &str) -> Result<Self, TopologyError> {
        if !resetting.lock().insert(bus_id.to_string()) {
            return Err(TopologyError::ResetInProgress(bus_id.to_string()));
        }
        Ok(Self {
            resetting,
            bus_id: bus_id.to_string(),
        })
    }
}

impl Drop for ResetGuard<'_> {
    fn drop(&mut self) {
        self.resetting.lock().remove(&self.bus_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::StaticEnumerator;
    use crate::topology::classify::fixtures::*;
    use std::fs;
    use tempfile::TempDir;

    fn topology(root: &Path, devices: &[&str], timings: TopologyTimings) -> BusTopology {
        BusTopology::new(
            root,
            Arc::new(StaticEnumerator::new(devices.iter().copied())),
            timings,
        )
    }

    fn mixed_fleet(root: &Path) {
        sata_drive(root, "sr0", 1);
        sata_drive(root, "sr1", 2);
        usb_drive(root, "sr2");
        add_drive(root, "platform/virtual/host0/0:0:0:0", "sr3");
    }

    #[test]
    fn test_discover_groups_drives() {
        let dir = TempDir::new().unwrap();
        mixed_fleet(dir.path());
        let topology = topology(
            dir.path(),
            &["sr0", "sr1", "sr2", "sr3"],
            TopologyTimings::immediate(),
        );

        let buses = topology.discover();
        let ids: Vec<_> = buses.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["sata-0000:00:17.0", "unknown-sr3", "usb-1-2"]);

        assert_eq!(buses[0].devices, vec!["sr0", "sr1"]);
        assert_eq!(buses[0].bus_type, BusType::Sata);
        assert!(buses[0].reset_supported);
        assert!(!buses[1].reset_supported);
        assert_eq!(buses[2].devices, vec!["sr2"]);
    }

    #[test]
    fn test_every_drive_on_exactly_one_bus() {
        let dir = TempDir::new().unwrap();
        mixed_fleet(dir.path());
        let devices = ["sr0", "sr1", "sr2", "sr3"];
        let topology = topology(dir.path(), &devices, TopologyTimings::immediate());
        let buses = topology.discover();

        for device in devices {
            let count = buses.iter().filter(|b| b.contains(device)).count();
            assert_eq!(count, 1, "{} on {} buses", device, count);
        }
    }

    #[test]
    fn test_cache_reused_until_invalidated() {
        let dir = TempDir::new().unwrap();
        sata_drive(dir.path(), "sr0", 1);
        let enumerator = Arc::new(StaticEnumerator::new(["sr0"]));
        let topology = BusTopology::new(
            dir.path(),
            enumerator.clone(),
            TopologyTimings {
                cache_ttl: Duration::from_secs(60),
                ..TopologyTimings::immediate()
            },
        );
        assert_eq!(topology.discover().len(), 1);

        usb_drive(dir.path(), "sr1");
        enumerator.set(["sr0", "sr1"]);
        assert_eq!(topology.discover().len(), 1);

        topology.invalidate();
        assert_eq!(topology.discover().len(), 2);
    }

    #[test]
    fn test_find_bus_for_rescans_on_miss() {
        let dir = TempDir::new().unwrap();
        sata_drive(dir.path(), "sr0", 1);
        let enumerator = Arc::new(StaticEnumerator::new(["sr0"]));
        let topology = BusTopology::new(
            dir.path(),
            enumerator.clone(),
            TopologyTimings {
                cache_ttl: Duration::from_secs(60),
                ..TopologyTimings::immediate()
            },
        );
        topology.discover();

        usb_drive(dir.path(), "sr1");
        enumerator.set(["sr0", "sr1"]);
        assert_eq!(topology.find_bus_for("sr1").unwrap().id, "usb-1-2");
        assert!(topology.find_bus_for("sr7").is_none());
    }

    #[tokio::test]
    async fn test_reset_pci_writes_one() {
        let dir = TempDir::new().unwrap();
        sata_drive(dir.path(), "sr0", 1);
        let topology = topology(dir.path(), &["sr0"], TopologyTimings::immediate());

        let bus = topology.reset("sata-0000:00:17.0").await.unwrap();
        assert_eq!(bus.devices, vec!["sr0"]);

        let handle = dir.path().join("devices").join(SATA_PORT).join("reset");
        assert_eq!(fs::read_to_string(handle).unwrap(), "1");
        assert!(!topology.is_resetting("sata-0000:00:17.0"));
    }

    #[tokio::test]
    async fn test_reset_usb_reauthorizes() {
        let dir = TempDir::new().unwrap();
        usb_drive(dir.path(), "sr2");
        let topology = topology(dir.path(), &["sr2"], TopologyTimings::immediate());

        topology.reset("usb-1-2").await.unwrap();

        let handle = dir.path().join("devices").join(USB_DEVICE).join("authorized");
        assert_eq!(fs::read_to_string(handle).unwrap(), "1");
    }

    #[tokio::test]
    async fn test_reset_errors() {
        let dir = TempDir::new().unwrap();
        mixed_fleet(dir.path());
        let topology = topology(dir.path(), &["sr0", "sr3"], TopologyTimings::immediate());

        assert!(matches!(
            topology.reset("pci-9999:00:00.0").await,
            Err(TopologyError::NotFound(_))
        ));
        assert!(matches!(
            topology.reset("unknown-sr3").await,
            Err(TopologyError::Unsupported(_))
        ));
    }

    #[tokio::test]
    async fn test_reset_write_failure() {
        let dir = TempDir::new().unwrap();
        sata_drive(dir.path(), "sr0", 1);
        let topology = topology(
            dir.path(),
            &["sr0"],
            TopologyTimings {
                cache_ttl: Duration::from_secs(60),
                ..TopologyTimings::immediate()
            },
        );
        topology.discover();

        // Replace the control file with a directory so the write fails
        let handle = dir.path().join("devices").join(SATA_PORT).join("reset");
        fs::remove_file(&handle).unwrap();
        fs::create_dir(&handle).unwrap();

        match topology.reset("sata-0000:00:17.0").await {
            Err(TopologyError::ResetFailed { bus_id, handle: h, .. }) => {
                assert_eq!(bus_id, "sata-0000:00:17.0");
                assert_eq!(h, handle.canonicalize().unwrap());
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(!topology.is_resetting("sata-0000:00:17.0"));
    }

    #[tokio::test]
    async fn test_concurrent_reset_rejected() {
        let dir = TempDir::new().unwrap();
        usb_drive(dir.path(), "sr2");
        let topology = Arc::new(topology(
            dir.path(),
            &["sr2"],
            TopologyTimings {
                cache_ttl: Duration::from_secs(60),
                usb_settle: Duration::from_millis(200),
                reenumerate: Duration::ZERO,
            },
        ));

        let first = {
            let topology = Arc::clone(&topology);
            tokio::spawn(async move { topology.reset("usb-1-2").await })
        };
        for _ in 0..100 {
            if topology.is_resetting("usb-1-2") {
                break;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        assert!(matches!(
            topology.reset("usb-1-2").await,
            Err(TopologyError::ResetInProgress(_))
        ));
        assert!(first.await.unwrap().is_ok());
    }
}
