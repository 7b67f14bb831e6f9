//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use discfleet::config::ConfigFile;
use discfleet::devices::StaticEnumerator;
use discfleet::service::FleetComponents;
use discfleet::status::DeviceProbe;
use discfleet::time::ManualClock;
use futures::future::BoxFuture;
use tempfile::TempDir;

pub const T: f64 = 1_700_000_000.0;

/// PCI add-in card hosting sr0 and sr1.
pub const PCI_CARD: &str = "pci0000:00/0000:00:1c.0/0000:03:00.0";
pub const PCI_BUS: &str = "pci-0000:03:00.0";

/// USB enclosure hosting sr2.
pub const USB_DEVICE: &str = "pci0000:00/0000:00:14.0/usb1/1-2";
pub const USB_BUS: &str = "usb-1-2";

/// Probe that never answers, like a wedged drive.
pub struct HangingProbe;

impl DeviceProbe for HangingProbe {
    fn probe<'a>(&'a self, _device: &'a str) -> BoxFuture<'a, io::Result<()>> {
        Box::pin(futures::future::pending())
    }
}

/// Temp directories, config and components for one test.
pub struct Fleet {
    pub dir: TempDir,
    pub config: ConfigFile,
    pub clock: Arc<ManualClock>,
    pub enumerator: Arc<StaticEnumerator>,
    pub components: FleetComponents,
}

impl Fleet {
    /// sr0 and sr1 on the PCI card, sr2 on USB.
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    pub fn with_config(customize: impl FnOnce(&mut ConfigFile)) -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let sysfs = root.join("sys");

        add_file(&sysfs, PCI_CARD, "reset", "");
        add_file(&sysfs, PCI_CARD, "vendor", "0x1b4b\n");
        add_file(&sysfs, PCI_CARD, "device", "0x9215\n");
        add_drive(&sysfs, &format!("{}/host7/target7:0:0/7:0:0:0", PCI_CARD), "sr0");
        add_drive(&sysfs, &format!("{}/host7/target7:0:1/7:0:1:0", PCI_CARD), "sr1");

        add_file(&sysfs, USB_DEVICE, "authorized", "1");
        add_file(&sysfs, USB_DEVICE, "devnum", "4");
        add_drive(
            &sysfs,
            &format!("{}/1-2:1.0/host8/target8:0:0/8:0:0:0", USB_DEVICE),
            "sr2",
        );

        let mut config = ConfigFile::default();
        config.paths.status_dir = root.join("status");
        config.paths.history_path = root.join("history.jsonl");
        config.paths.stats_path = root.join("drive_stats.json");
        config.paths.log_dir = root.join("logs");
        config.logging.file = root.join("discfleet.log");
        config.monitor.sysfs_root = sysfs;
        config.monitor.probe_timeout_secs = 1;
        config.monitor.watch_enabled = false;
        config.topology.cache_ttl_secs = 0;
        config.topology.usb_settle_ms = 0;
        config.topology.reenumerate_ms = 0;
        config.server.listen = "127.0.0.1:0".parse().unwrap();
        customize(&mut config);

        fs::create_dir_all(&config.paths.status_dir).unwrap();

        let clock = Arc::new(ManualClock::new(T));
        let enumerator = Arc::new(StaticEnumerator::new(["sr0", "sr1", "sr2"]));
        let components = FleetComponents::build(
            &config,
            enumerator.clone(),
            Arc::new(HangingProbe),
            clock.clone(),
        );

        Self {
            dir,
            config,
            clock,
            enumerator,
            components,
        }
    }

    pub fn sysfs(&self) -> &Path {
        &self.config.monitor.sysfs_root
    }

    /// Contents of the PCI card's reset control file.
    pub fn pci_reset_contents(&self) -> String {
        fs::read_to_string(self.sysfs().join("devices").join(PCI_CARD).join("reset")).unwrap()
    }

    pub fn write_status(&self, device: &str, state: &str, heartbeat: f64) {
        fs::write(
            self.config.paths.status_dir.join(format!("{}.json", device)),
            format!(
                r#"{{"device":"{}","state":"{}","discName":"DISC_{}","progress":37.5,"heartbeat":{}}}"#,
                device, state, device, heartbeat
            ),
        )
        .unwrap();
    }

    /// Put `device` into the crashed state: stale ripping record, hung probe.
    pub async fn crash(&self, device: &str) -> Vec<discfleet::status::CrashEvent> {
        self.write_status(device, "ripping", T);
        self.clock.set(T + 301.0);
        self.components.aggregator.refresh();
        self.components.aggregator.check_crashes().await
    }
}

pub fn add_drive(sysfs: &Path, rel: &str, device: &str) {
    let target = sysfs.join("devices").join(rel).join("block").join(device);
    fs::create_dir_all(&target).unwrap();
    fs::create_dir_all(sysfs.join("block")).unwrap();
    std::os::unix::fs::symlink(&target, sysfs.join("block").join(device)).unwrap();
}

pub fn add_file(sysfs: &Path, rel: &str, name: &str, contents: &str) {
    let dir: PathBuf = sysfs.join("devices").join(rel);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(name), contents).unwrap();
}
