//! Hardware path classification.
//!
//! A drive's sysfs entry (`<sysfs>/block/<device>`) is a symlink into the
//! `devices` tree. Walking that path upward, the nearest ancestor exposing a
//! reset primitive is the unit that gets reset when the drive wedges:
//!
//! ```text
//! /sys/devices/pci0000:00/0000:00:17.0/ata2/host1/target1:0:0/1:0:0:0/block/sr0
//!                         ^^^^^^^^^^^^ ^^^^
//!                         PCI function libata port => sata-0000:00:17.0
//!
//! /sys/devices/pci0000:00/0000:00:14.0/usb1/1-2/1-2:1.0/host6/.../block/sr1
//!                                           ^^^
//!                                           USB device => usb-1-2
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tracing::trace;

use super::types::BusType;

/// Result of classifying one drive's hardware path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub kind: BusType,
    /// Sysfs node owning the reset primitive.
    pub node: PathBuf,
    /// Control file written to reset the node.
    pub reset_handle: PathBuf,
}

impl Classification {
    /// Bus id derived from the node name.
    pub fn bus_id(&self) -> String {
        format!("{}-{}", self.kind, node_name(&self.node))
    }

    /// Controller description read from sysfs attributes.
    pub fn controller(&self) -> String {
        match self.kind {
            BusType::Usb => {
                let parts: Vec<String> = ["manufacturer", "product"]
                    .iter()
                    .filter_map(|attr| read_attr(&self.node, attr))
                    .collect();
                if parts.is_empty() {
                    format!("USB device {}", node_name(&self.node))
                } else {
                    parts.join(" ")
                }
            }
            BusType::Pci | BusType::Sata => {
                let label = if self.kind == BusType::Sata {
                    "SATA controller"
                } else {
                    "PCI device"
                };
                match (
                    read_attr(&self.node, "vendor"),
                    read_attr(&self.node, "device"),
                ) {
                    (Some(vendor), Some(device)) => format!(
                        "{} {}:{}",
                        label,
                        vendor.trim_start_matches("0x"),
                        device.trim_start_matches("0x")
                    ),
                    _ => format!("{} {}", label, node_name(&self.node)),
                }
            }
            BusType::Unknown => "unknown".to_string(),
        }
    }
}

fn pci_address_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // domain:bus:device.function, e.g. 0000:03:00.0
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^[0-9a-f]{4}:[0-9a-f]{2}:[0-9a-f]{2}\.[0-7]$").unwrap()
    })
}

fn ata_port_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^ata\d+$").unwrap())
}

/// Classify the bus of `device` under `sysfs_root`.
///
/// Returns `None` when the device has no sysfs entry or no ancestor exposes a
/// reset primitive.
pub fn classify(sysfs_root: &Path, device: &str) -> Option<Classification> {
    let entry = sysfs_root.join("block").join(device);
    let resolved = fs::canonicalize(&entry).ok()?;
    let devices_root = fs::canonicalize(sysfs_root.join("devices"))
        .unwrap_or_else(|_| sysfs_root.join("devices"));

    let mut passed_ata = false;
    let mut current = resolved.parent();

    while let Some(node) = current {
        if node == devices_root || !node.starts_with(&devices_root) {
            break;
        }
        let name = node_name(node);

        if ata_port_pattern().is_match(&name) {
            passed_ata = true;
        }

        if is_usb_device(node) {
            trace!(device, node = %node.display(), "Classified as USB");
            return Some(Classification {
                kind: BusType::Usb,
                node: node.to_path_buf(),
                reset_handle: node.join("authorized"),
            });
        }

        if pci_address_pattern().is_match(&name) && node.join("reset").is_file() {
            let kind = if passed_ata {
                BusType::Sata
            } else {
                BusType::Pci
            };
            trace!(device, node = %node.display(), %kind, "Classified as PCI function");
            return Some(Classification {
                kind,
                node: node.to_path_buf(),
                reset_handle: node.join("reset"),
            });
        }

        current = node.parent();
    }

    trace!(device, path = %resolved.display(), "No reset primitive found");
    None
}

/// USB device nodes carry both `authorized` and `devnum`; interfaces only
/// carry `authorized`.
fn is_usb_device(node: &Path) -> bool {
    node.join("authorized").is_file() && node.join("devnum").is_file()
}

fn node_name(node: &Path) -> String {
    node.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn read_attr(node: &Path, attr: &str) -> Option<String> {
    fs::read_to_string(node.join(attr))
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Synthetic sysfs trees for tests.

    use std::fs;
    use std::path::Path;

    /// Create `<root>/devices/<rel>/block/<device>` and the `<root>/block/<device>` link.
    pub fn add_drive(root: &Path, rel: &str, device: &str) {
        let target = root.join("devices").join(rel).join("block").join(device);
        fs::create_dir_all(&target).unwrap();
        fs::create_dir_all(root.join("block")).unwrap();
        std::os::unix::fs::symlink(&target, root.join("block").join(device)).unwrap();
    }

    /// Create a control file under `<root>/devices/<rel>`.
    pub fn add_file(root: &Path, rel: &str, name: &str, contents: &str) {
        let dir = root.join("devices").join(rel);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(name), contents).unwrap();
    }

    pub const SATA_PORT: &str = "pci0000:00/0000:00:17.0";
    pub const USB_DEVICE: &str = "pci0000:00/0000:00:14.0/usb1/1-2";
    pub const PCI_CARD: &str = "pci0000:00/0000:00:1c.0/0000:03:00.0";

    /// A SATA drive `device` on the onboard AHCI controller.
    pub fn sata_drive(root: &Path, device: &str, port: u32) {
        add_file(root, SATA_PORT, "reset", "");
        add_file(root, SATA_PORT, "vendor", "0x8086\n");
        add_file(root, SATA_PORT, "device", "0xa352\n");
        add_drive(
            root,
            &format!(
                "{}/ata{}/host{}/target{}:0:0/{}:0:0:0",
                SATA_PORT, port, port, port, port
            ),
            device,
        );
    }

    /// A USB drive `device` behind USB device node `1-2`.
    pub fn usb_drive(root: &Path, device: &str) {
        add_file(root, USB_DEVICE, "authorized", "1\n");
        add_file(root, USB_DEVICE, "devnum", "3\n");
        add_file(root, USB_DEVICE, "manufacturer", "ASUS\n");
        add_file(root, USB_DEVICE, "product", "BW-16D1H-U\n");
        // Interface node has `authorized` but is not a device
        add_file(root, &format!("{}/1-2:1.0", USB_DEVICE), "authorized", "1\n");
        add_drive(
            root,
            &format!("{}/1-2:1.0/host6/target6:0:0/6:0:0:0", USB_DEVICE),
            device,
        );
    }

    /// A drive `device` behind a non-libata PCI add-in card at 0000:03:00.0.
    pub fn pci_drive(root: &Path, device: &str, target: u32) {
        add_file(root, PCI_CARD, "reset", "");
        add_drive(
            root,
            &format!(
                "{}/host9/target9:0:{}/9:0:{}:0",
                PCI_CARD, target, target
            ),
            device,
        );
    }
}
