//! Bus records.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Kind of hardware reset domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusType {
    Pci,
    Sata,
    Usb,
    Unknown,
}

impl BusType {
    /// Prefix used when building bus ids.
    pub fn as_str(&self) -> &'static str {
        match self {
            BusType::Pci => "pci",
            BusType::Sata => "sata",
            BusType::Usb => "usb",
            BusType::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for BusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One resettable hardware unit and the drives behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bus {
    /// Stable id, e.g. `usb-1-2` or `pci-0000:03:00.0`.
    pub id: String,
    pub bus_type: BusType,
    /// Human readable controller description.
    pub controller: String,
    /// Member drive devices, sorted.
    pub devices: Vec<String>,
    pub reset_supported: bool,
    /// Control file written to reset the bus.
    #[serde(skip)]
    pub reset_handle: Option<PathBuf>,
}

impl Bus {
    /// True if `device` sits on this bus.
    pub fn contains(&self, device: &str) -> bool {
        self.devices.iter().any(|d| d == device)
    }

    /// Placeholder bus for a drive whose hardware path could not be classified.
    pub fn unknown(device: &str) -> Self {
        Self {
            id: format!("unknown-{}", device),
            bus_type: BusType::Unknown,
            controller: "unknown".to_string(),
            devices: vec![device.to_string()],
            reset_supported: false,
            reset_handle: None,
        }
    }
}
