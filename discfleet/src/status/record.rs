//! Status records written by rip workers.
//!
//! Each worker rewrites `<status_dir>/<device>.json` as it progresses. Every
//! field is optional; a missing or unparsable record reads as idle.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use super::drive::{DriveState, DriveStatus};

/// On-disk status record, camelCase keys.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatusRecord {
    pub device: Option<String>,
    pub state: Option<String>,
    pub disc_name: Option<String>,
    pub disc_type: Option<String>,
    pub progress: Option<f64>,
    pub operation: Option<String>,
    pub title_current: Option<u32>,
    pub title_total: Option<u32>,
    pub error_message: Option<String>,
    pub start_time: Option<f64>,
    pub elapsed: Option<f64>,
    pub heartbeat: Option<f64>,
}

impl StatusRecord {
    /// Convert to drive status for `device`.
    ///
    /// The record's own `device` field is ignored; the file name is
    /// authoritative.
    pub fn into_status(self, device: &str) -> DriveStatus {
        let state = self
            .state
            .as_deref()
            .map(DriveState::from_record)
            .unwrap_or(DriveState::Idle);

        DriveStatus {
            device: device.to_string(),
            state,
            disc_name: self.disc_name.unwrap_or_default(),
            disc_type: self.disc_type.unwrap_or_default(),
            progress: self
                .progress
                .filter(|p| p.is_finite())
                .map_or(0.0, |p| p.clamp(0.0, 100.0)),
            operation: self.operation.unwrap_or_default(),
            title_current: self.title_current.unwrap_or(0),
            title_total: self.title_total.unwrap_or(0),
            start_time: self.start_time,
            elapsed: self.elapsed.unwrap_or(0.0),
            heartbeat: self.heartbeat.unwrap_or(0.0),
            error_message: if state == DriveState::Error {
                self.error_message.filter(|m| !m.is_empty())
            } else {
                None
            },
        }
    }
}

/// Path of a device's status record.
pub fn status_path(status_dir: &Path, device: &str) -> std::path::PathBuf {
    status_dir.join(format!("{}.json", device))
}

/// Read a device's status, synthesizing idle when the record is missing or bad.
pub fn read_status(status_dir: &Path, device: &str) -> DriveStatus {
    let path = status_path(status_dir, device);
    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(_) => return DriveStatus::idle(device),
    };

    match serde_json::from_slice::<StatusRecord>(&bytes) {
        Ok(record) => record.into_status(device),
        Err(e) => {
            // Workers rewrite in place, so a torn read is expected now and then
            debug!(device, path = %path.display(), error = %e, "Unreadable status record, treating as idle");
            DriveStatus::idle(device)
        }
    }
}
