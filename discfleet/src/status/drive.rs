//! Drive state as seen by the fleet manager.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriveState {
    Idle,
    Detecting,
    Ripping,
    Ejecting,
    Error,
    /// Set only by crash detection, never read from a status record.
    Crashed,
}

impl DriveState {
    /// Parse the state written by a rip worker.
    ///
    /// Unknown values, and `crashed` which workers do not own, read as idle.
    pub fn from_record(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "detecting" => DriveState::Detecting,
            "ripping" => DriveState::Ripping,
            "ejecting" => DriveState::Ejecting,
            "error" => DriveState::Error,
            _ => DriveState::Idle,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DriveState::Idle => "idle",
            DriveState::Detecting => "detecting",
            DriveState::Ripping => "ripping",
            DriveState::Ejecting => "ejecting",
            DriveState::Error => "error",
            DriveState::Crashed => "crashed",
        }
    }
}

impl std::fmt::Display for DriveState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current status of one drive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveStatus {
    pub device: String,
    pub state: DriveState,
    pub disc_name: String,
    pub disc_type: String,
    /// Percent complete, 0 to 100.
    pub progress: f64,
    pub operation: String,
    pub title_current: u32,
    pub title_total: u32,
    pub start_time: Option<f64>,
    /// Seconds since the rip started.
    pub elapsed: f64,
    /// Epoch seconds of the worker's last write.
    pub heartbeat: f64,
    /// Present only in `error` and `crashed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl DriveStatus {
    /// Status of a drive with no record.
    pub fn idle(device: &str) -> Self {
        Self {
            device: device.to_string(),
            state: DriveState::Idle,
            disc_name: String::new(),
            disc_type: String::new(),
            progress: 0.0,
            operation: String::new(),
            title_current: 0,
            title_total: 0,
            start_time: None,
            elapsed: 0.0,
            heartbeat: 0.0,
            error_message: None,
        }
    }

    /// Seconds since the last heartbeat at time `now`.
    pub fn heartbeat_age(&self, now: f64) -> f64 {
        now - self.heartbeat
    }

    pub fn is_ripping(&self) -> bool {
        self.state == DriveState::Ripping
    }

    pub fn is_crashed(&self) -> bool {
        self.state == DriveState::Crashed
    }
}

/// Confirmed crash of a drive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrashEvent {
    pub device: String,
    /// Epoch seconds at confirmation.
    pub timestamp: f64,
    /// Heartbeat age in seconds when the crash was confirmed.
    pub heartbeat_age: f64,
}
