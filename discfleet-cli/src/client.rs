//! Blocking HTTP client for a running fleet service.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use discfleet::ledger::{DriveHealth, HealthTier};
use discfleet::recovery::ResetReport;
use discfleet::status::DriveStatus;
use discfleet::topology::Bus;
use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::CliError;

/// Request timeout. Resets wait out bus re-enumeration, so this is generous.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// One row of `/api/drives`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveRow {
    #[serde(flatten)]
    pub status: DriveStatus,
    pub health_tier: HealthTier,
    pub crash_count: u64,
    pub crashes_7d: u32,
    pub bus_id: Option<String>,
}

/// Body of a stats clear response.
#[derive(Debug, Clone, Deserialize)]
pub struct Cleared {
    pub device: String,
    pub cleared: bool,
}

/// Base URL for a listen address, mapping wildcard binds to loopback.
pub fn server_url_for(listen: SocketAddr) -> String {
    let ip = match listen.ip() {
        ip if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        ip => ip,
    };
    format!("http://{}", SocketAddr::new(ip, listen.port()))
}

/// Client bound to one service base URL.
pub struct FleetClient {
    base: String,
    http: Client,
}

impl FleetClient {
    pub fn new(base: impl Into<String>) -> Result<Self, CliError> {
        let base = base.into().trim_end_matches('/').to_string();
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|error| CliError::Connect {
                url: base.clone(),
                error,
            })?;
        Ok(Self { base, http })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn drives(&self) -> Result<Vec<DriveRow>, CliError> {
        self.get("/api/drives")
    }

    pub fn buses(&self) -> Result<Vec<Bus>, CliError> {
        self.get("/api/buses")
    }

    pub fn stats(&self) -> Result<Vec<DriveHealth>, CliError> {
        self.get("/api/stats")
    }

    pub fn device_stats(&self, device: &str) -> Result<DriveHealth, CliError> {
        self.get(&format!("/api/stats/{}", device))
    }

    pub fn clear_stats(&self, device: &str) -> Result<Cleared, CliError> {
        self.post(&format!("/api/stats/{}/reset", device), json!({}))
    }

    /// Request a manual bus reset.
    ///
    /// A 409 carrying `confirmation_required` becomes
    /// [`CliError::ConfirmationRequired`].
    pub fn reset_bus(&self, bus_id: &str, confirm: bool) -> Result<ResetReport, CliError> {
        self.post(
            &format!("/api/buses/{}/reset", bus_id),
            json!({ "confirm": confirm }),
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, CliError> {
        let url = self.url(path);
        let resp = self
            .http
            .get(&url)
            .send()
            .map_err(|error| CliError::Connect { url, error })?;
        decode(resp)
    }

    fn post<T: DeserializeOwned>(&self, path: &str, body: Value) -> Result<T, CliError> {
        let url = self.url(path);
        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .map_err(|error| CliError::Connect { url, error })?;
        decode(resp)
    }
}

fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, CliError> {
    let status = resp.status();
    let url = resp.url().to_string();
    if status.is_success() {
        return resp.json().map_err(|error| CliError::Connect { url, error });
    }

    let body: Value = resp.json().unwrap_or(Value::Null);
    Err(error_from_body(status.as_u16(), &body))
}

/// Map an error response body to a CLI error.
pub(crate) fn error_from_body(status: u16, body: &Value) -> CliError {
    if body["confirmation_required"].as_bool() == Some(true) {
        let bus_id = body["bus_id"].as_str().unwrap_or_default().to_string();
        let active_devices = body["active_devices"]
            .as_array()
            .map(|devices| {
                devices
                    .iter()
                    .filter_map(|d| d.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        return CliError::ConfirmationRequired {
            bus_id,
            active_devices,
        };
    }

    let message = body["error"]
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| "no error message".to_string());
    CliError::Api { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_listen_maps_to_loopback() {
        assert_eq!(
            server_url_for("0.0.0.0:8787".parse().unwrap()),
            "http://127.0.0.1:8787"
        );
        assert_eq!(
            server_url_for("192.168.1.20:9000".parse().unwrap()),
            "http://192.168.1.20:9000"
        );
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = FleetClient::new("http://127.0.0.1:8787/").unwrap();
        assert_eq!(client.base(), "http://127.0.0.1:8787");
    }

    #[test]
    fn test_confirmation_body_recognized() {
        let body = json!({
            "error": "bus pci-0000:03:00.0 has active devices",
            "bus_id": "pci-0000:03:00.0",
            "active_devices": ["sr1"],
            "confirmation_required": true,
        });
        match error_from_body(409, &body) {
            CliError::ConfirmationRequired {
                bus_id,
                active_devices,
            } => {
                assert_eq!(bus_id, "pci-0000:03:00.0");
                assert_eq!(active_devices, vec!["sr1"]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_plain_error_body() {
        let body = json!({ "error": "bus not found: usb-9" });
        match error_from_body(404, &body) {
            CliError::Api { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "bus not found: usb-9");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_drive_row_decodes_flattened_status() {
        let row: DriveRow = serde_json::from_value(json!({
            "device": "sr0",
            "state": "crashed",
            "discName": "DISC_A",
            "discType": "bluray",
            "progress": 37.5,
            "operation": "",
            "titleCurrent": 2,
            "titleTotal": 9,
            "startTime": null,
            "elapsed": 0.0,
            "heartbeat": 1700000000.0,
            "errorMessage": "drive stopped responding",
            "healthTier": "warning",
            "crashCount": 4,
            "crashes7d": 3,
            "busId": "pci-0000:03:00.0",
        }))
        .unwrap();
        assert_eq!(row.status.device, "sr0");
        assert_eq!(row.health_tier, HealthTier::Warning);
        assert_eq!(row.bus_id.as_deref(), Some("pci-0000:03:00.0"));
    }
}
