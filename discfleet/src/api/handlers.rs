//! Route handlers.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::error::ApiError;
use super::ApiState;
use crate::history::{read_history, HistoryPage, DEFAULT_PER_PAGE};
use crate::ledger::{DriveHealth, HealthTier};
use crate::logs::{is_valid_device_name, tail_log, DEFAULT_LOG_LINES};
use crate::recovery::ResetReport;
use crate::status::DriveStatus;
use crate::topology::Bus;

/// Drive status enriched with health and bus membership.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveView {
    #[serde(flatten)]
    pub status: DriveStatus,
    pub health_tier: HealthTier,
    pub crash_count: u64,
    pub crashes_7d: u32,
    pub bus_id: Option<String>,
}

pub(super) async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok", "version": crate::VERSION }))
}

pub(super) async fn drives(State(state): State<ApiState>) -> Json<Vec<DriveView>> {
    let bus_of: HashMap<String, String> = state
        .topology
        .discover()
        .into_iter()
        .flat_map(|bus| {
            let id = bus.id;
            bus.devices.into_iter().map(move |d| (d, id.clone()))
        })
        .collect();

    let views = state
        .aggregator
        .snapshot()
        .into_iter()
        .map(|status| {
            let health = state.ledger.get_or_pristine(&status.device);
            DriveView {
                bus_id: bus_of.get(&status.device).cloned(),
                health_tier: health.tier,
                crash_count: health.crash_count,
                crashes_7d: health.crashes_7d,
                status,
            }
        })
        .collect();
    Json(views)
}

#[derive(Debug, Deserialize)]
pub(super) struct HistoryQuery {
    page: Option<usize>,
    per_page: Option<usize>,
}

pub(super) async fn history(
    State(state): State<ApiState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryPage>, ApiError> {
    let page = read_history(
        &state.history_path,
        query.page.unwrap_or(1),
        query.per_page.unwrap_or(DEFAULT_PER_PAGE),
    )
    .map_err(|e| ApiError::Internal(format!("Failed to read rip history: {}", e)))?;
    Ok(Json(page))
}

#[derive(Debug, Deserialize)]
pub(super) struct LogQuery {
    lines: Option<usize>,
}

pub(super) async fn drive_logs(
    State(state): State<ApiState>,
    Path(device): Path<String>,
    Query(query): Query<LogQuery>,
) -> Result<Json<Value>, ApiError> {
    if !is_valid_device_name(&device) {
        return Err(ApiError::BadRequest(format!("Invalid device: {}", device)));
    }
    let lines = tail_log(
        &state.log_dir,
        &device,
        query.lines.unwrap_or(DEFAULT_LOG_LINES),
    )
    .map_err(|e| ApiError::Internal(format!("Failed to read log for {}: {}", device, e)))?;
    Ok(Json(json!({ "device": device, "lines": lines })))
}

pub(super) async fn buses(State(state): State<ApiState>) -> Json<Vec<Bus>> {
    Json(state.topology.discover())
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct ResetRequest {
    #[serde(default)]
    confirm: bool,
}

pub(super) async fn reset_bus(
    State(state): State<ApiState>,
    Path(bus_id): Path<String>,
    body: Option<Json<ResetRequest>>,
) -> Result<Json<ResetReport>, ApiError> {
    let confirm = body.map(|Json(r)| r.confirm).unwrap_or(false);
    info!(bus_id = %bus_id, confirm, "Manual bus reset requested");
    let report = state.orchestrator.manual_reset(&bus_id, confirm).await?;
    Ok(Json(report))
}

pub(super) async fn stats(State(state): State<ApiState>) -> Json<Vec<DriveHealth>> {
    Json(state.ledger.get_all())
}

pub(super) async fn device_stats(
    State(state): State<ApiState>,
    Path(device): Path<String>,
) -> Json<DriveHealth> {
    Json(state.ledger.get_or_pristine(&device))
}

pub(super) async fn reset_device_stats(
    State(state): State<ApiState>,
    Path(device): Path<String>,
) -> Json<Value> {
    let cleared = state.ledger.reset_device(&device);
    Json(json!({ "device": device, "cleared": cleared }))
}
