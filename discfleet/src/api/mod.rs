//! HTTP query and command surface.
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `GET /healthz` | liveness |
//! | `GET /api/drives` | drive states with health tier |
//! | `GET /api/history` | rip history, newest first |
//! | `GET /api/drives/:device/logs` | tail of a drive's rip log |
//! | `GET /api/buses` | discovered buses |
//! | `POST /api/buses/:bus_id/reset` | manual reset, `{"confirm": bool}` |
//! | `GET /api/stats` | health of every drive with history |
//! | `GET /api/stats/:device` | health of one drive |
//! | `POST /api/stats/:device/reset` | clear a drive's history |
//! | `GET /api/events` | Server-Sent Events feed |

mod error;
mod handlers;
mod sse;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::events::EventBus;
use crate::ledger::DriveStatsLedger;
use crate::recovery::RecoveryOrchestrator;
use crate::status::StatusAggregator;
use crate::time::SharedClock;
use crate::topology::BusTopology;

pub use error::ApiError;
pub use handlers::DriveView;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct ApiState {
    pub aggregator: Arc<StatusAggregator>,
    pub topology: Arc<BusTopology>,
    pub ledger: Arc<DriveStatsLedger>,
    pub orchestrator: Arc<RecoveryOrchestrator>,
    pub events: EventBus,
    pub clock: SharedClock,
    pub history_path: PathBuf,
    pub log_dir: PathBuf,
    /// Cancelled when the service stops; ends open event streams.
    pub shutdown: CancellationToken,
}

/// Build the router.
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/api/drives", get(handlers::drives))
        .route("/api/drives/:device/logs", get(handlers::drive_logs))
        .route("/api/history", get(handlers::history))
        .route("/api/buses", get(handlers::buses))
        .route("/api/buses/:bus_id/reset", post(handlers::reset_bus))
        .route("/api/stats", get(handlers::stats))
        .route("/api/stats/:device", get(handlers::device_stats))
        .route("/api/stats/:device/reset", post(handlers::reset_device_stats))
        .route("/api/events", get(sse::events))
        .with_state(state)
}

/// Serve `router` on an already bound listener until `shutdown` fires.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let addr: Option<SocketAddr> = listener.local_addr().ok();
    info!(addr = ?addr, "HTTP surface listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}
