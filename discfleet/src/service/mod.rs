//! Fleet manager service.
//!
//! Wires the status aggregator, topology resolver, ledger and orchestrator
//! together and runs them until shutdown.
//!
//! # Example
//!
//! ```ignore
//! use discfleet::config::ConfigFile;
//! use discfleet::service::FleetService;
//!
//! let service = FleetService::start(ConfigFile::load()?).await?;
//! tokio::signal::ctrl_c().await?;
//! service.shutdown().await?;
//! ```

mod daemons;
mod error;
mod fleet;

pub use daemons::{CrashMonitorDaemon, StatusRefreshDaemon};
pub use error::ServiceError;
pub use fleet::{FleetComponents, FleetService};
