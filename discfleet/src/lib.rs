//! discfleet - fleet health and recovery for unattended optical disc rippers
//!
//! A rip host runs several optical drives at once. Drives occasionally wedge
//! in firmware mid-rip; the rip process then hangs silently. This library
//! detects those crashes from per-drive heartbeat records, works out which
//! hardware bus each drive sits on, and recovers crashed drives with a bus
//! reset, without ever resetting a bus under a drive that is still ripping.
//!
//! # High-Level API
//!
//! ```ignore
//! use discfleet::config::ConfigFile;
//! use discfleet::service::FleetService;
//!
//! let service = FleetService::start(ConfigFile::load()?).await?;
//! println!("listening on {}", service.local_addr());
//! ```

pub mod api;
pub mod config;
pub mod devices;
pub mod events;
pub mod history;
pub mod ledger;
pub mod logging;
pub mod logs;
pub mod recovery;
pub mod service;
pub mod status;
pub mod time;
pub mod topology;

/// Version of the discfleet library and CLI.
///
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
