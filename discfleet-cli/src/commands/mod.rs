//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! # Command Modules
//!
//! - [`config`] - Configuration management (path, show, init)
//! - [`drives`] - Drive and bus tables from a running service
//! - [`reset`] - Manual bus reset
//! - [`run`] - Main command (host the fleet manager)
//! - [`stats`] - Drive health history

pub mod config;
pub mod drives;
pub mod reset;
pub mod run;
pub mod stats;
