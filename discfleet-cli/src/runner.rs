//! CLI runner for common setup.
//!
//! Encapsulates configuration loading, logging initialization and server
//! address resolution shared across command handlers.

use discfleet::config::ConfigFile;
use discfleet::logging::{init_logging, LogOptions, LoggingGuard};
use tracing::info;

use crate::client::{server_url_for, FleetClient};
use crate::error::CliError;

/// Runner that keeps logging alive for the duration of a daemon command.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    #[allow(dead_code)]
    logging_guard: LoggingGuard,
    config: ConfigFile,
}

impl CliRunner {
    /// Initialize logging for an already-loaded configuration.
    pub fn new(config: ConfigFile, options: LogOptions) -> Result<Self, CliError> {
        let logging_guard = init_logging(&config.logging.file, options)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            logging_guard,
            config,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("discfleet v{}", discfleet::VERSION);
        info!(
            command,
            log_file = %self.config.logging.file.display(),
            "discfleet CLI started"
        );
    }
}

/// Client for `--server`, or for the configured listen address.
pub fn client_for(server: Option<String>) -> Result<FleetClient, CliError> {
    let base = match server {
        Some(url) => url,
        None => server_url_for(ConfigFile::load()?.server.listen),
    };
    FleetClient::new(base)
}
