//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;

use discfleet::config::ConfigFileError;
use discfleet::service::ServiceError;

/// Exit code when a reset was refused pending confirmation.
pub const EXIT_NEEDS_CONFIRMATION: i32 = 2;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// The fleet service failed to start or stopped with an error
    Service(ServiceError),
    /// Failed to build the async runtime
    Runtime(std::io::Error),
    /// Could not reach the fleet service
    Connect { url: String, error: reqwest::Error },
    /// The fleet service answered with an error status
    Api { status: u16, message: String },
    /// A reset was refused because drives on the bus are ripping
    ConfirmationRequired {
        bus_id: String,
        active_devices: Vec<String>,
    },
}

impl CliError {
    /// Exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::ConfirmationRequired { .. } => EXIT_NEEDS_CONFIRMATION,
            _ => 1,
        }
    }

    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Connect { .. } => {
                eprintln!();
                eprintln!("Is the fleet service running? Start it with: discfleet run");
                eprintln!("Use --server to point at a service on another address.");
            }
            CliError::ConfirmationRequired { bus_id, .. } => {
                eprintln!();
                eprintln!("Resetting will interrupt those rips. To proceed anyway:");
                eprintln!("  discfleet reset {} --confirm", bus_id);
            }
            CliError::Service(ServiceError::BindError { .. }) => {
                eprintln!();
                eprintln!("Another instance may already be running, or change [server] listen.");
            }
            _ => {}
        }

        process::exit(self.exit_code())
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Service(e) => write!(f, "Fleet service error: {}", e),
            CliError::Runtime(e) => write!(f, "Failed to start async runtime: {}", e),
            CliError::Connect { url, error } => {
                write!(f, "Failed to reach fleet service at {}: {}", url, error)
            }
            CliError::Api { status, message } => {
                write!(f, "Fleet service returned {}: {}", status, message)
            }
            CliError::ConfirmationRequired {
                bus_id,
                active_devices,
            } => write!(
                f,
                "Bus {} has active rips on {}",
                bus_id,
                active_devices.join(", ")
            ),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Service(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            CliError::Connect { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<ServiceError> for CliError {
    fn from(e: ServiceError) -> Self {
        CliError::Service(e)
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirmation_has_distinct_exit_code() {
        let err = CliError::ConfirmationRequired {
            bus_id: "pci-0000:03:00.0".to_string(),
            active_devices: vec!["sr1".to_string(), "sr2".to_string()],
        };
        assert_eq!(err.exit_code(), EXIT_NEEDS_CONFIRMATION);
        assert_eq!(
            err.to_string(),
            "Bus pci-0000:03:00.0 has active rips on sr1, sr2"
        );
    }

    #[test]
    fn test_api_error_display() {
        let err = CliError::Api {
            status: 404,
            message: "bus not found: usb-9".to_string(),
        };
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("404"));
    }
}
