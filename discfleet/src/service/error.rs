//! Service error types.

use std::fmt;
use std::io;
use std::net::SocketAddr;

use crate::config::ConfigFileError;

/// Errors that can occur while starting or stopping the fleet service.
#[derive(Debug)]
pub enum ServiceError {
    /// Invalid configuration
    ConfigError(ConfigFileError),
    /// Could not bind the HTTP listener
    BindError { addr: SocketAddr, source: io::Error },
    /// I/O error (creating directories, serving HTTP)
    IoError(io::Error),
    /// A background task panicked or was aborted
    TaskError(String),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigError(e) => write!(f, "Configuration error: {}", e),
            Self::BindError { addr, source } => {
                write!(f, "Failed to listen on {}: {}", addr, source)
            }
            Self::IoError(e) => write!(f, "I/O error: {}", e),
            Self::TaskError(msg) => write!(f, "Background task failed: {}", msg),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ConfigError(e) => Some(e),
            Self::BindError { source, .. } => Some(source),
            Self::IoError(e) => Some(e),
            Self::TaskError(_) => None,
        }
    }
}

impl From<ConfigFileError> for ServiceError {
    fn from(e: ConfigFileError) -> Self {
        Self::ConfigError(e)
    }
}

impl From<io::Error> for ServiceError {
    fn from(e: io::Error) -> Self {
        Self::IoError(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_error_display() {
        let err = ServiceError::BindError {
            addr: "127.0.0.1:8787".parse().unwrap(),
            source: io::Error::new(io::ErrorKind::AddrInUse, "in use"),
        };
        assert_eq!(err.to_string(), "Failed to listen on 127.0.0.1:8787: in use");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_from_io() {
        let err: ServiceError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, ServiceError::IoError(_)));
    }
}
