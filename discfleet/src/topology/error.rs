//! Bus topology errors.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by bus discovery and bus resets.
#[derive(Debug, Error)]
pub enum TopologyError {
    /// No discovered bus has this id
    #[error("Unknown bus: {0}")]
    NotFound(String),

    /// The bus has no usable reset primitive
    #[error("Bus {0} does not support reset")]
    Unsupported(String),

    /// Another reset of the same bus has not finished yet
    #[error("Reset already in progress for bus {0}")]
    ResetInProgress(String),

    /// Writing the reset control file failed
    #[error("Reset of bus {bus_id} failed writing {}: {source}", handle.display())]
    ResetFailed {
        bus_id: String,
        handle: PathBuf,
        source: io::Error,
    },
}

impl TopologyError {
    /// The bus id this error refers to.
    pub fn bus_id(&self) -> &str {
        match self {
            TopologyError::NotFound(id)
            | TopologyError::Unsupported(id)
            | TopologyError::ResetInProgress(id) => id,
            TopologyError::ResetFailed { bus_id, .. } => bus_id,
        }
    }
}
