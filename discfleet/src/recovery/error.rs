//! Recovery errors.

use thiserror::Error;

use crate::topology::TopologyError;

/// Errors from an operator-requested reset.
#[derive(Debug, Error)]
pub enum RecoveryError {
    /// Drives on the bus are mid-rip and the request did not confirm
    #[error(
        "Bus {bus_id} has active rips on {}; confirm to reset anyway",
        active_devices.join(", ")
    )]
    ConfirmationRequired {
        bus_id: String,
        active_devices: Vec<String>,
    },

    /// The bus could not be found, is not resettable, or the reset failed
    #[error(transparent)]
    Topology(#[from] TopologyError),
}
