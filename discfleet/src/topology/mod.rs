//! Bus topology resolver.
//!
//! Maps each drive to the hardware unit that can be electrically reset to
//! recover it (a USB port, a PCI function, or the PCI controller behind a
//! libata port) and groups drives sharing that unit.

mod classify;
mod error;
mod resolver;
mod types;

pub use classify::{classify, Classification};
pub use error::TopologyError;
pub use resolver::{BusTopology, TopologyTimings};
pub use types::{Bus, BusType};
