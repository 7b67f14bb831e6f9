//! Crash recovery via bus resets.

mod error;
mod orchestrator;

pub use error::RecoveryError;
pub use orchestrator::{RecoveryOrchestrator, RecoveryOutcome, ResetReport};
