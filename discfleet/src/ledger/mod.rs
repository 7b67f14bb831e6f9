//! Drive stats ledger.
//!
//! Keeps a persistent per-drive history of crashes and bus resets and derives
//! a health tier from the recent crash rate. Drives that keep wedging are
//! flagged for replacement.

mod daemon;
mod record;
mod store;

pub use daemon::LedgerFlushDaemon;
pub use record::{
    DriveHealth, DriveHealthRecord, HealthEvent, HealthEventKind, HealthPolicy, HealthTier,
    HISTORY_WINDOW_DAYS, TIER_WINDOW_DAYS,
};
pub use store::{DriveStatsLedger, LedgerError};
