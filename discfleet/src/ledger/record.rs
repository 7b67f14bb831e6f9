//! Per-drive health records and derived health tiers.

use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_REPLACE_CRASHES, DEFAULT_RETENTION_DAYS, DEFAULT_WARNING_CRASHES};
use crate::time::SECS_PER_DAY;

/// Window used for the tier decision.
pub const TIER_WINDOW_DAYS: f64 = 7.0;

/// Window reported as `crashes_30d`. History is always kept at least this long.
pub const HISTORY_WINDOW_DAYS: f64 = 30.0;

/// Kind of event kept in a drive's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthEventKind {
    Crash,
    Reset,
}

/// A single timestamped crash or reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthEvent {
    /// Epoch seconds.
    pub timestamp: f64,
    #[serde(rename = "type")]
    pub kind: HealthEventKind,
}

/// Health classification derived from the recent crash rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthTier {
    Good,
    Warning,
    Replace,
}

impl HealthTier {
    /// Returns a string representation of the tier.
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthTier::Good => "good",
            HealthTier::Warning => "warning",
            HealthTier::Replace => "replace",
        }
    }
}

impl std::fmt::Display for HealthTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Thresholds for tier classification and history retention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthPolicy {
    /// 7-day crashes at or above this are `warning`.
    pub warning_crashes: u32,
    /// 7-day crashes at or above this are `replace`.
    pub replace_crashes: u32,
    /// History older than this many days is pruned, but never inside
    /// [`HISTORY_WINDOW_DAYS`].
    pub retention_days: u32,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            warning_crashes: DEFAULT_WARNING_CRASHES,
            replace_crashes: DEFAULT_REPLACE_CRASHES,
            retention_days: DEFAULT_RETENTION_DAYS,
        }
    }
}

impl HealthPolicy {
    /// Classify a 7-day crash count.
    pub fn tier(&self, crashes_7d: u32) -> HealthTier {
        if crashes_7d >= self.replace_crashes {
            HealthTier::Replace
        } else if crashes_7d >= self.warning_crashes {
            HealthTier::Warning
        } else {
            HealthTier::Good
        }
    }

    /// Oldest timestamp kept in history at time `now`.
    pub fn retention_cutoff(&self, now: f64) -> f64 {
        let days = f64::from(self.retention_days).max(HISTORY_WINDOW_DAYS);
        now - days * SECS_PER_DAY
    }
}

/// Stored health record for one drive.
///
/// Lifetime counters are monotonic; only `events` is subject to pruning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveHealthRecord {
    pub crash_count: u64,
    pub reset_count: u64,
    pub last_crash: Option<f64>,
    pub last_reset: Option<f64>,
    #[serde(default)]
    pub events: Vec<HealthEvent>,
}

impl DriveHealthRecord {
    /// Append an event and bump the matching lifetime counter.
    pub fn record(&mut self, kind: HealthEventKind, timestamp: f64) {
        match kind {
            HealthEventKind::Crash => {
                self.crash_count += 1;
                self.last_crash = Some(timestamp);
            }
            HealthEventKind::Reset => {
                self.reset_count += 1;
                self.last_reset = Some(timestamp);
            }
        }
        self.events.push(HealthEvent { timestamp, kind });
    }

    /// Drop history older than `cutoff`. Returns the number of events removed.
    pub fn prune(&mut self, cutoff: f64) -> usize {
        let before = self.events.len();
        self.events.retain(|e| e.timestamp >= cutoff);
        before - self.events.len()
    }

    /// Crashes recorded at or after `since`.
    pub fn crashes_since(&self, since: f64) -> u32 {
        self.events
            .iter()
            .filter(|e| e.kind == HealthEventKind::Crash && e.timestamp >= since)
            .count() as u32
    }

    /// Build the read-only view with derived counters.
    pub fn snapshot(&self, device: &str, policy: &HealthPolicy, now: f64) -> DriveHealth {
        let crashes_7d = self.crashes_since(now - TIER_WINDOW_DAYS * SECS_PER_DAY);
        let crashes_30d = self.crashes_since(now - HISTORY_WINDOW_DAYS * SECS_PER_DAY);

        DriveHealth {
            device: device.to_string(),
            crash_count: self.crash_count,
            reset_count: self.reset_count,
            last_crash: self.last_crash,
            last_reset: self.last_reset,
            crashes_7d,
            crashes_30d,
            tier: policy.tier(crashes_7d),
            events: self.events.clone(),
        }
    }
}

/// Enriched, read-only snapshot of a drive's health.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveHealth {
    pub device: String,
    pub crash_count: u64,
    pub reset_count: u64,
    pub last_crash: Option<f64>,
    pub last_reset: Option<f64>,
    pub crashes_7d: u32,
    pub crashes_30d: u32,
    pub tier: HealthTier,
    pub events: Vec<HealthEvent>,
}

impl DriveHealth {
    /// Health of a drive that has never crashed or been reset.
    pub fn pristine(device: &str) -> Self {
        Self {
            device: device.to_string(),
            crash_count: 0,
            reset_count: 0,
            last_crash: None,
            last_reset: None,
            crashes_7d: 0,
            crashes_30d: 0,
            tier: HealthTier::Good,
            events: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: f64 = 1_700_000_000.0;

    fn record_with_crashes(n: usize, age_secs: f64) -> DriveHealthRecord {
        let mut record = DriveHealthRecord::default();
        for i in 0..n {
            record.record(HealthEventKind::Crash, NOW - age_secs - i as f64);
        }
        record
    }

    #[test]
    fn test_tier_boundaries() {
        let policy = HealthPolicy::default();
        assert_eq!(policy.tier(0), HealthTier::Good);
        assert_eq!(policy.tier(2), HealthTier::Good);
        assert_eq!(policy.tier(3), HealthTier::Warning);
        assert_eq!(policy.tier(4), HealthTier::Warning);
        assert_eq!(policy.tier(5), HealthTier::Replace);
        assert_eq!(policy.tier(9), HealthTier::Replace);
    }

    #[test]
    fn test_custom_thresholds() {
        let policy = HealthPolicy {
            warning_crashes: 1,
            replace_crashes: 2,
            retention_days: 30,
        };
        assert_eq!(policy.tier(0), HealthTier::Good);
        assert_eq!(policy.tier(1), HealthTier::Warning);
        assert_eq!(policy.tier(2), HealthTier::Replace);
    }

    #[test]
    fn test_snapshot_tier_from_recent_crashes() {
        let policy = HealthPolicy::default();
        for (crashes, tier) in [
            (2, HealthTier::Good),
            (3, HealthTier::Warning),
            (4, HealthTier::Warning),
            (5, HealthTier::Replace),
        ] {
            let snap = record_with_crashes(crashes, 60.0).snapshot("sr0", &policy, NOW);
            assert_eq!(snap.crashes_7d, crashes as u32);
            assert_eq!(snap.tier, tier, "{} crashes", crashes);
        }
    }

    #[test]
    fn test_old_crashes_excluded_from_window() {
        let policy = HealthPolicy::default();
        // Ten days old: outside the 7-day window, inside the 30-day window
        let record = record_with_crashes(6, 10.0 * SECS_PER_DAY);
        let snap = record.snapshot("sr0", &policy, NOW);

        assert_eq!(snap.crashes_7d, 0);
        assert_eq!(snap.crashes_30d, 6);
        assert_eq!(snap.tier, HealthTier::Good);
        assert_eq!(snap.crash_count, 6);
    }

    #[test]
    fn test_prune_keeps_lifetime_counters() {
        let policy = HealthPolicy::default();
        let mut record = record_with_crashes(4, 40.0 * SECS_PER_DAY);
        record.record(HealthEventKind::Reset, NOW - 45.0 * SECS_PER_DAY);
        record.record(HealthEventKind::Crash, NOW - 60.0);

        let removed = record.prune(policy.retention_cutoff(NOW));

        assert_eq!(removed, 5);
        assert_eq!(record.events.len(), 1);
        assert_eq!(record.crash_count, 5);
        assert_eq!(record.reset_count, 1);
        assert_eq!(record.snapshot("sr0", &policy, NOW).crashes_30d, 1);
    }

    #[test]
    fn test_short_retention_keeps_30_day_window() {
        let policy = HealthPolicy {
            retention_days: 3,
            ..HealthPolicy::default()
        };
        let mut record = record_with_crashes(2, 20.0 * SECS_PER_DAY);
        record.record(HealthEventKind::Crash, NOW - 45.0 * SECS_PER_DAY);

        let removed = record.prune(policy.retention_cutoff(NOW));

        assert_eq!(removed, 1);
        assert_eq!(record.snapshot("sr0", &policy, NOW).crashes_30d, 2);
    }

    #[test]
    fn test_record_updates_last_timestamps() {
        let mut record = DriveHealthRecord::default();
        record.record(HealthEventKind::Crash, 10.0);
        record.record(HealthEventKind::Reset, 20.0);

        assert_eq!(record.last_crash, Some(10.0));
        assert_eq!(record.last_reset, Some(20.0));
        assert_eq!(record.events.len(), 2);
    }

    #[test]
    fn test_event_serialization_uses_type_field() {
        let event = HealthEvent {
            timestamp: 1.5,
            kind: HealthEventKind::Crash,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"timestamp":1.5,"type":"crash"}"#);
    }
}
