//! Tuning constants and the runtime configuration shared by authority and observers

use std::time::Duration;

/// Movement speed applied to a unit direction vector, in world units per second
pub const MOVE_SPEED: f64 = 10.0;
/// Maximum distance from a cluster seed for a report to join that cluster
pub const ARBITRATION_EPSILON: f64 = 1.0;
/// Prediction error an observer tolerates before snapping to the authoritative position
pub const CORRECTION_THRESHOLD: f64 = 0.5;
/// Clock disagreement (ms) an observer tolerates before rebasing on a time broadcast
pub const DRIFT_TOLERANCE_MS: i64 = 100;
pub const REPORT_INTERVAL_MS: u64 = 200;
pub const ARBITRATION_INTERVAL_MS: u64 = 500;
pub const TIME_SYNC_INTERVAL_MS: u64 = 1000;
/// Capacity of every transport queue
pub const QUEUE_CAPACITY: usize = 100;

/// Runtime knobs for one synchronization session.
///
/// Both sides read the same struct; the authority ignores the observer-only
/// fields and vice versa.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    pub move_speed: f64,
    pub arbitration_epsilon: f64,
    pub correction_threshold: f64,
    pub drift_tolerance_ms: i64,
    pub report_interval_ms: u64,
    pub arbitration_interval_ms: u64,
    pub time_sync_interval_ms: u64,
    pub queue_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            move_speed: MOVE_SPEED,
            arbitration_epsilon: ARBITRATION_EPSILON,
            correction_threshold: CORRECTION_THRESHOLD,
            drift_tolerance_ms: DRIFT_TOLERANCE_MS,
            report_interval_ms: REPORT_INTERVAL_MS,
            arbitration_interval_ms: ARBITRATION_INTERVAL_MS,
            time_sync_interval_ms: TIME_SYNC_INTERVAL_MS,
            queue_capacity: QUEUE_CAPACITY,
        }
    }
}

impl SyncConfig {
    pub fn report_interval(&self) -> Duration {
        Duration::from_millis(self.report_interval_ms)
    }

    pub fn arbitration_interval(&self) -> Duration {
        Duration::from_millis(self.arbitration_interval_ms)
    }

    pub fn time_sync_interval(&self) -> Duration {
        Duration::from_millis(self.time_sync_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_reference_constants() {
        let config = SyncConfig::default();
        assert_eq!(config.move_speed, 10.0);
        assert_eq!(config.arbitration_epsilon, 1.0);
        assert_eq!(config.correction_threshold, 0.5);
        assert_eq!(config.drift_tolerance_ms, 100);
        assert_eq!(config.queue_capacity, 100);
    }

    #[test]
    fn test_interval_accessors() {
        let config = SyncConfig::default();
        assert_eq!(config.report_interval(), Duration::from_millis(200));
        assert_eq!(config.arbitration_interval(), Duration::from_millis(500));
        assert_eq!(config.time_sync_interval(), Duration::from_secs(1));
    }
}
