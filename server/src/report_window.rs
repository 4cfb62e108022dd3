//! Per-cycle buffer of the latest position report from each observer

use shared::{EntityId, ObserverId, PositionReport};
use std::collections::{BTreeMap, HashMap};

/// Reports collected during one arbitration cycle.
///
/// Holds at most one report per (entity, observer); a later report from the
/// same observer replaces the earlier one. Observers are kept ordered by id so
/// arbitration sees a stable input order.
#[derive(Debug, Default)]
pub struct ReportWindow {
    reports: HashMap<EntityId, BTreeMap<ObserverId, PositionReport>>,
}

impl ReportWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `report` as `observer`'s current view of its entity.
    pub fn insert(&mut self, observer: &str, report: PositionReport) {
        self.reports
            .entry(report.entity_id.clone())
            .or_default()
            .insert(observer.to_string(), report);
    }

    /// Empties the window, returning what it held.
    pub fn take(&mut self) -> ReportWindow {
        std::mem::take(self)
    }

    /// Reports for each entity, ordered by observer id.
    pub fn into_batches(self) -> Vec<(EntityId, Vec<PositionReport>)> {
        let mut batches: Vec<(EntityId, Vec<PositionReport>)> = self
            .reports
            .into_iter()
            .map(|(entity, by_observer)| (entity, by_observer.into_values().collect()))
            .collect();
        batches.sort_by(|a, b| a.0.cmp(&b.0));
        batches
    }

    /// Number of entities with at least one report.
    pub fn entity_count(&self) -> usize {
        self.reports.len()
    }

    pub fn report_count(&self) -> usize {
        self.reports.values().map(|r| r.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }
}
