//! Per-observer kinematic view of every tracked player

use shared::{EntityId, GameTime, KinematicState, PositionReport, Vector2};
use std::collections::HashMap;

/// One observer's private view of every tracked entity.
///
/// Entities are created on first knowledge and never removed for the rest of
/// the session.
#[derive(Debug, Default)]
pub struct World {
    entities: HashMap<EntityId, KinematicState>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking every player in the authority's roster snapshot at
    /// rest. Entities already known, e.g. from a move relayed before the
    /// welcome, are left untouched. Returns how many were created.
    pub fn seed(&mut self, positions: &[PositionReport]) -> usize {
        let mut created = 0;
        for report in positions {
            self.entities
                .entry(report.entity_id.clone())
                .or_insert_with(|| {
                    created += 1;
                    KinematicState::new(report.entity_id.as_str(), report.position(), report.time)
                });
        }
        created
    }

    /// Starts tracking `id` at the origin if we don't know it yet. Returns
    /// whether a new entity was created.
    pub fn ensure(&mut self, id: &str, time: GameTime) -> bool {
        if self.entities.contains_key(id) {
            return false;
        }
        self.entities
            .insert(id.to_string(), KinematicState::new(id, Vector2::default(), time));
        true
    }

    /// Applies a relayed velocity change for `id` taking effect at `time`.
    pub fn apply_move(&mut self, id: &str, direction: Vector2, time: GameTime, speed: f64) -> Vector2 {
        let state = self
            .entities
            .entry(id.to_string())
            .or_insert_with(|| KinematicState::new(id, Vector2::default(), time));

        state.set_velocity(time, direction, speed);
        state.velocity
    }

    /// Reconciles against an arbitration verdict. Returns the prediction
    /// error when a snap happened; unknown entities are ignored.
    pub fn apply_correction(&mut self, verdict: &PositionReport, threshold: f64) -> Option<f64> {
        self.entities
            .get_mut(&verdict.entity_id)?
            .correct(verdict.position(), verdict.time, threshold)
    }

    /// Predicted position of `id` at `time`.
    pub fn position_at(&self, id: &str, time: GameTime) -> Option<Vector2> {
        self.entities.get(id).map(|state| state.predict(time))
    }

    /// Predicted positions of every entity at `time`, sorted by id.
    pub fn self_report(&self, time: GameTime) -> Vec<PositionReport> {
        let mut reports: Vec<PositionReport> = self
            .entities
            .values()
            .map(|state| {
                let p = state.predict(time);
                PositionReport::new(state.id.as_str(), p.x, p.y, time)
            })
            .collect();
        reports.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));
        reports
    }

    pub fn get(&self, id: &str) -> Option<&KinematicState> {
        self.entities.get(id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
