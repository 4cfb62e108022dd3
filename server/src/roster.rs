//! Authority-side record of joined players and their last arbitrated position
//!
//! The authority never simulates movement; a roster entry only changes when a
//! player joins or when an arbitration cycle produces a verdict for it.

use log::info;
use shared::{EntityId, GameTime, PositionReport};
use std::collections::HashMap;

/// What the authority last knew about one player
#[derive(Debug, Clone, PartialEq)]
pub struct RosterEntry {
    pub x: f64,
    pub y: f64,
    /// Logical time the position was valid at
    pub last_sync: GameTime,
}

pub struct Roster {
    players: HashMap<EntityId, RosterEntry>,
}

impl Roster {
    pub fn new() -> Self {
        Self {
            players: HashMap::new(),
        }
    }

    /// Adds a player at the origin, valid as of `now`.
    ///
    /// A player id that joins again is reset the same way.
    pub fn join(&mut self, player_id: &str, now: GameTime) {
        let entry = RosterEntry {
            x: 0.0,
            y: 0.0,
            last_sync: now,
        };

        if self.players.insert(player_id.to_string(), entry).is_some() {
            info!("Player {} rejoined, position reset", player_id);
        } else {
            info!("Player {} added to roster", player_id);
        }
    }

    /// Stores an arbitration verdict. Returns false for players that never joined.
    pub fn record_arbitration(&mut self, verdict: &PositionReport) -> bool {
        match self.players.get_mut(&verdict.entity_id) {
            Some(entry) => {
                entry.x = verdict.x;
                entry.y = verdict.y;
                entry.last_sync = verdict.time;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, player_id: &str) -> Option<&RosterEntry> {
        self.players.get(player_id)
    }

    /// Player ids and their stored positions, sorted by id, for welcoming a
    /// new observer.
    pub fn snapshot(&self) -> (Vec<EntityId>, Vec<PositionReport>) {
        let mut ids: Vec<&EntityId> = self.players.keys().collect();
        ids.sort();

        let positions = ids
            .iter()
            .map(|id| {
                let entry = &self.players[*id];
                PositionReport::new(id.as_str(), entry.x, entry.y, entry.last_sync)
            })
            .collect();

        (ids.into_iter().cloned().collect(), positions)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

impl Default for Roster {
    fn default() -> Self {
        Self::new()
    }
}
