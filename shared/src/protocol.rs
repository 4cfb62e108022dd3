//! Wire messages exchanged between observers and the authority

use crate::error::ProtocolError;
use crate::kinematics::Vector2;
use crate::{EntityId, GameTime};
use serde::{Deserialize, Serialize};

/// An observer's claim about where an entity is at a logical time.
///
/// Also used for the authority's verdict after arbitration.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PositionReport {
    pub entity_id: EntityId,
    pub x: f64,
    pub y: f64,
    pub time: GameTime,
}

impl PositionReport {
    pub fn new(entity_id: impl Into<EntityId>, x: f64, y: f64, time: GameTime) -> Self {
        Self {
            entity_id: entity_id.into(),
            x,
            y,
            time,
        }
    }

    pub fn position(&self) -> Vector2 {
        Vector2::new(self.x, self.y)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Packet {
    Join {
        player_id: EntityId,
    },
    Move {
        player_id: EntityId,
        vector_x: f64,
        vector_y: f64,
        time: GameTime,
    },
    PositionSync {
        positions: Vec<PositionReport>,
        time: GameTime,
    },

    Welcome {
        player_id: EntityId,
        time: GameTime,
        players: Vec<EntityId>,
        positions: Vec<PositionReport>,
    },
    PlayerJoined {
        player_id: EntityId,
    },
    MoveCommand {
        player_id: EntityId,
        vector_x: f64,
        vector_y: f64,
        time: GameTime,
    },
    TimeSync {
        time: GameTime,
    },
    PositionUpdate(PositionReport),
}

impl Packet {
    /// Short name used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Packet::Join { .. } => "join",
            Packet::Move { .. } => "move",
            Packet::PositionSync { .. } => "position_sync",
            Packet::Welcome { .. } => "welcome",
            Packet::PlayerJoined { .. } => "player_joined",
            Packet::MoveCommand { .. } => "move_command",
            Packet::TimeSync { .. } => "time_sync",
            Packet::PositionUpdate(_) => "position_update",
        }
    }
}

pub fn encode(packet: &Packet) -> Result<Vec<u8>, ProtocolError> {
    bincode::serialize(packet).map_err(ProtocolError::Encode)
}

pub fn decode(frame: &[u8]) -> Result<Packet, ProtocolError> {
    bincode::deserialize(frame).map_err(ProtocolError::Decode)
}
