//! Building blocks shared by the authority and its observers: the logical
//! clock, kinematic extrapolation, position arbitration, the wire protocol
//! and the in-memory transport that carries it.

pub mod arbitration;
pub mod clock;
pub mod config;
pub mod error;
pub mod kinematics;
pub mod protocol;
pub mod transport;

/// Identifies a tracked entity (one per player)
pub type EntityId = String;
/// Identifies a participant on the transport
pub type ObserverId = String;
/// Logical game time in milliseconds
pub type GameTime = i64;

pub use arbitration::PositionArbitrator;
pub use clock::GameClock;
pub use config::SyncConfig;
pub use error::{ProtocolError, TransportError};
pub use kinematics::{KinematicState, Vector2};
pub use protocol::{Packet, PositionReport};
pub use transport::LocalTransport;
