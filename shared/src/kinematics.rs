//! Constant-velocity extrapolation of entity positions between checkpoints

use crate::{EntityId, GameTime};
use serde::{Deserialize, Serialize};

/// Represents a vector in 2D space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Vector2 {
    pub x: f64,
    pub y: f64,
}

impl Vector2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    ///Returns the magnitude of the vector.
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    ///Returns the scaled vector.
    pub fn scale(&self, scalar: f64) -> Vector2 {
        Vector2 {
            x: self.x * scalar,
            y: self.y * scalar,
        }
    }

    ///Returns the sum of two vectors.
    pub fn add(&self, other: &Vector2) -> Vector2 {
        Vector2 {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }

    /// Euclidean distance between two points.
    pub fn distance(&self, other: &Vector2) -> f64 {
        Vector2::new(self.x - other.x, self.y - other.y).magnitude()
    }
}

/// One observer's private record of where an entity is and how it moves.
///
/// `position` is only exact at `checkpoint`; every other time must be
/// extrapolated with [`KinematicState::predict`].
#[derive(Debug, Clone, PartialEq)]
pub struct KinematicState {
    pub id: EntityId,
    pub position: Vector2,
    /// World units per second
    pub velocity: Vector2,
    pub checkpoint: GameTime,
}

impl KinematicState {
    /// Creates a resting entity at `position`, valid as of `checkpoint`.
    pub fn new(id: impl Into<EntityId>, position: Vector2, checkpoint: GameTime) -> Self {
        Self {
            id: id.into(),
            position,
            velocity: Vector2::default(),
            checkpoint,
        }
    }

    /// Projected position at `time`. Does not touch the record.
    ///
    /// Times before the checkpoint extrapolate backward with the same formula.
    pub fn predict(&self, time: GameTime) -> Vector2 {
        let elapsed_secs = (time - self.checkpoint) as f64 / 1000.0;
        self.position.add(&self.velocity.scale(elapsed_secs))
    }

    /// Folds motion up to `time` into the position and moves the checkpoint
    /// there. Velocity is left alone.
    pub fn advance(&mut self, time: GameTime) {
        self.position = self.predict(time);
        self.checkpoint = time;
    }

    /// Applies a velocity change that takes effect at `time`.
    ///
    /// Motion accrued under the old velocity is committed first, otherwise
    /// everything since the last checkpoint would be lost.
    pub fn set_velocity(&mut self, time: GameTime, direction: Vector2, speed: f64) {
        self.advance(time);
        self.velocity = direction.scale(speed);
    }

    /// Reconciles against an authoritative position taken at `time`.
    ///
    /// Snaps position and checkpoint only when the prediction is off by more
    /// than `threshold`; returns the prediction error when it did.
    pub fn correct(&mut self, authoritative: Vector2, time: GameTime, threshold: f64) -> Option<f64> {
        let error = self.predict(time).distance(&authoritative);
        if error > threshold {
            self.position = authoritative;
            self.checkpoint = time;
            Some(error)
        } else {
            None
        }
    }
}
