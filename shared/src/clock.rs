//! Rebasable logical game clock

use crate::GameTime;
use std::time::Instant;

/// Logical millisecond clock anchored to a wall-clock instant.
///
/// The clock is a plain value: rebasing produces a new clock rather than
/// mutating this one, so a holder swaps its copy wholesale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameClock {
    /// Wall instant at which the clock read `base`
    anchor: Instant,
    base: GameTime,
}

impl GameClock {
    /// Starts a clock that reads 0 now.
    pub fn new() -> Self {
        Self::rebased_at(0, Instant::now())
    }

    /// Current logical time in milliseconds.
    pub fn now(&self) -> GameTime {
        self.now_at(Instant::now())
    }

    /// Logical time the clock reads at `instant`.
    pub fn now_at(&self, instant: Instant) -> GameTime {
        match instant.checked_duration_since(self.anchor) {
            Some(elapsed) => self.base + elapsed.as_millis() as GameTime,
            None => self.base - self.anchor.duration_since(instant).as_millis() as GameTime,
        }
    }

    /// Returns a clock whose `now()` reads `time` immediately.
    pub fn rebase(&self, time: GameTime) -> Self {
        Self::rebased_at(time, Instant::now())
    }

    /// Returns a clock that reads `time` at `instant`.
    pub fn rebased_at(time: GameTime, instant: Instant) -> Self {
        Self {
            anchor: instant,
            base: time,
        }
    }
}

impl Default for GameClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Drift policy applied on an authority time broadcast: rebase only when the
/// local reading is more than `tolerance_ms` away.
pub fn needs_rebase(local: GameTime, broadcast: GameTime, tolerance_ms: i64) -> bool {
    (local - broadcast).abs() > tolerance_ms
}
