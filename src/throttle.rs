//! Pointer-move rate limiting.
//!
//! Drag handlers recompute geometry on every move event; the throttle drops moves
//! that arrive faster than the configured rate. Only moves are throttled: pointer
//! down/up always go through.

use std::time::Duration;
use web_time::Instant;

/// Drops pointer-move events arriving within `interval` of the last accepted one.
#[derive(Debug, Clone)]
pub struct MoveThrottle {
    /// Minimum time between accepted moves. Zero disables throttling.
    interval: Duration,

    /// Time of the last accepted move.
    last_accepted: Option<Instant>,
}

impl MoveThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_accepted: None,
        }
    }

    /// Throttle to at most `hz` moves per second (`0` = unlimited).
    pub fn from_hz(hz: u32) -> Self {
        if hz == 0 {
            Self::unlimited()
        } else {
            Self::new(Duration::from_secs(1) / hz)
        }
    }

    /// A throttle that accepts everything.
    pub fn unlimited() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Decide whether a move happening at `now` should be processed.
    pub fn accept_at(&mut self, now: Instant) -> bool {
        if self.interval.is_zero() {
            return true;
        }
        match self.last_accepted {
            Some(last) if now.saturating_duration_since(last) < self.interval => {
                log::trace!("Throttle: dropped pointer move");
                false
            }
            _ => {
                self.last_accepted = Some(now);
                true
            }
        }
    }

    /// Forget the last accepted move (call at gesture start).
    pub fn reset(&mut self) {
        self.last_accepted = None;
    }
}

impl Default for MoveThrottle {
    fn default() -> Self {
        Self::from_hz(crate::constants::DEFAULT_POINTER_MOVE_HZ)
    }
}
