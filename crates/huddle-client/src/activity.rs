//! Activity signal scheduling.
//!
//! A connected client must keep telling the server a human is present, or
//! presence degrades to away after the server's silence window even while
//! the socket stays open. Two triggers feed the same throttle: a periodic
//! timer, and real user input capped to one signal per ten seconds.

use std::time::{Duration, Instant};

/// Minimum gap between input-driven activity signals.
pub const INPUT_THROTTLE: Duration = Duration::from_secs(10);

/// Interval for timer-driven activity signals.
pub const PERIODIC_INTERVAL: Duration = Duration::from_secs(60);

/// Decides when an `ACTIVITY` frame is worth sending.
#[derive(Debug, Default)]
pub struct ActivityThrottle {
    last_sent: Option<Instant>,
}

impl ActivityThrottle {
    /// Creates a throttle that will allow the first signal immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// The user did something. Returns `true` when a signal should be
    /// sent now (at most once per [`INPUT_THROTTLE`]).
    pub fn on_user_input(&mut self, now: Instant) -> bool {
        let due = self
            .last_sent
            .map(|last| now.duration_since(last) >= INPUT_THROTTLE)
            .unwrap_or(true);
        if due {
            self.last_sent = Some(now);
        }
        due
    }

    /// The periodic timer fired. Returns `true` when no signal went out
    /// during the last [`PERIODIC_INTERVAL`].
    pub fn on_tick(&mut self, now: Instant) -> bool {
        let due = self
            .last_sent
            .map(|last| now.duration_since(last) >= PERIODIC_INTERVAL)
            .unwrap_or(true);
        if due {
            self.last_sent = Some(now);
        }
        due
    }
}
