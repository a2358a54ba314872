//! Exponential reconnect backoff.

use std::time::Duration;

/// Jitter-free exponential backoff policy for reconnect attempts.
#[derive(Debug, Clone, Copy)]
pub struct ReconnectPolicy {
    /// Delay before the first retry, in milliseconds.
    pub initial_ms: u64,
    /// Multiplier applied per failed attempt.
    pub multiplier: u32,
    /// Delay ceiling, in milliseconds.
    pub max_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_ms: 1_000,
            multiplier: 2,
            max_ms: 30_000,
        }
    }
}

impl ReconnectPolicy {
    /// Delay for the given attempt number (0-based):
    /// `min(max, initial * multiplier^attempt)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = (self.multiplier as u64).saturating_pow(attempt);
        let delay = self.initial_ms.saturating_mul(factor).min(self.max_ms);
        Duration::from_millis(delay)
    }
}
