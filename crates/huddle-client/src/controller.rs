//! Connection status state machine with reconnect scheduling.

use std::time::Duration;

use crate::backoff::ReconnectPolicy;

/// Externally visible connection status, driven by the controller and
/// rendered as the "reconnecting" indicator in the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// First connection attempt in progress.
    Connecting,
    /// Socket open and handshake acknowledged.
    Connected,
    /// Torn down on purpose; no reconnect scheduled.
    Disconnected,
    /// Unexpectedly closed; a retry is scheduled.
    Reconnecting,
}

/// Drives the `IDLE → CONNECTING → CONNECTED ⇄ RECONNECTING` machine.
///
/// The `intentional_close` flag is the only thing separating "network
/// blip" from "caller does not want this socket anymore". It must be set
/// *before* the socket is closed, otherwise the close event can race ahead
/// of the flag and schedule a reconnect nobody wants.
#[derive(Debug)]
pub struct ReconnectController {
    policy: ReconnectPolicy,
    status: ConnectionStatus,
    attempt: u32,
    intentional_close: bool,
}

impl ReconnectController {
    /// Creates an idle controller.
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            status: ConnectionStatus::Disconnected,
            attempt: 0,
            intentional_close: false,
        }
    }

    /// Current status.
    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// Number of consecutive failed attempts.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// A connection attempt is starting.
    pub fn begin_connect(&mut self) {
        if self.attempt == 0 {
            self.status = ConnectionStatus::Connecting;
        } else {
            self.status = ConnectionStatus::Reconnecting;
        }
    }

    /// The socket opened successfully; the attempt counter resets.
    pub fn on_open(&mut self) {
        self.status = ConnectionStatus::Connected;
        self.attempt = 0;
    }

    /// The caller is tearing the socket down on purpose. Call this before
    /// closing the socket.
    pub fn close(&mut self) {
        self.intentional_close = true;
    }

    /// The socket closed (or the connection attempt failed).
    ///
    /// Returns the delay before the next attempt, or `None` when the close
    /// was intentional and the machine is done.
    pub fn on_close(&mut self) -> Option<Duration> {
        if self.intentional_close {
            self.status = ConnectionStatus::Disconnected;
            return None;
        }

        let delay = self.policy.delay_for(self.attempt);
        self.attempt += 1;
        self.status = ConnectionStatus::Reconnecting;
        Some(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unexpected_close_schedules_growing_delays() {
        let mut ctl = ReconnectController::new(ReconnectPolicy::default());
        ctl.begin_connect();
        assert_eq!(ctl.status(), ConnectionStatus::Connecting);

        let delays: Vec<u64> = (0..5)
            .map(|_| ctl.on_close().unwrap().as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![1000, 2000, 4000, 8000, 16000]);
        assert_eq!(ctl.status(), ConnectionStatus::Reconnecting);
    }

    #[test]
    fn successful_open_resets_the_attempt_counter() {
        let mut ctl = ReconnectController::new(ReconnectPolicy::default());
        ctl.begin_connect();
        ctl.on_close();
        ctl.on_close();
        assert_eq!(ctl.attempt(), 2);

        ctl.begin_connect();
        ctl.on_open();
        assert_eq!(ctl.status(), ConnectionStatus::Connected);
        assert_eq!(ctl.attempt(), 0);

        assert_eq!(ctl.on_close().unwrap().as_millis(), 1000);
    }

    #[test]
    fn intentional_close_suppresses_reconnect() {
        let mut ctl = ReconnectController::new(ReconnectPolicy::default());
        ctl.begin_connect();
        ctl.on_open();

        // Flag set before the socket close, so the close event that
        // follows cannot schedule a retry.
        ctl.close();
        assert!(ctl.on_close().is_none());
        assert_eq!(ctl.status(), ConnectionStatus::Disconnected);
    }

    #[test]
    fn reconnect_shows_reconnecting_not_connecting() {
        let mut ctl = ReconnectController::new(ReconnectPolicy::default());
        ctl.begin_connect();
        ctl.on_close();
        ctl.begin_connect();
        assert_eq!(ctl.status(), ConnectionStatus::Reconnecting);
    }
}
