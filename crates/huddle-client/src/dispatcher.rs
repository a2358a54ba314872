//! Cross-component frame delivery.
//!
//! UI components (message list, notification toasts, unread badges)
//! register observers here instead of each reaching into the socket. The
//! hub is constructed once at startup, owned by whoever drives the socket
//! event loop, and cleared on shutdown — there is no module-level state.

use serde_json::Value;

/// Identifier returned by [`NotificationHub::register`], used to remove
/// the observer again.
pub type ObserverId = usize;

type Observer = Box<dyn Fn(&Value) + Send>;

/// Explicit observer list for inbound frames.
#[derive(Default)]
pub struct NotificationHub {
    observers: Vec<(ObserverId, Observer)>,
    next_id: ObserverId,
}

impl NotificationHub {
    /// Creates an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer; it receives every dispatched frame.
    pub fn register(&mut self, observer: impl Fn(&Value) + Send + 'static) -> ObserverId {
        let id = self.next_id;
        self.next_id += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Remove a previously registered observer. Unknown ids are ignored.
    pub fn unregister(&mut self, id: ObserverId) {
        self.observers.retain(|(observer_id, _)| *observer_id != id);
    }

    /// Deliver a frame to every registered observer, in registration
    /// order.
    pub fn dispatch(&self, frame: &Value) {
        for (_, observer) in &self.observers {
            observer(frame);
        }
    }

    /// Number of registered observers.
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Whether no observers are registered.
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Drop every observer (shutdown).
    pub fn clear(&mut self) {
        self.observers.clear();
    }
}

impl std::fmt::Debug for NotificationHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationHub")
            .field("observers", &self.observers.len())
            .finish()
    }
}
