//! Typing-state aggregation.
//!
//! Typing indicators are soft state: entries live in a per-scope map on
//! the client and expire locally after a short silence window, with no
//! server round trip. A 2s sweep tick purges anything older than 4s and
//! reports which scopes need their label re-rendered.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use uuid::Uuid;

/// How long a typing entry survives without a refresh.
pub const TYPING_TTL: Duration = Duration::from_millis(4_000);

/// How often the sweep tick runs.
pub const SWEEP_INTERVAL: Duration = Duration::from_millis(2_000);

/// A typing scope: one channel or DM session, optionally narrowed to a
/// thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeKey {
    /// Channel or DM session id.
    pub conversation: Uuid,
    /// Thread within the conversation, if any.
    pub thread: Option<Uuid>,
}

/// An inbound typing signal, already parsed from the wire.
#[derive(Debug, Clone)]
pub struct TypingSignal {
    /// Scope of the signal.
    pub scope: ScopeKey,
    /// Who is typing.
    pub user_id: Uuid,
    /// Display name rendered in the label.
    pub user_name: String,
    /// `false` when the user explicitly stopped.
    pub is_typing: bool,
}

#[derive(Debug, Clone)]
struct TypingEntry {
    name: String,
    last_updated: Instant,
}

/// Aggregates typing signals per scope and renders indicator labels.
#[derive(Debug, Default)]
pub struct TypingTracker {
    scopes: HashMap<ScopeKey, HashMap<Uuid, TypingEntry>>,
}

impl TypingTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a typing signal at the given time.
    ///
    /// Returns `true` when the scope's rendered label changed.
    pub fn apply(&mut self, signal: TypingSignal, at: Instant) -> bool {
        let before = self.label(signal.scope);

        if signal.is_typing {
            self.scopes
                .entry(signal.scope)
                .or_default()
                .insert(
                    signal.user_id,
                    TypingEntry {
                        name: signal.user_name,
                        last_updated: at,
                    },
                );
        } else if let Some(users) = self.scopes.get_mut(&signal.scope) {
            users.remove(&signal.user_id);
            if users.is_empty() {
                self.scopes.remove(&signal.scope);
            }
        }

        self.label(signal.scope) != before
    }

    /// Purge entries older than [`TYPING_TTL`] as of `now`.
    ///
    /// Returns the scopes whose rendered label changed, so only those get
    /// re-rendered.
    pub fn sweep(&mut self, now: Instant) -> Vec<ScopeKey> {
        let mut changed = Vec::new();

        self.scopes.retain(|scope, users| {
            let before = Self::render(users);
            users.retain(|_, entry| now.duration_since(entry.last_updated) < TYPING_TTL);
            if Self::render(users) != before {
                changed.push(*scope);
            }
            !users.is_empty()
        });

        changed
    }

    /// Render the indicator label for a scope.
    pub fn label(&self, scope: ScopeKey) -> String {
        self.scopes
            .get(&scope)
            .map(Self::render)
            .unwrap_or_default()
    }

    /// Users currently typing in a scope.
    pub fn typing_count(&self, scope: ScopeKey) -> usize {
        self.scopes.get(&scope).map(HashMap::len).unwrap_or(0)
    }

    fn render(users: &HashMap<Uuid, TypingEntry>) -> String {
        let mut names: Vec<&str> = users.values().map(|e| e.name.as_str()).collect();
        names.sort_unstable();

        match names.len() {
            0 => String::new(),
            1 => format!("{} is typing...", names[0]),
            2 => format!("{} and {} are typing...", names[0], names[1]),
            n => format!(
                "{}, {}, and {} others are typing...",
                names[0],
                names[1],
                n - 2
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(scope: ScopeKey, name: &str, is_typing: bool) -> TypingSignal {
        TypingSignal {
            scope,
            user_id: Uuid::new_v4(),
            user_name: name.to_string(),
            is_typing,
        }
    }

    fn scope() -> ScopeKey {
        ScopeKey {
            conversation: Uuid::new_v4(),
            thread: None,
        }
    }

    #[test]
    fn empty_scope_renders_empty_label() {
        let tracker = TypingTracker::new();
        assert_eq!(tracker.label(scope()), "");
    }

    #[test]
    fn single_user_label() {
        let mut tracker = TypingTracker::new();
        let s = scope();
        tracker.apply(signal(s, "ada", true), Instant::now());
        assert_eq!(tracker.label(s), "ada is typing...");
    }

    #[test]
    fn two_user_label() {
        let mut tracker = TypingTracker::new();
        let s = scope();
        let now = Instant::now();
        tracker.apply(signal(s, "bob", true), now);
        tracker.apply(signal(s, "ada", true), now);
        assert_eq!(tracker.label(s), "ada and bob are typing...");
    }

    #[test]
    fn many_user_label_counts_the_rest() {
        let mut tracker = TypingTracker::new();
        let s = scope();
        let now = Instant::now();
        for name in ["carol", "ada", "bob", "dan", "erin"] {
            tracker.apply(signal(s, name, true), now);
        }
        assert_eq!(tracker.label(s), "ada, bob, and 3 others are typing...");
    }

    #[test]
    fn stop_signal_removes_the_user() {
        let mut tracker = TypingTracker::new();
        let s = scope();
        let now = Instant::now();
        let mut sig = signal(s, "ada", true);
        tracker.apply(sig.clone(), now);

        sig.is_typing = false;
        assert!(tracker.apply(sig, now));
        assert_eq!(tracker.label(s), "");
        assert_eq!(tracker.typing_count(s), 0);
    }

    #[test]
    fn sweep_purges_stale_entries_and_reports_change() {
        let mut tracker = TypingTracker::new();
        let s = scope();
        let start = Instant::now();
        tracker.apply(signal(s, "ada", true), start);

        // Within the window: nothing changes.
        let changed = tracker.sweep(start + Duration::from_millis(2_000));
        assert!(changed.is_empty());
        assert_eq!(tracker.label(s), "ada is typing...");

        // Next tick crosses the 4s threshold.
        let changed = tracker.sweep(start + Duration::from_millis(4_000));
        assert_eq!(changed, vec![s]);
        assert_eq!(tracker.label(s), "");
    }

    #[test]
    fn refresh_extends_the_window() {
        let mut tracker = TypingTracker::new();
        let s = scope();
        let start = Instant::now();
        let user = Uuid::new_v4();

        let refresh = TypingSignal {
            scope: s,
            user_id: user,
            user_name: "ada".to_string(),
            is_typing: true,
        };
        tracker.apply(refresh.clone(), start);
        tracker.apply(refresh, start + Duration::from_millis(3_000));

        let changed = tracker.sweep(start + Duration::from_millis(6_000));
        assert!(changed.is_empty());
        assert_eq!(tracker.label(s), "ada is typing...");
    }

    #[test]
    fn threads_are_separate_scopes() {
        let mut tracker = TypingTracker::new();
        let conversation = Uuid::new_v4();
        let root = ScopeKey {
            conversation,
            thread: None,
        };
        let thread = ScopeKey {
            conversation,
            thread: Some(Uuid::new_v4()),
        };
        let now = Instant::now();
        tracker.apply(signal(thread, "ada", true), now);

        assert_eq!(tracker.label(root), "");
        assert_eq!(tracker.label(thread), "ada is typing...");
    }
}
