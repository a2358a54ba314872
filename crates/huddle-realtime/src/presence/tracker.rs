//! Presence tracker — per-organization connection counts and activity.
//!
//! Each mutating operation reports whether the externally visible presence
//! view changed, so callers broadcast only on real transitions: a second
//! tab opening, or an activity refresh while already online, stays silent.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use huddle_core::types::id::{OrganizationId, UserId};

use super::status::PresenceStatus;

/// Presence state for one user within one organization.
///
/// Invariant: `connection_count` equals the number of live subscriptions
/// for the (org, user) pair; entries are removed when it reaches zero, so
/// a stored count is always positive.
#[derive(Debug, Clone, Copy)]
struct PresenceEntry {
    /// Number of live connections.
    connection_count: u32,
    /// Last explicit activity signal.
    last_activity: DateTime<Utc>,
}

impl PresenceEntry {
    fn status(&self, now: DateTime<Utc>, away_timeout: Duration) -> PresenceStatus {
        if now - self.last_activity > away_timeout {
            PresenceStatus::Away
        } else {
            PresenceStatus::Online
        }
    }
}

/// Tracks presence for every organization served by this process.
#[derive(Debug)]
pub struct PresenceTracker {
    /// Organization → (user → entry).
    orgs: DashMap<OrganizationId, DashMap<UserId, PresenceEntry>>,
    /// Silence window after which a connected user shows as away.
    away_timeout: Duration,
}

impl PresenceTracker {
    /// Create a tracker with the given away timeout in seconds.
    pub fn new(away_timeout_seconds: u64) -> Self {
        Self {
            orgs: DashMap::new(),
            away_timeout: Duration::seconds(away_timeout_seconds as i64),
        }
    }

    /// Record a new connection for the user.
    ///
    /// Returns `true` iff the user just came online (previous count was 0),
    /// meaning the organization's presence view changed.
    pub fn connect(&self, org: OrganizationId, user: UserId) -> bool {
        let users = self.orgs.entry(org).or_default();
        let mut entry = users.entry(user).or_insert_with(|| PresenceEntry {
            connection_count: 0,
            last_activity: Utc::now(),
        });
        // An extra tab from an away user does not count as activity; only
        // an explicit activity signal pulls them back to online.
        entry.connection_count += 1;
        entry.connection_count == 1
    }

    /// Record a closed connection for the user.
    ///
    /// Returns `true` iff this was the user's last connection (the view
    /// changed to offline). Safe to call for an unknown user.
    pub fn disconnect(&self, org: OrganizationId, user: UserId) -> bool {
        let Some(users) = self.orgs.get(&org) else {
            return false;
        };

        let went_offline = match users.get_mut(&user) {
            Some(mut entry) => {
                entry.connection_count = entry.connection_count.saturating_sub(1);
                entry.connection_count == 0
            }
            None => false,
        };

        if went_offline {
            users.remove(&user);
        }
        went_offline
    }

    /// Refresh the user's activity timestamp.
    ///
    /// Returns `true` iff the user was away and this signal pulls them back
    /// to online. A refresh while already online is a no-op for observers,
    /// which bounds broadcast volume to real transitions.
    pub fn record_activity(&self, org: OrganizationId, user: UserId) -> bool {
        let Some(users) = self.orgs.get(&org) else {
            return false;
        };
        let Some(mut entry) = users.get_mut(&user) else {
            return false;
        };

        let now = Utc::now();
        let was_away = entry.status(now, self.away_timeout) == PresenceStatus::Away;
        entry.last_activity = now;
        was_away
    }

    /// Current presence view for an organization.
    ///
    /// Pure computation over the in-memory entries; users without a live
    /// connection are absent (externally offline). Staleness is bounded by
    /// the away timeout only.
    pub fn snapshot(&self, org: OrganizationId) -> HashMap<UserId, PresenceStatus> {
        let now = Utc::now();
        self.orgs
            .get(&org)
            .map(|users| {
                users
                    .iter()
                    .map(|entry| (*entry.key(), entry.value().status(now, self.away_timeout)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Derived status for a single user.
    pub fn status_of(&self, org: OrganizationId, user: UserId) -> PresenceStatus {
        let now = Utc::now();
        self.orgs
            .get(&org)
            .and_then(|users| {
                users
                    .get(&user)
                    .map(|entry| entry.status(now, self.away_timeout))
            })
            .unwrap_or(PresenceStatus::Offline)
    }

    /// Number of users currently shown as connected in an organization.
    pub fn online_count(&self, org: OrganizationId) -> usize {
        self.orgs.get(&org).map(|users| users.len()).unwrap_or(0)
    }

    /// Drop all presence state.
    pub fn clear(&self) {
        self.orgs.clear();
    }

    #[cfg(test)]
    pub(crate) fn connection_count(&self, org: OrganizationId, user: UserId) -> u32 {
        self.orgs
            .get(&org)
            .and_then(|users| users.get(&user).map(|e| e.connection_count))
            .unwrap_or(0)
    }

    #[cfg(test)]
    pub(crate) fn backdate_activity(&self, org: OrganizationId, user: UserId, seconds: i64) {
        if let Some(users) = self.orgs.get(&org) {
            if let Some(mut entry) = users.get_mut(&user) {
                entry.last_activity = Utc::now() - Duration::seconds(seconds);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AWAY_SECS: u64 = 300;

    #[test]
    fn connect_reports_change_only_from_zero() {
        let tracker = PresenceTracker::new(AWAY_SECS);
        let org = OrganizationId::new();
        let user = UserId::new();

        assert!(tracker.connect(org, user));
        assert!(!tracker.connect(org, user));
        assert_eq!(tracker.connection_count(org, user), 2);
    }

    #[test]
    fn disconnect_reports_change_only_at_zero() {
        let tracker = PresenceTracker::new(AWAY_SECS);
        let org = OrganizationId::new();
        let user = UserId::new();
        tracker.connect(org, user);
        tracker.connect(org, user);

        assert!(!tracker.disconnect(org, user));
        assert!(tracker.disconnect(org, user));
        assert_eq!(tracker.status_of(org, user), PresenceStatus::Offline);
    }

    #[test]
    fn count_never_goes_negative() {
        let tracker = PresenceTracker::new(AWAY_SECS);
        let org = OrganizationId::new();
        let user = UserId::new();

        assert!(!tracker.disconnect(org, user));
        tracker.connect(org, user);
        tracker.disconnect(org, user);
        assert!(!tracker.disconnect(org, user));
        assert_eq!(tracker.connection_count(org, user), 0);
    }

    #[test]
    fn count_tracks_connect_disconnect_sequences() {
        let tracker = PresenceTracker::new(AWAY_SECS);
        let org = OrganizationId::new();
        let user = UserId::new();

        for _ in 0..5 {
            tracker.connect(org, user);
        }
        for _ in 0..3 {
            tracker.disconnect(org, user);
        }
        assert_eq!(tracker.connection_count(org, user), 2);
        assert_eq!(tracker.status_of(org, user), PresenceStatus::Online);
    }

    #[test]
    fn silent_user_degrades_to_away() {
        let tracker = PresenceTracker::new(AWAY_SECS);
        let org = OrganizationId::new();
        let user = UserId::new();
        tracker.connect(org, user);

        tracker.backdate_activity(org, user, AWAY_SECS as i64 + 1);
        assert_eq!(tracker.status_of(org, user), PresenceStatus::Away);

        let snapshot = tracker.snapshot(org);
        assert_eq!(snapshot.get(&user), Some(&PresenceStatus::Away));
    }

    #[test]
    fn activity_rearms_away_and_reports_transition() {
        let tracker = PresenceTracker::new(AWAY_SECS);
        let org = OrganizationId::new();
        let user = UserId::new();
        tracker.connect(org, user);

        // Online → online refresh stays silent.
        assert!(!tracker.record_activity(org, user));

        tracker.backdate_activity(org, user, AWAY_SECS as i64 + 1);
        assert!(tracker.record_activity(org, user));
        assert_eq!(tracker.status_of(org, user), PresenceStatus::Online);
    }

    #[test]
    fn snapshot_excludes_disconnected_users() {
        let tracker = PresenceTracker::new(AWAY_SECS);
        let org = OrganizationId::new();
        let online = UserId::new();
        let gone = UserId::new();
        tracker.connect(org, online);
        tracker.connect(org, gone);
        tracker.disconnect(org, gone);

        let snapshot = tracker.snapshot(org);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.get(&online), Some(&PresenceStatus::Online));
        assert!(!snapshot.contains_key(&gone));
    }

    #[test]
    fn organizations_are_isolated() {
        let tracker = PresenceTracker::new(AWAY_SECS);
        let org_a = OrganizationId::new();
        let org_b = OrganizationId::new();
        let user = UserId::new();
        tracker.connect(org_a, user);

        assert_eq!(tracker.status_of(org_a, user), PresenceStatus::Online);
        assert_eq!(tracker.status_of(org_b, user), PresenceStatus::Offline);
        assert!(tracker.snapshot(org_b).is_empty());
    }
}
