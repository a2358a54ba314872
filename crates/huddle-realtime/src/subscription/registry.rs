//! Subscription registry — tracks all live subscriptions.
//!
//! The registry only stores; authorization happens during the handshake
//! before [`SubscriptionRegistry::insert`] is ever called. Removal is
//! idempotent so that a double close (socket teardown racing the reap
//! pass) is harmless.

use std::sync::Arc;

use dashmap::DashMap;

use huddle_core::types::id::{OrganizationId, UserId};

use super::handle::{SubscriptionHandle, SubscriptionId};

/// Thread-safe registry of all live subscriptions.
///
/// Mutated from three independent task sources (socket tasks, the heartbeat
/// timer, the event pump), hence the concurrent map.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    /// Subscription ID → handle.
    by_id: DashMap<SubscriptionId, Arc<SubscriptionHandle>>,
}

impl SubscriptionRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self {
            by_id: DashMap::new(),
        }
    }

    /// Adds a subscription to the registry.
    pub fn insert(&self, handle: Arc<SubscriptionHandle>) {
        self.by_id.insert(handle.id, handle);
    }

    /// Removes a subscription. Returns `None` when it was already gone.
    pub fn remove(&self, id: &SubscriptionId) -> Option<Arc<SubscriptionHandle>> {
        self.by_id.remove(id).map(|(_, handle)| handle)
    }

    /// Gets a subscription by ID.
    pub fn get(&self, id: &SubscriptionId) -> Option<Arc<SubscriptionHandle>> {
        self.by_id.get(id).map(|entry| entry.value().clone())
    }

    /// Snapshot of every live subscription.
    ///
    /// Broadcast loops iterate the snapshot, so a socket closing mid-send is
    /// simply skipped by [`SubscriptionHandle::is_sendable`] and pruned by
    /// the next reap pass.
    pub fn all(&self) -> Vec<Arc<SubscriptionHandle>> {
        self.by_id
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Snapshot of the subscriptions scoped to one organization.
    pub fn for_org(&self, org: OrganizationId) -> Vec<Arc<SubscriptionHandle>> {
        self.by_id
            .iter()
            .filter(|entry| entry.value().organization_id == org)
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Number of subscriptions a user currently holds in an organization.
    pub fn count_for_user(&self, org: OrganizationId, user: UserId) -> usize {
        self.by_id
            .iter()
            .filter(|entry| {
                entry.value().organization_id == org && entry.value().user_id == user
            })
            .count()
    }

    /// Total number of live subscriptions.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Removes every subscription, returning the drained handles.
    pub fn drain(&self) -> Vec<Arc<SubscriptionHandle>> {
        let handles = self.all();
        self.by_id.clear();
        handles
    }
}
