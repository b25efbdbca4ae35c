//! Relay registry
//!
//! Holds the fixed set of relay descriptors and their health flags. The set
//! is built once; afterwards only `healthy` and `last_checked_at` change.
//!
//! Locks are held only for the in-memory read or write and never across an
//! await, so a reader can see some probes applied and others still in flight.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use tracing::{debug, info, warn};

use super::descriptor::RelayDescriptor;

/// Ordered collection of relay descriptors with mutable health state
pub struct RelayRegistry {
    relays: RwLock<Vec<RelayDescriptor>>,
}

impl RelayRegistry {
    /// Create a registry from a fixed relay list
    pub fn new(mut relays: Vec<RelayDescriptor>) -> Self {
        relays.sort_by_key(|r| r.priority);
        Self {
            relays: RwLock::new(relays),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<RelayDescriptor>> {
        self.relays.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<RelayDescriptor>> {
        self.relays.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Copy of every descriptor, in priority order
    pub fn snapshot(&self) -> Vec<RelayDescriptor> {
        self.read().clone()
    }

    /// Descriptors sorted ascending by priority (stable)
    pub fn ordered_by_priority(&self) -> Vec<RelayDescriptor> {
        let mut relays = self.snapshot();
        relays.sort_by_key(|r| r.priority);
        relays
    }

    /// Highest-priority descriptor currently flagged healthy
    pub fn first_healthy(&self) -> Option<RelayDescriptor> {
        self.ordered_by_priority().into_iter().find(|r| r.healthy)
    }

    /// Descriptor whose endpoint is a prefix of `url`, without any fallback
    pub fn find_by_prefix(&self, url: &str) -> Option<RelayDescriptor> {
        self.read().iter().find(|r| r.matches(url)).cloned()
    }

    /// Resolve `url` to a relay, falling back to the default relay
    ///
    /// The fallback is a single hop: if nothing matches and no relay is
    /// healthy (or the registry is empty) the result is `None`.
    pub fn resolve_by_url(&self, url: &str) -> Option<RelayDescriptor> {
        if let Some(relay) = self.find_by_prefix(url) {
            debug!(url = %url, relay = %relay.endpoint, "Resolved relay by prefix");
            return Some(relay);
        }

        let fallback = self.first_healthy();
        match &fallback {
            Some(relay) => warn!(
                url = %url,
                relay = %relay.endpoint,
                "Unknown relay, falling back to default"
            ),
            None => warn!(url = %url, "Unknown relay and no default available"),
        }
        fallback
    }

    /// Set the health flag of the relay matching `endpoint`
    ///
    /// No-op when nothing matches.
    pub fn mark_healthy(&self, endpoint: &str, healthy: bool) {
        let mut relays = self.write();
        let Some(relay) = relays.iter_mut().find(|r| r.matches(endpoint)) else {
            debug!(endpoint = %endpoint, "Health update for unknown relay ignored");
            return;
        };

        if relay.healthy != healthy {
            info!(
                relay = %relay.endpoint,
                healthy,
                "Relay health changed"
            );
        }
        relay.healthy = healthy;
        relay.last_checked_at = Some(Utc::now());
    }

    pub fn mark_unhealthy(&self, endpoint: &str) {
        self.mark_healthy(endpoint, false);
    }

    /// Flag every relay healthy again
    pub fn mark_all_healthy(&self) {
        let now = Utc::now();
        let mut relays = self.write();
        for relay in relays.iter_mut() {
            relay.healthy = true;
            relay.last_checked_at = Some(now);
        }
        info!(relays = relays.len(), "Reset all relay health statuses");
    }
}
