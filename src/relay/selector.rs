//! Relay selection
//!
//! Picks the relay a request should go through. Two paths:
//! - `select_healthy_relay` probes every relay first (slow, fresh)
//! - `get_default_or_named` trusts the current health flags (fast)

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, instrument, warn};

use crate::routes::metrics;

use super::descriptor::RelayDescriptor;
use super::probe::HealthCheck;
use super::registry::RelayRegistry;

/// Health-aware relay selector
pub struct RelaySelector {
    registry: Arc<RelayRegistry>,
    probe: Arc<dyn HealthCheck>,
}

impl RelaySelector {
    pub fn new(registry: Arc<RelayRegistry>, probe: Arc<dyn HealthCheck>) -> Self {
        Self { registry, probe }
    }

    pub fn registry(&self) -> &Arc<RelayRegistry> {
        &self.registry
    }

    /// Probe every relay concurrently and record the results
    ///
    /// Returns the number of relays found healthy.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> usize {
        let relays = self.registry.snapshot();

        let results = join_all(relays.iter().map(|relay| async move {
            let healthy = self.probe.check(relay).await;
            self.registry.mark_healthy(&relay.endpoint, healthy);
            healthy
        }))
        .await;

        let healthy = results.iter().filter(|h| **h).count();
        debug!(total = relays.len(), healthy, "Relay health refreshed");
        healthy
    }

    /// Refresh health, then return the endpoint of the best healthy relay
    ///
    /// `None` means every relay is currently unhealthy.
    pub async fn select_healthy_relay(&self) -> Option<String> {
        self.refresh().await;

        match self.registry.first_healthy() {
            Some(relay) => {
                info!(relay = %relay.endpoint, priority = relay.priority, "Selected healthy relay");
                metrics::record_selection("selected");
                Some(relay.endpoint)
            }
            None => {
                warn!(total = self.registry.len(), "No healthy relay available");
                metrics::record_selection("none");
                None
            }
        }
    }

    /// Relay named by `endpoint`, or the default relay
    ///
    /// Uses the current health flags without probing. An unknown endpoint
    /// falls back to the default once; there is no further retry.
    pub fn get_default_or_named(&self, endpoint: Option<&str>) -> Option<RelayDescriptor> {
        match endpoint {
            None => self.registry.first_healthy(),
            Some(endpoint) => self.registry.resolve_by_url(endpoint),
        }
    }

    /// Best healthy relay other than `failed`, using current flags
    pub fn next_healthy_after(&self, failed: &str) -> Option<RelayDescriptor> {
        self.registry
            .ordered_by_priority()
            .into_iter()
            .find(|r| r.healthy && r.endpoint != failed)
    }
}
