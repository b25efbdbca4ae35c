//! Relaygate - relay failover for reaching cross-origin APIs
//!
//! This library keeps a prioritized list of CORS relays, probes their
//! liveness, picks the best live one and rewrites requests into the shape
//! each relay expects.

pub mod client;
pub mod config;
pub mod error;
pub mod relay;
pub mod routes;

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;

pub use crate::client::RelayClient;
pub use crate::config::Config;
pub use crate::error::{RelayError, RelayResult};
pub use crate::relay::{
    HealthCheck, HealthMonitor, HttpHealthProbe, ProbeFailure, RelayDescriptor, RelayKind,
    RelayRegistry, RelayRequest, RelaySelector, RequestOptions, RequestTransformer, UpstreamApi,
};

/// Application state shared across all request handlers
pub struct AppState {
    pub config: Config,
    pub start_time: Instant,
    pub registry: Arc<RelayRegistry>,
    pub selector: Arc<RelaySelector>,
    pub relay_client: Arc<RelayClient>,
}

impl AppState {
    /// Create a new application state
    pub fn new(config: Config) -> Result<Self> {
        // Probes carry their own timeout, this one bounds dispatched requests
        let http_client = reqwest::Client::builder()
            .pool_max_idle_per_host(10)
            .timeout(config.request_timeout())
            .build()?;

        let probe: Arc<dyn HealthCheck> = Arc::new(HttpHealthProbe::with_timeout(
            http_client.clone(),
            config.upstream(),
            config.probe_timeout(),
        ));

        Ok(Self::with_probe(config, http_client, probe))
    }

    /// Create a state around a custom health check
    pub fn with_probe(
        config: Config,
        http_client: reqwest::Client,
        probe: Arc<dyn HealthCheck>,
    ) -> Self {
        let registry = Arc::new(RelayRegistry::new(config.relay_descriptors()));
        let selector = Arc::new(RelaySelector::new(registry.clone(), probe));
        let relay_client = Arc::new(RelayClient::new(
            http_client,
            selector.clone(),
            RequestTransformer::new(config.upstream()),
        ));

        Self {
            config,
            start_time: Instant::now(),
            registry,
            selector,
            relay_client,
        }
    }
}
