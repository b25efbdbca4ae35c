//! Configuration management for Relaygate
//!
//! Configuration is loaded from environment variables.

use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

use crate::relay::{RelayDescriptor, RelayKind, UpstreamApi};

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Host to bind the status server to
    pub host: String,
    /// Port to listen on
    pub port: u16,

    /// Base URL of the wrapped API
    pub upstream_api_url: String,
    /// Path of the single GraphQL endpoint
    pub upstream_graphql_path: String,
    /// Path used by health probes
    pub upstream_status_path: String,
    /// Origin presented to relays that check Origin/Referer
    pub site_origin: String,

    /// Path-prefix (worker) relay endpoint
    pub worker_relay_url: String,
    /// Query-parameter (AllOrigins) relay endpoint
    pub allorigins_relay_url: String,

    /// Upper bound for a single health probe (in seconds)
    pub probe_timeout_seconds: u64,
    /// Interval between background health refreshes (in seconds)
    pub health_check_interval_seconds: u64,
    /// Timeout for requests dispatched through a relay (in seconds)
    pub request_timeout_seconds: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: env::var("RELAYGATE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("RELAYGATE_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("Invalid RELAYGATE_PORT")?,

            upstream_api_url: env::var("UPSTREAM_API_URL")
                .unwrap_or_else(|_| "https://api.meetup.com".to_string()),
            upstream_graphql_path: env::var("UPSTREAM_GRAPHQL_PATH")
                .unwrap_or_else(|_| "/gql".to_string()),
            upstream_status_path: env::var("UPSTREAM_STATUS_PATH")
                .unwrap_or_else(|_| "/status".to_string()),
            site_origin: env::var("RELAY_SITE_ORIGIN")
                .unwrap_or_else(|_| "https://yashrajnayak.github.io".to_string()),

            worker_relay_url: env::var("WORKER_RELAY_URL")
                .unwrap_or_else(|_| "https://meetup-proxy.oneyashraj.workers.dev".to_string()),
            allorigins_relay_url: env::var("ALLORIGINS_RELAY_URL")
                .unwrap_or_else(|_| "https://api.allorigins.win/raw".to_string()),

            probe_timeout_seconds: env::var("PROBE_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("Invalid PROBE_TIMEOUT_SECONDS")?,
            health_check_interval_seconds: env::var("HEALTH_CHECK_INTERVAL_SECONDS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .context("Invalid HEALTH_CHECK_INTERVAL_SECONDS")?,
            request_timeout_seconds: env::var("REQUEST_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .context("Invalid REQUEST_TIMEOUT_SECONDS")?,
        })
    }

    /// Description of the wrapped API shared by probes and transforms
    pub fn upstream(&self) -> UpstreamApi {
        UpstreamApi {
            base_url: self.upstream_api_url.trim_end_matches('/').to_string(),
            graphql_path: self.upstream_graphql_path.clone(),
            status_path: self.upstream_status_path.clone(),
            site_origin: self.site_origin.trim_end_matches('/').to_string(),
        }
    }

    /// The fixed relay list, in priority order
    pub fn relay_descriptors(&self) -> Vec<RelayDescriptor> {
        vec![
            RelayDescriptor::new(&self.worker_relay_url, 1, true, RelayKind::PathPrefix),
            RelayDescriptor::new(&self.allorigins_relay_url, 2, false, RelayKind::QueryParam),
        ]
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_seconds)
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_secs(self.health_check_interval_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}
