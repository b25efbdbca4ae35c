//! Relay liveness probing
//!
//! A probe sends a cheap status request to the upstream API through a relay,
//! shaped the way that relay expects, and reduces the outcome to a boolean.
//! Probes never fail and never touch the registry; the selector writes the
//! results back.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCESS_CONTROL_REQUEST_HEADERS,
    ACCESS_CONTROL_REQUEST_METHOD, CONTENT_TYPE, ORIGIN, REFERER,
};
use reqwest::{Method, StatusCode};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::routes::metrics;

use super::descriptor::{RelayDescriptor, RelayKind, UpstreamApi};
use super::transform::{inline_target_url, X_REQUESTED_WITH};

/// Default upper bound for one probe, connect to last body byte
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Content types a live relay answers with
const ACCEPTED_CONTENT_TYPES: &[&str] = &["application/json", "text/plain", "text/html"];

/// Answers "is this relay usable right now?"
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn check(&self, relay: &RelayDescriptor) -> bool;
}

/// Why a probe judged a relay unhealthy
#[derive(Debug, Error)]
pub enum ProbeFailure {
    #[error("request failed: {0}")]
    Network(#[source] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(StatusCode),

    #[error("unexpected content type {0:?}")]
    ContentType(Option<String>),

    #[error("failed to read body: {0}")]
    Body(#[source] reqwest::Error),

    #[error("body is neither JSON nor a status marker")]
    UnrecognizedBody,

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid probe header: {0}")]
    InvalidHeader(String),
}

/// Per-relay description of the probe request
#[derive(Debug, Clone)]
pub struct ProbePlan {
    pub url: String,
    pub method: Method,
    pub headers: HeaderMap,
    /// Reported in the probe log only; the probe sends no cookies
    pub include_credentials: bool,
    /// Relay guarantees that any readable answer means upstream was reached
    pub accepts_any_body: bool,
}

impl ProbePlan {
    /// Build the probe for `relay`
    pub fn for_relay(relay: &RelayDescriptor, upstream: &UpstreamApi) -> Result<Self, ProbeFailure> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        match relay.kind {
            RelayKind::PathPrefix => {
                headers.insert(ACCESS_CONTROL_REQUEST_METHOD, HeaderValue::from_static("POST"));
                headers.insert(
                    ACCESS_CONTROL_REQUEST_HEADERS,
                    HeaderValue::from_static("authorization,content-type,origin,referer"),
                );
                headers.insert(ORIGIN, probe_header(&upstream.site_origin)?);
                headers.insert(REFERER, probe_header(&upstream.referer())?);

                Ok(Self {
                    url: format!("{}/proxy{}", relay.endpoint, upstream.status_path),
                    method: Method::OPTIONS,
                    headers,
                    include_credentials: true,
                    accepts_any_body: false,
                })
            }
            // No OPTIONS support on this relay, so a plain XHR-style GET.
            RelayKind::QueryParam => {
                headers.insert(X_REQUESTED_WITH, HeaderValue::from_static("XMLHttpRequest"));

                Ok(Self {
                    url: inline_target_url(&relay.endpoint, &upstream.url_for(&upstream.status_path)),
                    method: Method::GET,
                    headers,
                    include_credentials: false,
                    accepts_any_body: true,
                })
            }
        }
    }

    /// A preflight answered with 200 or 204 is enough, no body expected
    pub fn is_preflight_success(&self, status: StatusCode) -> bool {
        self.method == Method::OPTIONS
            && (status == StatusCode::OK || status == StatusCode::NO_CONTENT)
    }

    /// Judge a fully read body
    pub fn accepts_body(&self, body: &str) -> bool {
        if self.accepts_any_body {
            return true;
        }
        serde_json::from_str::<serde_json::Value>(body).is_ok()
            || body.contains("status")
            || body.contains("ok")
    }
}

/// Whether a `content-type` header value is one a live relay sends
pub fn is_accepted_content_type(content_type: Option<&str>) -> bool {
    content_type
        .map(|ct| ACCEPTED_CONTENT_TYPES.iter().any(|accepted| ct.contains(accepted)))
        .unwrap_or(false)
}

fn probe_header(value: &str) -> Result<HeaderValue, ProbeFailure> {
    HeaderValue::from_str(value).map_err(|_| ProbeFailure::InvalidHeader(value.to_string()))
}

/// Health probe backed by reqwest
pub struct HttpHealthProbe {
    client: reqwest::Client,
    upstream: UpstreamApi,
    timeout: Duration,
}

impl HttpHealthProbe {
    pub fn new(client: reqwest::Client, upstream: UpstreamApi) -> Self {
        Self::with_timeout(client, upstream, DEFAULT_PROBE_TIMEOUT)
    }

    pub fn with_timeout(client: reqwest::Client, upstream: UpstreamApi, timeout: Duration) -> Self {
        Self {
            client,
            upstream,
            timeout,
        }
    }

    /// Run the probe for `relay`, reporting why it failed
    #[instrument(skip(self, relay), fields(relay = %relay.endpoint))]
    pub async fn probe(&self, relay: &RelayDescriptor) -> Result<(), ProbeFailure> {
        let plan = ProbePlan::for_relay(relay, &self.upstream)?;

        match tokio::time::timeout(self.timeout, self.execute(&plan)).await {
            Ok(result) => result,
            Err(_) => Err(ProbeFailure::Timeout(self.timeout)),
        }
    }

    async fn execute(&self, plan: &ProbePlan) -> Result<(), ProbeFailure> {
        debug!(
            url = %plan.url,
            method = %plan.method,
            credentials = plan.include_credentials,
            "Sending health probe"
        );

        let response = self
            .client
            .request(plan.method.clone(), &plan.url)
            .headers(plan.headers.clone())
            .send()
            .await
            .map_err(ProbeFailure::Network)?;

        let status = response.status();
        if plan.is_preflight_success(status) {
            return Ok(());
        }

        if !status.is_success() {
            return Err(ProbeFailure::Status(status));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        if !is_accepted_content_type(content_type.as_deref()) {
            return Err(ProbeFailure::ContentType(content_type));
        }

        let body = response.text().await.map_err(ProbeFailure::Body)?;
        if plan.accepts_body(&body) {
            Ok(())
        } else {
            Err(ProbeFailure::UnrecognizedBody)
        }
    }
}

#[async_trait]
impl HealthCheck for HttpHealthProbe {
    async fn check(&self, relay: &RelayDescriptor) -> bool {
        let start = Instant::now();
        let result = self.probe(relay).await;
        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(()) => {
                debug!(relay = %relay.endpoint, latency_ms, "Relay probe succeeded");
                metrics::record_probe(&relay.endpoint, "healthy");
                true
            }
            Err(e) => {
                warn!(
                    relay = %relay.endpoint,
                    latency_ms,
                    error = %e,
                    "Relay health check failed"
                );
                metrics::record_probe(&relay.endpoint, "unhealthy");
                false
            }
        }
    }
}
