//! Relay client
//!
//! Dispatches application requests through the selected relay, with a single
//! failover hop when the relay itself misbehaves.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, instrument, warn};

use crate::{
    error::{RelayError, RelayResult},
    relay::{RelayDescriptor, RelayRequest, RelaySelector, RequestOptions, RequestTransformer},
    routes::metrics,
};

/// Sends requests to the upstream API through relays
pub struct RelayClient {
    client: reqwest::Client,
    selector: Arc<RelaySelector>,
    transformer: RequestTransformer,
}

impl RelayClient {
    pub fn new(
        client: reqwest::Client,
        selector: Arc<RelaySelector>,
        transformer: RequestTransformer,
    ) -> Self {
        Self {
            client,
            selector,
            transformer,
        }
    }

    pub fn selector(&self) -> &Arc<RelaySelector> {
        &self.selector
    }

    pub fn transformer(&self) -> &RequestTransformer {
        &self.transformer
    }

    /// Rewrite a request for `relay` (or the default relay)
    ///
    /// An unknown relay falls back to the default once. `NoHealthyRelay`
    /// when nothing resolves.
    pub fn transform_request(
        &self,
        relay: Option<&str>,
        target: &str,
        options: RequestOptions,
    ) -> RelayResult<(RelayDescriptor, RelayRequest)> {
        let descriptor = self
            .selector
            .get_default_or_named(relay)
            .ok_or(RelayError::NoHealthyRelay)?;
        let request = self.transformer.apply(&descriptor, target, options)?;
        Ok((descriptor, request))
    }

    /// GraphQL URL for `relay` (or the default relay)
    pub fn graphql_endpoint(&self, relay: Option<&str>) -> RelayResult<String> {
        let descriptor = self
            .selector
            .get_default_or_named(relay)
            .ok_or(RelayError::NoHealthyRelay)?;
        Ok(self.transformer.graphql_endpoint(&descriptor))
    }

    /// Send `target` through a relay
    ///
    /// A transport error or a 5xx answer marks the relay unhealthy and the
    /// request is retried once on the next healthy relay. Upstream 4xx
    /// answers are returned as-is.
    #[instrument(skip(self, options), fields(target = %target))]
    pub async fn send(
        &self,
        target: &str,
        options: RequestOptions,
        relay: Option<&str>,
    ) -> RelayResult<reqwest::Response> {
        let (descriptor, request) = self.transform_request(relay, target, options.clone())?;

        let failure = match self.dispatch(&descriptor, request).await {
            Ok(response) => return Ok(response),
            Err(e) => e,
        };

        self.selector.registry().mark_unhealthy(&descriptor.endpoint);

        let Some(retry) = self.selector.next_healthy_after(&descriptor.endpoint) else {
            debug!(failed_relay = %descriptor.endpoint, "No alternative relay for retry");
            return Err(failure);
        };

        info!(
            failed_relay = %descriptor.endpoint,
            retry_relay = %retry.endpoint,
            "Retrying request on alternative relay"
        );

        let request = self.transformer.apply(&retry, target, options)?;
        let result = self.dispatch(&retry, request).await;
        if result.is_err() {
            self.selector.registry().mark_unhealthy(&retry.endpoint);
        }
        result
    }

    async fn dispatch(
        &self,
        relay: &RelayDescriptor,
        request: RelayRequest,
    ) -> RelayResult<reqwest::Response> {
        let start = Instant::now();
        debug!(
            relay = %relay.endpoint,
            url = %request.url,
            method = %request.method,
            "Dispatching request through relay"
        );

        let mut builder = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                error!(relay = %relay.endpoint, error = %e, "Relay request failed");
                metrics::record_dispatch(&relay.endpoint, "transport_error");
                return Err(e.into());
            }
        };

        let status = response.status();
        let latency_ms = start.elapsed().as_millis() as u64;

        if status.is_server_error() {
            let text = response.text().await.unwrap_or_default();
            warn!(
                relay = %relay.endpoint,
                status = %status,
                latency_ms,
                "Relay answered with server error"
            );
            metrics::record_dispatch(&relay.endpoint, "server_error");
            return Err(RelayError::UpstreamError(format!(
                "Relay {} error {}: {}",
                relay.endpoint, status, text
            )));
        }

        debug!(relay = %relay.endpoint, status = %status, latency_ms, "Relay responded");
        metrics::record_dispatch(&relay.endpoint, "ok");
        Ok(response)
    }
}
