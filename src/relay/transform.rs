//! Request rewriting for relays
//!
//! Turns the request an application means to send to the upstream API into
//! the concrete request a given relay expects. Every call is classified as
//! either the single GraphQL endpoint or a REST call against the base API,
//! then handed to the strategy owned by the relay's kind.
//!
//! Nothing in here performs I/O.

use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, ORIGIN, REFERER,
};
use reqwest::Method;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{RelayError, RelayResult};

use super::descriptor::{RelayDescriptor, RelayKind, UpstreamApi};

/// Header marking a request as XHR for relays that reject plain fetches
pub const X_REQUESTED_WITH: HeaderName = HeaderName::from_static("x-requested-with");

/// What the caller intends to send to the upstream API
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Defaults to GET for REST calls. Ignored for GraphQL.
    pub method: Option<Method>,
    pub headers: HeaderMap,
    pub body: Option<String>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// The concrete request to dispatch to a relay
#[derive(Debug, Clone)]
pub struct RelayRequest {
    pub url: String,
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<String>,
    /// Whether the relay expects cookies with the request. Reported only;
    /// the shared client keeps no cookie store and does not act on it.
    pub include_credentials: bool,
}

/// Shape of an upstream call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallKind {
    GraphQl,
    /// REST call, carrying the path (and query) relative to the base API
    Rest(String),
}

/// Relay-specific rewriting strategy
pub trait RelayTransform: Send + Sync {
    /// Rewrite a GraphQL call
    fn graphql(
        &self,
        endpoint: &str,
        upstream: &UpstreamApi,
        options: RequestOptions,
    ) -> RelayResult<RelayRequest>;

    /// Rewrite a REST call for `path` under the base API
    fn rest(
        &self,
        endpoint: &str,
        upstream: &UpstreamApi,
        path: &str,
        options: RequestOptions,
    ) -> RelayResult<RelayRequest>;

    /// URL GraphQL calls are posted to through this relay
    fn graphql_endpoint(&self, endpoint: &str, upstream: &UpstreamApi) -> String;
}

/// Worker-style relay: `{endpoint}/proxy{path}`
pub struct PathPrefixTransform;

/// AllOrigins-style relay: `{endpoint}?url={encoded target}`
pub struct QueryParamTransform;

impl RelayKind {
    /// Strategy implementing this kind's wire contract
    pub fn strategy(&self) -> &'static dyn RelayTransform {
        match self {
            RelayKind::PathPrefix => &PathPrefixTransform,
            RelayKind::QueryParam => &QueryParamTransform,
        }
    }
}

impl RelayTransform for PathPrefixTransform {
    fn graphql(
        &self,
        endpoint: &str,
        upstream: &UpstreamApi,
        options: RequestOptions,
    ) -> RelayResult<RelayRequest> {
        let mut headers = json_headers();
        if let Some(auth) = options.headers.get(AUTHORIZATION) {
            headers.insert(AUTHORIZATION, auth.clone());
        }

        let body = parse_graphql_body(options.body.as_deref())?;

        Ok(RelayRequest {
            url: self.graphql_endpoint(endpoint, upstream),
            method: Method::POST,
            headers,
            body: Some(Value::Object(body).to_string()),
            include_credentials: false,
        })
    }

    fn rest(
        &self,
        endpoint: &str,
        upstream: &UpstreamApi,
        path: &str,
        options: RequestOptions,
    ) -> RelayResult<RelayRequest> {
        let mut headers = options.headers;
        headers.extend(json_headers());
        headers.insert(ORIGIN, header_value(&upstream.site_origin)?);
        headers.insert(REFERER, header_value(&upstream.referer())?);

        Ok(RelayRequest {
            url: format!("{}/proxy{}", endpoint, path),
            method: options.method.unwrap_or(Method::GET),
            headers,
            body: options.body,
            include_credentials: true,
        })
    }

    fn graphql_endpoint(&self, endpoint: &str, upstream: &UpstreamApi) -> String {
        format!("{}/proxy{}", endpoint, upstream.graphql_path)
    }
}

impl RelayTransform for QueryParamTransform {
    fn graphql(
        &self,
        endpoint: &str,
        upstream: &UpstreamApi,
        options: RequestOptions,
    ) -> RelayResult<RelayRequest> {
        let mut body = parse_graphql_body(options.body.as_deref())?;

        // The relay drops custom headers, so the credential rides in the body.
        if let Some(auth) = options.headers.get(AUTHORIZATION) {
            match auth.to_str() {
                Ok(auth) => {
                    let token = auth.strip_prefix("Bearer ").unwrap_or(auth);
                    body.insert("authorization".to_string(), Value::String(token.to_string()));
                }
                Err(_) => warn!("Authorization header is not valid UTF-8, not embedding it"),
            }
        }

        Ok(RelayRequest {
            url: self.graphql_endpoint(endpoint, upstream),
            method: Method::POST,
            headers: json_headers(),
            body: Some(Value::Object(body).to_string()),
            include_credentials: false,
        })
    }

    fn rest(
        &self,
        endpoint: &str,
        upstream: &UpstreamApi,
        path: &str,
        options: RequestOptions,
    ) -> RelayResult<RelayRequest> {
        let mut headers = json_headers();
        headers.insert(X_REQUESTED_WITH, HeaderValue::from_static("XMLHttpRequest"));

        if options.body.is_some() {
            debug!(relay = %endpoint, "Dropping request body, relay only fetches the target");
        }

        Ok(RelayRequest {
            url: inline_target_url(endpoint, &upstream.url_for(path)),
            method: options.method.unwrap_or(Method::GET),
            headers,
            body: None,
            include_credentials: false,
        })
    }

    fn graphql_endpoint(&self, endpoint: &str, upstream: &UpstreamApi) -> String {
        inline_target_url(endpoint, &upstream.url_for(&upstream.graphql_path))
    }
}

/// Rewrites application requests into relay requests
#[derive(Debug, Clone)]
pub struct RequestTransformer {
    upstream: UpstreamApi,
}

impl RequestTransformer {
    pub fn new(upstream: UpstreamApi) -> Self {
        Self { upstream }
    }

    pub fn upstream(&self) -> &UpstreamApi {
        &self.upstream
    }

    /// Classify `target` as a GraphQL or REST call
    ///
    /// `target` may be a URL under the base API or an absolute path.
    pub fn classify(&self, target: &str) -> RelayResult<CallKind> {
        let path = self.relative_path(target)?;
        let path_only = path.split(['?', '#']).next().unwrap_or_default();

        if path_only.trim_end_matches('/').ends_with(&self.upstream.graphql_path) {
            Ok(CallKind::GraphQl)
        } else {
            Ok(CallKind::Rest(path))
        }
    }

    /// Rewrite `target` and `options` into the request `relay` expects
    pub fn apply(
        &self,
        relay: &RelayDescriptor,
        target: &str,
        options: RequestOptions,
    ) -> RelayResult<RelayRequest> {
        let strategy = relay.kind.strategy();
        let call = self.classify(target)?;

        debug!(
            relay = %relay.endpoint,
            kind = relay.kind.as_str(),
            target = %target,
            graphql = call == CallKind::GraphQl,
            "Transforming request for relay"
        );

        match call {
            CallKind::GraphQl => strategy.graphql(&relay.endpoint, &self.upstream, options),
            CallKind::Rest(path) => strategy.rest(&relay.endpoint, &self.upstream, &path, options),
        }
    }

    /// URL GraphQL calls are posted to through `relay`
    pub fn graphql_endpoint(&self, relay: &RelayDescriptor) -> String {
        relay
            .kind
            .strategy()
            .graphql_endpoint(&relay.endpoint, &self.upstream)
    }

    fn relative_path(&self, target: &str) -> RelayResult<String> {
        if let Some(rest) = target.strip_prefix(&self.upstream.base_url) {
            return match rest.chars().next() {
                None => Ok("/".to_string()),
                Some('/') => Ok(rest.to_string()),
                Some('?') => Ok(format!("/{}", rest)),
                Some(_) => Err(RelayError::InvalidTarget(target.to_string())),
            };
        }

        if target.starts_with('/') {
            return Ok(target.to_string());
        }

        Err(RelayError::InvalidTarget(target.to_string()))
    }
}

/// Percent-encode `target` into the relay's `url` query parameter
pub fn inline_target_url(endpoint: &str, target: &str) -> String {
    format!("{}?url={}", endpoint, urlencoding::encode(target))
}

fn json_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers
}

fn header_value(value: &str) -> RelayResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| RelayError::Internal(anyhow::anyhow!("Invalid header value {}: {}", value, e)))
}

/// Parse a GraphQL body and make sure it carries a query
fn parse_graphql_body(body: Option<&str>) -> RelayResult<Map<String, Value>> {
    let body = body.ok_or_else(|| RelayError::InvalidRequestBody("missing body".to_string()))?;

    let parsed: Value = serde_json::from_str(body).map_err(|e| {
        warn!(error = %e, "GraphQL body is not valid JSON");
        RelayError::InvalidRequestBody(format!("body is not valid JSON: {}", e))
    })?;

    let Value::Object(map) = parsed else {
        return Err(RelayError::InvalidRequestBody(
            "body must be a JSON object".to_string(),
        ));
    };

    match map.get("query") {
        Some(Value::String(query)) if !query.trim().is_empty() => Ok(map),
        _ => {
            warn!("GraphQL body has no query");
            Err(RelayError::InvalidRequestBody(
                "missing GraphQL query".to_string(),
            ))
        }
    }
}
