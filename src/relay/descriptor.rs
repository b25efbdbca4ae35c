//! Relay descriptors
//!
//! A descriptor is the record for one relay: where it lives, how it ranks,
//! whether it currently looks alive, and which wire contract it speaks.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Wire contract spoken by a relay
///
/// Each variant owns a request transform and a probe plan. New relay
/// behaviours are added as new variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayKind {
    /// Target path is appended under `{endpoint}/proxy`. Headers pass through.
    PathPrefix,
    /// Target URL is percent-encoded into `{endpoint}?url=`. Custom headers are dropped.
    QueryParam,
}

impl RelayKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelayKind::PathPrefix => "path_prefix",
            RelayKind::QueryParam => "query_param",
        }
    }
}

/// The wrapped third-party API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamApi {
    /// Base URL without trailing slash, e.g. `https://api.meetup.com`
    pub base_url: String,
    /// GraphQL endpoint path, e.g. `/gql`
    pub graphql_path: String,
    /// Cheap path used for liveness probes, e.g. `/status`
    pub status_path: String,
    /// Origin the path-prefix relay expects in `Origin` and `Referer`
    pub site_origin: String,
}

impl UpstreamApi {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            graphql_path: "/gql".to_string(),
            status_path: "/status".to_string(),
            site_origin: "https://yashrajnayak.github.io".to_string(),
        }
    }

    /// Fully-qualified upstream URL for a path
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `Referer` value derived from the site origin
    pub fn referer(&self) -> String {
        format!("{}/", self.site_origin)
    }
}

/// One relay service
#[derive(Debug, Clone, Serialize)]
pub struct RelayDescriptor {
    /// Base URL of the relay. Unique, used for prefix matching.
    pub endpoint: String,
    /// Lower value is tried first
    pub priority: u32,
    pub healthy: bool,
    /// Time of the last health mutation
    pub last_checked_at: Option<DateTime<Utc>>,
    /// Whether calls through this relay forward cookies. Informational only.
    pub requires_credentials: bool,
    pub kind: RelayKind,
}

impl RelayDescriptor {
    /// New descriptor, healthy until a probe says otherwise
    pub fn new(endpoint: &str, priority: u32, requires_credentials: bool, kind: RelayKind) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            priority,
            healthy: true,
            last_checked_at: None,
            requires_credentials,
            kind,
        }
    }

    /// Whether `url` is addressed to this relay
    ///
    /// The endpoint must be a prefix ending on a URL boundary, so
    /// `http://host:80` does not claim `http://host:8080`.
    pub fn matches(&self, url: &str) -> bool {
        match url.strip_prefix(&self.endpoint) {
            Some(rest) => matches!(rest.chars().next(), None | Some('/' | '?' | '#')),
            None => false,
        }
    }
}
