//! Mock relays for testing
//!
//! Provides wiremock-based stand-ins for the two relay contracts:
//! - Path-prefix (worker) relays: `OPTIONS /proxy/status`, `POST /proxy/gql`, `/proxy/*`
//! - Query-parameter (AllOrigins) relays: `/raw?url=<encoded target>`
//!
//! # Example
//!
//! ```rust,ignore
//! use crate::mocks::relay::MockRelay;
//!
//! #[tokio::test]
//! async fn test_with_relay_mock() {
//!     let relay = MockRelay::start().await;
//!     relay.mock_preflight_ok().await;
//!
//!     // Use relay.worker_endpoint() as the relay endpoint
//! }
//! ```

use std::time::Duration;

use serde_json::Value;
use wiremock::{
    matchers::{body_partial_json, header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

/// Path AllOrigins-style relays are served from
pub const ALLORIGINS_PATH: &str = "/raw";

/// Mock relay server wrapper
pub struct MockRelay {
    server: MockServer,
}

impl MockRelay {
    /// Start a new mock relay server
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        Self { server }
    }

    /// Get the mock server URI
    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Endpoint when used as a path-prefix relay
    pub fn worker_endpoint(&self) -> String {
        self.server.uri()
    }

    /// Endpoint when used as a query-parameter relay
    pub fn allorigins_endpoint(&self) -> String {
        format!("{}{}", self.server.uri(), ALLORIGINS_PATH)
    }

    /// Number of requests the relay has seen
    pub async fn request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|requests| requests.len())
            .unwrap_or(0)
    }

    // =========================================================================
    // Path-prefix relay
    // =========================================================================

    /// Preflight probe answered with 204
    pub async fn mock_preflight_ok(&self) {
        self.mock_preflight(ResponseTemplate::new(204)).await;
    }

    /// Preflight probe answered with a custom response
    pub async fn mock_preflight(&self, response: ResponseTemplate) {
        Mock::given(method("OPTIONS"))
            .and(path("/proxy/status"))
            .and(header("Access-Control-Request-Method", "POST"))
            .respond_with(response)
            .mount(&self.server)
            .await;
    }

    /// Preflight probe failing with the given status
    pub async fn mock_preflight_failure(&self, status: u16) {
        self.mock_preflight(ResponseTemplate::new(status)).await;
    }

    /// GraphQL call with the credential forwarded as a header
    pub async fn mock_worker_graphql(&self, token: &str, response: Value) {
        Mock::given(method("POST"))
            .and(path("/proxy/gql"))
            .and(header("Authorization", format!("Bearer {}", token).as_str()))
            .and(header("Content-Type", "application/json"))
            .and(body_partial_json(serde_json::json!({ "query": "{ self { id } }" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(response))
            .mount(&self.server)
            .await;
    }

    /// REST call under `/proxy` with origin spoofing
    pub async fn mock_worker_rest(&self, http_method: &str, rest_path: &str, response: Value) {
        Mock::given(method(http_method))
            .and(path(format!("/proxy{}", rest_path)))
            .and(header("Origin", "https://yashrajnayak.github.io"))
            .respond_with(ResponseTemplate::new(200).set_body_json(response))
            .mount(&self.server)
            .await;
    }

    // =========================================================================
    // Query-parameter relay
    // =========================================================================

    /// Status probe for `target` answered with a custom response
    pub async fn mock_inline_status(&self, target: &str, response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(ALLORIGINS_PATH))
            .and(query_param("url", target))
            .and(header("X-Requested-With", "XMLHttpRequest"))
            .respond_with(response)
            .mount(&self.server)
            .await;
    }

    /// GraphQL call with the credential embedded in the body
    pub async fn mock_inline_graphql(&self, target: &str, token: &str, response: Value) {
        Mock::given(method("POST"))
            .and(path(ALLORIGINS_PATH))
            .and(query_param("url", target))
            .and(body_partial_json(serde_json::json!({ "authorization": token })))
            .respond_with(ResponseTemplate::new(200).set_body_json(response))
            .mount(&self.server)
            .await;
    }

    // =========================================================================
    // Failure modes
    // =========================================================================

    /// Every request answered with `status`
    pub async fn mock_any_status(&self, status: u16) {
        Mock::given(wiremock::matchers::any())
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// Every request answered after `delay`
    pub async fn mock_slow(&self, delay: Duration) {
        Mock::given(wiremock::matchers::any())
            .respond_with(ResponseTemplate::new(204).set_delay(delay))
            .mount(&self.server)
            .await;
    }

    /// Assert that no request reaches the relay
    pub async fn expect_no_requests(&self) {
        Mock::given(wiremock::matchers::any())
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&self.server)
            .await;
    }
}
