//! Relay dispatch integration tests
//!
//! Sends real requests through mock relays with `RelayClient`, including the
//! single failover hop.

use pretty_assertions::assert_eq;
use relaygate::{RelayError, RequestOptions};
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde_json::{json, Value};

use crate::common::{allorigins_relay, constants, relay_client, worker_relay};
use crate::mocks::MockRelay;

const GRAPHQL_TARGET: &str = "https://api.example.com/gql";

fn graphql_options() -> RequestOptions {
    RequestOptions::new()
        .header(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", constants::TEST_TOKEN)).unwrap(),
        )
        .body(json!({ "query": "{ self { id } }" }).to_string())
}

#[tokio::test]
async fn test_graphql_through_worker_relay() {
    let worker = MockRelay::start().await;
    worker
        .mock_worker_graphql(constants::TEST_TOKEN, json!({ "data": { "self": { "id": "42" } } }))
        .await;

    let client = relay_client(vec![worker_relay(&worker.worker_endpoint(), 1)]);
    let response = client.send(GRAPHQL_TARGET, graphql_options(), None).await.unwrap();

    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["self"]["id"], "42");
}

#[tokio::test]
async fn test_rest_through_named_worker_relay() {
    let worker = MockRelay::start().await;
    worker
        .mock_worker_rest("GET", "/events", json!([{ "id": 1 }]))
        .await;

    let endpoint = worker.worker_endpoint();
    let client = relay_client(vec![worker_relay(&endpoint, 1)]);
    let response = client
        .send("https://api.example.com/events", RequestOptions::new(), Some(&endpoint))
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn test_server_error_fails_over_to_inline_relay() {
    let worker = MockRelay::start().await;
    let allorigins = MockRelay::start().await;

    worker.mock_any_status(502).await;
    allorigins
        .mock_inline_graphql(GRAPHQL_TARGET, constants::TEST_TOKEN, json!({ "data": {} }))
        .await;

    let worker_endpoint = worker.worker_endpoint();
    let client = relay_client(vec![
        worker_relay(&worker_endpoint, 1),
        allorigins_relay(&allorigins.allorigins_endpoint(), 2),
    ]);

    let response = client.send(GRAPHQL_TARGET, graphql_options(), None).await.unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let registry = client.selector().registry();
    assert!(!registry.find_by_prefix(&worker_endpoint).unwrap().healthy);
    assert_eq!(
        client.selector().get_default_or_named(None).unwrap().endpoint,
        allorigins.allorigins_endpoint()
    );
}

#[tokio::test]
async fn test_client_errors_are_not_failed_over() {
    let worker = MockRelay::start().await;
    let backup = MockRelay::start().await;
    worker.mock_any_status(401).await;
    backup.expect_no_requests().await;

    let worker_endpoint = worker.worker_endpoint();
    let client = relay_client(vec![
        worker_relay(&worker_endpoint, 1),
        worker_relay(&backup.worker_endpoint(), 2),
    ]);

    let response = client
        .send("/events", RequestOptions::new().method(Method::GET), None)
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 401);
    assert!(client.selector().registry().find_by_prefix(&worker_endpoint).unwrap().healthy);
}

#[tokio::test]
async fn test_failover_stops_after_one_retry() {
    let first = MockRelay::start().await;
    let second = MockRelay::start().await;
    let third = MockRelay::start().await;
    first.mock_any_status(500).await;
    second.mock_any_status(503).await;
    third.expect_no_requests().await;

    let client = relay_client(vec![
        worker_relay(&first.worker_endpoint(), 1),
        worker_relay(&second.worker_endpoint(), 2),
        worker_relay(&third.worker_endpoint(), 3),
    ]);

    let result = client.send("/events", RequestOptions::new(), None).await;
    assert!(matches!(result, Err(RelayError::UpstreamError(_))));
    assert_eq!(first.request_count().await, 1);
    assert_eq!(second.request_count().await, 1);
}

#[tokio::test]
async fn test_invalid_graphql_body_never_reaches_relay() {
    let worker = MockRelay::start().await;
    worker.expect_no_requests().await;

    let client = relay_client(vec![worker_relay(&worker.worker_endpoint(), 1)]);
    let result = client
        .send(GRAPHQL_TARGET, RequestOptions::new().body("{}"), None)
        .await;

    assert!(matches!(result, Err(RelayError::InvalidRequestBody(_))));
    assert!(client.selector().registry().snapshot()[0].healthy);
}

#[tokio::test]
async fn test_no_healthy_relay_is_explicit() {
    let client = relay_client(vec![worker_relay("https://one.test", 1)]);
    client.selector().registry().mark_unhealthy("https://one.test");

    let result = client.send("/events", RequestOptions::new(), None).await;
    assert!(matches!(result, Err(RelayError::NoHealthyRelay)));

    let result = client.graphql_endpoint(None);
    assert!(matches!(result, Err(RelayError::NoHealthyRelay)));
}

#[tokio::test]
async fn test_graphql_endpoint_for_named_relay() {
    let client = relay_client(vec![
        worker_relay("https://worker.test", 1),
        allorigins_relay("https://allorigins.test/raw", 2),
    ]);

    assert_eq!(
        client.graphql_endpoint(Some("https://allorigins.test/raw")).unwrap(),
        "https://allorigins.test/raw?url=https%3A%2F%2Fapi.example.com%2Fgql"
    );
    assert_eq!(
        client.graphql_endpoint(None).unwrap(),
        "https://worker.test/proxy/gql"
    );
}
