//! Health probe integration tests
//!
//! Runs the reqwest-backed probe against mock relays for each success
//! criterion and failure mode.

use std::time::{Duration, Instant};

use relaygate::{HealthCheck, ProbeFailure};
use wiremock::ResponseTemplate;

use crate::common::{allorigins_relay, http_probe, worker_relay};
use crate::mocks::MockRelay;

const STATUS_TARGET: &str = "https://api.example.com/status";

#[tokio::test]
async fn test_preflight_no_content_is_healthy() {
    let relay = MockRelay::start().await;
    relay.mock_preflight_ok().await;

    let descriptor = worker_relay(&relay.worker_endpoint(), 1);
    assert!(http_probe().check(&descriptor).await);
}

#[tokio::test]
async fn test_preflight_ok_ignores_body() {
    let relay = MockRelay::start().await;
    relay
        .mock_preflight(ResponseTemplate::new(200).set_body_raw("not inspected", "image/png"))
        .await;

    let descriptor = worker_relay(&relay.worker_endpoint(), 1);
    assert!(http_probe().check(&descriptor).await);
}

#[tokio::test]
async fn test_preflight_server_error_is_unhealthy() {
    let relay = MockRelay::start().await;
    relay.mock_preflight_failure(502).await;

    let descriptor = worker_relay(&relay.worker_endpoint(), 1);
    let result = http_probe().probe(&descriptor).await;
    assert!(matches!(result, Err(ProbeFailure::Status(status)) if status.as_u16() == 502));
}

#[tokio::test]
async fn test_other_success_status_needs_status_marker() {
    let relay = MockRelay::start().await;
    relay
        .mock_preflight(ResponseTemplate::new(202).set_body_raw("relay status: up", "text/plain"))
        .await;

    let descriptor = worker_relay(&relay.worker_endpoint(), 1);
    assert!(http_probe().check(&descriptor).await);
}

#[tokio::test]
async fn test_unrecognized_body_is_unhealthy() {
    let relay = MockRelay::start().await;
    relay
        .mock_preflight(ResponseTemplate::new(202).set_body_raw("<h1>Welcome</h1>", "text/html"))
        .await;

    let descriptor = worker_relay(&relay.worker_endpoint(), 1);
    let result = http_probe().probe(&descriptor).await;
    assert!(matches!(result, Err(ProbeFailure::UnrecognizedBody)));
}

#[tokio::test]
async fn test_unexpected_content_type_is_unhealthy() {
    let relay = MockRelay::start().await;
    relay
        .mock_inline_status(
            STATUS_TARGET,
            ResponseTemplate::new(200).set_body_raw(vec![0u8, 1, 2], "application/octet-stream"),
        )
        .await;

    let descriptor = allorigins_relay(&relay.allorigins_endpoint(), 2);
    let result = http_probe().probe(&descriptor).await;
    assert!(matches!(result, Err(ProbeFailure::ContentType(_))));
}

#[tokio::test]
async fn test_inline_relay_accepts_any_readable_body() {
    let relay = MockRelay::start().await;
    relay
        .mock_inline_status(
            STATUS_TARGET,
            ResponseTemplate::new(200).set_body_raw("<html>upstream page</html>", "text/html"),
        )
        .await;

    let descriptor = allorigins_relay(&relay.allorigins_endpoint(), 2);
    assert!(http_probe().check(&descriptor).await);
}

#[tokio::test]
async fn test_inline_relay_error_status_is_unhealthy() {
    let relay = MockRelay::start().await;
    relay
        .mock_inline_status(STATUS_TARGET, ResponseTemplate::new(500))
        .await;

    let descriptor = allorigins_relay(&relay.allorigins_endpoint(), 2);
    assert!(!http_probe().check(&descriptor).await);
}

#[tokio::test]
async fn test_slow_relay_times_out() {
    let relay = MockRelay::start().await;
    relay.mock_slow(Duration::from_secs(5)).await;

    let descriptor = worker_relay(&relay.worker_endpoint(), 1);
    let start = Instant::now();
    let result = http_probe().probe(&descriptor).await;

    assert!(matches!(result, Err(ProbeFailure::Timeout(_))));
    assert!(start.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn test_unreachable_relay_is_unhealthy() {
    let descriptor = worker_relay("http://127.0.0.1:1", 1);
    assert!(!http_probe().check(&descriptor).await);
}
