//! Relay status and control endpoints
//!
//! - `GET /relays` - Registry snapshot in priority order
//! - `POST /relays/refresh` - Probe every relay and select the best one
//! - `POST /relays/reset` - Flag every relay healthy
//! - `POST /relays/unhealthy` - Flag one relay unhealthy
//! - `POST /relays/transform` - Preview the request a relay would receive

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use axum::{extract::State, Json};
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::{
    error::{RelayError, RelayResult},
    relay::{RelayDescriptor, RequestOptions},
    AppState,
};

/// Result of a fresh selection
#[derive(Debug, Serialize)]
pub struct SelectionResponse {
    pub selected: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MarkUnhealthyRequest {
    pub endpoint: String,
}

/// Request to rewrite, as the application would send it upstream
#[derive(Debug, Deserialize)]
pub struct TransformRequest {
    pub target: String,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Raw string bodies are used as-is, anything else is serialized
    #[serde(default)]
    pub body: Option<Value>,
    /// Relay endpoint to use instead of the default
    #[serde(default)]
    pub relay: Option<String>,
}

/// Rewritten request
#[derive(Debug, Serialize)]
pub struct TransformResponse {
    pub relay: String,
    pub url: String,
    pub method: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
    pub include_credentials: bool,
}

/// List relays
pub async fn list_relays(State(state): State<Arc<AppState>>) -> Json<Vec<RelayDescriptor>> {
    Json(state.registry.ordered_by_priority())
}

/// Probe every relay and report the selected one
pub async fn refresh_relays(State(state): State<Arc<AppState>>) -> Json<SelectionResponse> {
    let selected = state.selector.select_healthy_relay().await;
    Json(SelectionResponse { selected })
}

/// Flag every relay healthy
pub async fn reset_relays(State(state): State<Arc<AppState>>) -> Json<Vec<RelayDescriptor>> {
    state.registry.mark_all_healthy();
    Json(state.registry.ordered_by_priority())
}

/// Flag one relay unhealthy
pub async fn mark_unhealthy(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MarkUnhealthyRequest>,
) -> Json<Vec<RelayDescriptor>> {
    info!(relay = %request.endpoint, "Relay marked unhealthy by operator");
    state.registry.mark_unhealthy(&request.endpoint);
    Json(state.registry.ordered_by_priority())
}

/// Rewrite a request without sending it
pub async fn transform(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TransformRequest>,
) -> RelayResult<Json<TransformResponse>> {
    let options = request_options(&request)?;

    let (relay, rewritten) = state.relay_client.transform_request(
        request.relay.as_deref(),
        &request.target,
        options,
    )?;

    let headers = rewritten
        .headers
        .iter()
        .map(|(name, value)| {
            (
                name.to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();

    Ok(Json(TransformResponse {
        relay: relay.endpoint,
        url: rewritten.url,
        method: rewritten.method.to_string(),
        headers,
        body: rewritten.body,
        include_credentials: rewritten.include_credentials,
    }))
}

fn request_options(request: &TransformRequest) -> RelayResult<RequestOptions> {
    let mut options = RequestOptions::new();

    if let Some(method) = &request.method {
        let method = Method::from_bytes(method.to_uppercase().as_bytes())
            .map_err(|_| RelayError::BadRequest(format!("Invalid method: {}", method)))?;
        options = options.method(method);
    }

    for (name, value) in &request.headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| RelayError::BadRequest(format!("Invalid header name: {}", name)))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|_| RelayError::BadRequest(format!("Invalid value for header {}", name)))?;
        options = options.header(header_name, header_value);
    }

    match &request.body {
        None | Some(Value::Null) => {}
        Some(Value::String(raw)) => options = options.body(raw.clone()),
        Some(other) => options = options.body(other.to_string()),
    }

    Ok(options)
}
