//! Shared helpers for the hosted-service clients.
//!
//! No timeout is configured on the client: every call waits as long as the
//! remote service and the transport allow. Failures are never retried.

use anyhow::{bail, Result};
use serde_json::Value;

/// Client shared by every hosted-service wrapper.
pub fn client() -> reqwest::Client {
    reqwest::Client::new()
}

/// Send a request and decode a JSON body, turning non-2xx responses into
/// errors that carry the status and response text.
pub async fn send_json(service: &str, request: reqwest::RequestBuilder) -> Result<Value> {
    let response = request
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("{} request failed: {}", service, e))?;
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| anyhow::anyhow!("{} response body could not be read: {}", service, e))?;

    if !status.is_success() {
        bail!("{} API error {}: {}", service, status, body.trim());
    }
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&body)
        .map_err(|e| anyhow::anyhow!("{} returned invalid JSON: {} | {}", service, e, body))
}

/// Read an array of numbers as an `f32` vector.
pub fn parse_vector(value: &Value, what: &str) -> Result<Vec<f32>> {
    let arr = value
        .as_array()
        .ok_or_else(|| anyhow::anyhow!("{} is not an array", what))?;
    arr.iter()
        .map(|v| {
            v.as_f64()
                .map(|n| n as f32)
                .ok_or_else(|| anyhow::anyhow!("{} contains a non-number", what))
        })
        .collect()
}
