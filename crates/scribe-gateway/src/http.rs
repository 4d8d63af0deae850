//! HTTP transport for the gateway.
//!
//! Each operation is a `POST {base_url}/invoke/{operation}` carrying the
//! argument record as its JSON body. A 2xx reply carries the result as JSON
//! (an empty body means unit); any other status carries the failure
//! description, either as a JSON string or as plain text.

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use crate::error::{GatewayError, Result};
use crate::gateway::Gateway;
use crate::ops::Operation;

#[derive(Debug, Clone)]
pub struct HttpGateway {
    base_url: String,
    http: reqwest::Client,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, operation: Operation) -> String {
        format!(
            "{}/invoke/{}",
            self.base_url.trim_end_matches('/'),
            operation.as_str()
        )
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn invoke(&self, operation: Operation, args: Value) -> Result<Value> {
        let url = self.endpoint(operation);

        let resp = self
            .http
            .post(&url)
            .json(&args)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        if !status.is_success() {
            warn!(op = %operation, status = %status, "remote operation rejected");
            return Err(GatewayError::Rejected(rejection_message(&body, status)));
        }

        decode_reply(operation, &body)
    }
}

fn decode_reply(operation: Operation, body: &str) -> Result<Value> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(body).map_err(|e| GatewayError::Decode {
        operation: operation.as_str(),
        message: e.to_string(),
    })
}

fn rejection_message(body: &str, status: reqwest::StatusCode) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return format!("Backend responded {status}");
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::String(message)) => message,
        _ => trimmed.to_string(),
    }
}
