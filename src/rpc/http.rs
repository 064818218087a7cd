// JSON-RPC 2.0 over HTTP
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use url::Url;
use uuid::Uuid;

use super::envelope::unwrap_envelope;
use super::invoker::RpcInvoker;
use crate::infrastructure::PanelError;

const LIST_METHODS: &str = "system.listMethods";

#[derive(Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: String,
    method: &'a str,
    params: Vec<Value>,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

pub struct HttpRpcInvoker {
    client: Client,
    endpoint: Url,
}

impl HttpRpcInvoker {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, PanelError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| PanelError::config(format!("Invalid backend URL '{}': {}", endpoint, e)))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PanelError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl RpcInvoker for HttpRpcInvoker {
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, PanelError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: Uuid::new_v4().to_string(),
            method,
            params,
        };
        tracing::debug!(method, id = %request.id, "Sending RPC request");

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| PanelError::transport(format!("{}: {}", method, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PanelError::transport(format!(
                "{}: HTTP status {}",
                method, status
            )));
        }

        let body: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| PanelError::decode(method, e.to_string()))?;

        if let Some(error) = body.error {
            tracing::debug!(method, code = error.code, "RPC returned error object");
            return Err(PanelError::backend(method, error.message));
        }

        Ok(body.result.unwrap_or(Value::Null))
    }

    async fn list_methods(&self) -> Result<Vec<String>, PanelError> {
        let value = self.call(LIST_METHODS, Vec::new()).await?;
        serde_json::from_value(unwrap_envelope(value))
            .map_err(|e| PanelError::decode(LIST_METHODS, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_url() {
        let err = HttpRpcInvoker::new("not a url", Duration::from_secs(5))
            .err()
            .unwrap();
        assert!(matches!(err, PanelError::Configuration { .. }));
    }

    #[test]
    fn test_keeps_endpoint() {
        let invoker = HttpRpcInvoker::new("http://localhost:8999/rpc", Duration::from_secs(5)).unwrap();
        assert_eq!(invoker.endpoint().path(), "/rpc");
    }
}
