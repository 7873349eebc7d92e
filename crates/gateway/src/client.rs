//! Transport to the managed AgentCore Gateway.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use strum_macros::{Display, EnumString};
use tracing::{debug, instrument};

/// Target family a gateway request is routed to
#[derive(Display, EnumString, Debug, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "UPPERCASE")]
pub enum GatewayType {
    Rest,
    Database,
    S3,
}

#[async_trait]
pub trait GatewayClient: Send + Sync {
    /// Gateway configuration document, including the `gateways` list
    async fn describe_gateway(&self, name: &str) -> Result<Value>;

    async fn gateway_status(&self, name: &str) -> Result<Value>;

    /// Forward `request` to the gateway and return the decoded response payload
    async fn invoke(&self, name: &str, gateway_type: GatewayType, request: &Value) -> Result<Value>;
}

/// JSON-over-HTTP gateway client
#[derive(Debug, Clone)]
pub struct HttpGatewayClient {
    base_url: String,
    client: Client,
}

impl HttpGatewayClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .pool_max_idle_per_host(10)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn get_json(&self, url: &str) -> Result<Value> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to reach AgentCore Gateway")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Gateway returned error status {}: {}", status, error_text);
        }

        response
            .json()
            .await
            .context("Failed to parse gateway JSON response")
    }
}

#[async_trait]
impl GatewayClient for HttpGatewayClient {
    #[instrument(skip(self))]
    async fn describe_gateway(&self, name: &str) -> Result<Value> {
        let body = self
            .get_json(&format!("{}/gateways/{}", self.base_url, name))
            .await?;
        Ok(match body.get("gateway") {
            Some(gateway) => gateway.clone(),
            None => body,
        })
    }

    #[instrument(skip(self))]
    async fn gateway_status(&self, name: &str) -> Result<Value> {
        self.get_json(&format!("{}/gateways/{}/status", self.base_url, name))
            .await
    }

    #[instrument(skip(self, request), fields(gateway_type = %gateway_type))]
    async fn invoke(&self, name: &str, gateway_type: GatewayType, request: &Value) -> Result<Value> {
        let url = format!("{}/gateways/{}/invoke", self.base_url, name);
        let payload = json!({
            "gatewayType": gateway_type.to_string(),
            "requestData": request.to_string(),
        });
        debug!("Invoking gateway at {}", url);

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .context("Failed to send gateway invocation")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Gateway invocation failed with status {}: {}", status, error_text);
        }

        let body: Value = response
            .json()
            .await
            .context("Failed to parse gateway invocation response")?;

        // responseData arrives either as an encoded JSON string or inline
        match body.get("responseData") {
            Some(Value::String(encoded)) => {
                serde_json::from_str(encoded).context("Failed to decode gateway responseData")
            }
            Some(inline) => Ok(inline.clone()),
            None => Ok(body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_gateway_type_names() {
        assert_eq!(GatewayType::Rest.to_string(), "REST");
        assert_eq!(GatewayType::S3.to_string(), "S3");
        assert_eq!(GatewayType::from_str("DATABASE").unwrap(), GatewayType::Database);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = HttpGatewayClient::new("http://gateway.local/", 5).unwrap();
        assert_eq!(client.base_url, "http://gateway.local");
    }
}
