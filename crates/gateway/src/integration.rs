//! AgentCore Gateway integration
//!
//! Every call goes through the managed gateway when it answered the initial
//! `describe_gateway`. Otherwise, or when a gateway call fails, the request is
//! served directly: REST calls hit the known public endpoints, database calls
//! go to [`DatabaseIntegration`] and S3 calls to the configured [`ObjectStore`].
//! Responses carry `gateway_used` so callers can tell the two paths apart.

use crate::client::{GatewayClient, GatewayType, HttpGatewayClient};
use analytics_agent_common::GatewayConfig;
use analytics_agent_storage::{DatabaseIntegration, ObjectStore, DEFAULT_ROW_LIMIT};
use anyhow::{Context, Result};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use strum_macros::{Display, EnumString};
use tracing::{error, info, instrument, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConnection {
    pub name: String,
    #[serde(rename = "type")]
    pub connection_type: String,
    pub endpoint: String,
    pub status: String,
}

impl GatewayConnection {
    fn new(name: &str, connection_type: &str, endpoint: &str, status: &str) -> Self {
        Self {
            name: name.to_string(),
            connection_type: connection_type.to_string(),
            endpoint: endpoint.to_string(),
            status: status.to_string(),
        }
    }
}

/// Uniform result of a gateway-routed call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayResponse {
    pub success: bool,
    pub gateway_used: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GatewayResponse {
    fn direct(data: Value) -> Self {
        Self {
            success: true,
            gateway_used: false,
            status_code: None,
            data,
            connection: None,
            error: None,
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            gateway_used: false,
            status_code: None,
            data: Value::Null,
            connection: None,
            error: Some(error.into()),
        }
    }

    /// Payload returned by the managed gateway
    fn from_gateway(result: Value) -> Self {
        let success = result.get("success").and_then(Value::as_bool).unwrap_or(true);
        let error = result
            .get("error")
            .and_then(Value::as_str)
            .map(str::to_string);
        let data = match result.get("data") {
            Some(data) => data.clone(),
            None => result,
        };
        Self {
            success,
            gateway_used: true,
            status_code: None,
            data,
            connection: None,
            error,
        }
    }

    fn with_connection(mut self, connection: &str) -> Self {
        self.connection = Some(connection.to_string());
        self
    }

    /// Body text of an object read, if the payload is textual
    pub fn data_text(&self) -> Option<&str> {
        self.data.as_str()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayStatus {
    pub status: String,
    #[serde(default)]
    pub connections: Vec<Value>,
    pub last_updated: Option<String>,
    #[serde(default)]
    pub health_check: Value,
    pub error: Option<String>,
    pub fallback_mode: bool,
}

#[derive(Display, EnumString, Debug, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum S3Operation {
    Get,
    Put,
    List,
}

/// REST call routed through the gateway
#[derive(Debug, Clone, Default)]
pub struct RestCall {
    pub endpoint_name: String,
    pub method: String,
    pub path: String,
    pub params: Map<String, Value>,
    pub headers: HashMap<String, String>,
}

impl RestCall {
    pub fn new(endpoint_name: &str, method: &str, path: &str) -> Self {
        Self {
            endpoint_name: endpoint_name.to_string(),
            method: method.to_string(),
            path: path.to_string(),
            ..Default::default()
        }
    }

    pub fn param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.headers.insert(key.to_string(), value.to_string());
        self
    }

    fn to_request(&self) -> Value {
        json!({
            "endpoint": self.endpoint_name,
            "method": self.method,
            "path": self.path,
            "parameters": self.params,
            "headers": self.headers,
        })
    }
}

fn default_rest_endpoints() -> HashMap<String, String> {
    HashMap::from([
        ("market-data-api".to_string(), "https://api.marketdata.com/v1".to_string()),
        ("weather-api".to_string(), "https://api.weather.com/v1".to_string()),
    ])
}

pub struct AgentCoreGateway {
    name: String,
    region: String,
    client: Option<Arc<dyn GatewayClient>>,
    gateway_info: Option<Value>,
    database: Arc<DatabaseIntegration>,
    objects: Arc<dyn ObjectStore>,
    http: reqwest::Client,
    rest_endpoints: HashMap<String, String>,
}

impl AgentCoreGateway {
    /// Build from configuration, using an HTTP client when a gateway URL is set
    pub async fn from_config(
        config: &GatewayConfig,
        database: Arc<DatabaseIntegration>,
        objects: Arc<dyn ObjectStore>,
    ) -> Result<Self> {
        let client: Option<Arc<dyn GatewayClient>> = match config.url.as_deref() {
            Some(url) => Some(Arc::new(HttpGatewayClient::new(url, config.timeout_secs)?)),
            None => None,
        };
        Self::connect(config, client, database, objects).await
    }

    /// Describe the gateway through `client`; a failed describe leaves the
    /// integration in fallback mode.
    pub async fn connect(
        config: &GatewayConfig,
        client: Option<Arc<dyn GatewayClient>>,
        database: Arc<DatabaseIntegration>,
        objects: Arc<dyn ObjectStore>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        let gateway_info = match &client {
            Some(client) => match client.describe_gateway(&config.name).await {
                Ok(info) => {
                    info!("Connected to AgentCore Gateway: {}", config.name);
                    Some(info)
                }
                Err(e) => {
                    warn!("Gateway initialization failed (using fallback): {:#}", e);
                    None
                }
            },
            None => {
                warn!("AgentCore Gateway not configured, running in fallback mode");
                None
            }
        };

        Ok(Self {
            name: config.name.clone(),
            region: config.region.clone(),
            client,
            gateway_info,
            database,
            objects,
            http,
            rest_endpoints: default_rest_endpoints(),
        })
    }

    /// Register or replace a direct REST endpoint used when the gateway is down
    pub fn with_rest_endpoint(mut self, name: &str, base_url: &str) -> Self {
        self.rest_endpoints
            .insert(name.to_string(), base_url.trim_end_matches('/').to_string());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn database(&self) -> &Arc<DatabaseIntegration> {
        &self.database
    }

    pub fn is_available(&self) -> bool {
        self.client.is_some() && self.gateway_info.is_some()
    }

    fn live_client(&self) -> Option<&Arc<dyn GatewayClient>> {
        if self.is_available() {
            self.client.as_ref()
        } else {
            None
        }
    }

    pub async fn get_gateway_status(&self) -> GatewayStatus {
        let Some(client) = self.live_client() else {
            return GatewayStatus {
                status: "unavailable".to_string(),
                connections: Vec::new(),
                last_updated: None,
                health_check: Value::Null,
                error: Some("Gateway not initialized or not available".to_string()),
                fallback_mode: true,
            };
        };

        match client.gateway_status(&self.name).await {
            Ok(response) => GatewayStatus {
                status: response
                    .get("status")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string(),
                connections: response
                    .get("connections")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default(),
                last_updated: response
                    .get("lastUpdated")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                health_check: response.get("healthCheck").cloned().unwrap_or_else(|| json!({})),
                error: None,
                fallback_mode: false,
            },
            Err(e) => {
                error!("Failed to get gateway status: {:#}", e);
                GatewayStatus {
                    status: "error".to_string(),
                    connections: Vec::new(),
                    last_updated: None,
                    health_check: Value::Null,
                    error: Some(e.to_string()),
                    fallback_mode: true,
                }
            }
        }
    }

    #[instrument(skip(self, call), fields(endpoint = %call.endpoint_name, path = %call.path))]
    pub async fn execute_rest_call(&self, call: &RestCall) -> GatewayResponse {
        if let Some(client) = self.live_client() {
            match client.invoke(&self.name, GatewayType::Rest, &call.to_request()).await {
                Ok(result) => return GatewayResponse::from_gateway(result),
                Err(e) => error!("Gateway REST call failed, using fallback: {:#}", e),
            }
        }
        self.fallback_rest_call(call).await
    }

    async fn fallback_rest_call(&self, call: &RestCall) -> GatewayResponse {
        let Some(base_url) = self.rest_endpoints.get(&call.endpoint_name) else {
            return GatewayResponse::failed(format!("Unknown endpoint: {}", call.endpoint_name));
        };

        let method = match Method::from_bytes(call.method.to_uppercase().as_bytes()) {
            Ok(method) => method,
            Err(_) => return GatewayResponse::failed(format!("Invalid method: {}", call.method)),
        };

        let query: Vec<(String, String)> = call
            .params
            .iter()
            .map(|(k, v)| {
                let value = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), value)
            })
            .collect();

        let mut request = self
            .http
            .request(method, format!("{}{}", base_url, call.path))
            .query(&query);
        for (key, value) in &call.headers {
            request = request.header(key, value);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return GatewayResponse::failed(e.to_string()),
        };

        let status = response.status().as_u16();
        let is_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.starts_with("application/json"))
            .unwrap_or(false);

        let data = if is_json {
            response.json::<Value>().await.map_err(|e| e.to_string())
        } else {
            response.text().await.map(Value::String).map_err(|e| e.to_string())
        };

        match data {
            Ok(data) => GatewayResponse {
                success: status < 400,
                gateway_used: false,
                status_code: Some(status),
                data,
                connection: None,
                error: None,
            },
            Err(e) => GatewayResponse::failed(e),
        }
    }

    #[instrument(skip(self, query, parameters))]
    pub async fn execute_database_query(
        &self,
        connection_name: &str,
        query: &str,
        parameters: &[Value],
    ) -> GatewayResponse {
        if let Some(client) = self.live_client() {
            let request = json!({
                "connection": connection_name,
                "query": query,
                "parameters": parameters,
            });
            match client.invoke(&self.name, GatewayType::Database, &request).await {
                Ok(result) => return GatewayResponse::from_gateway(result).with_connection(connection_name),
                Err(e) => error!("Gateway database query failed, using fallback: {:#}", e),
            }
        }

        let outcome = self.database.execute_query(query, DEFAULT_ROW_LIMIT).await;
        match serde_json::to_value(&outcome) {
            Ok(data) => {
                let mut response = GatewayResponse::direct(data).with_connection(connection_name);
                response.success = outcome.success;
                response.error = outcome.error;
                response
            }
            Err(e) => GatewayResponse::failed(e.to_string()).with_connection(connection_name),
        }
    }

    #[instrument(skip(self, data))]
    pub async fn access_s3_data(
        &self,
        bucket: &str,
        operation: &str,
        key: &str,
        data: Option<&[u8]>,
    ) -> GatewayResponse {
        let Ok(op) = S3Operation::from_str(operation) else {
            return GatewayResponse::failed(format!("Unsupported operation: {}", operation));
        };

        if let Some(client) = self.live_client() {
            let mut request = json!({
                "bucket": bucket,
                "operation": op.to_string(),
                "key": key,
            });
            if let (Some(body), S3Operation::Put) = (data, op) {
                request["data"] = Value::String(String::from_utf8_lossy(body).into_owned());
            }
            match client.invoke(&self.name, GatewayType::S3, &request).await {
                Ok(result) => return GatewayResponse::from_gateway(result),
                Err(e) => error!("Gateway S3 access failed, using fallback: {:#}", e),
            }
        }

        self.fallback_s3_access(bucket, op, key, data).await
    }

    async fn fallback_s3_access(
        &self,
        bucket: &str,
        op: S3Operation,
        key: &str,
        data: Option<&[u8]>,
    ) -> GatewayResponse {
        let result = match op {
            S3Operation::Get => self
                .objects
                .get_object(bucket, key)
                .await
                .map(|body| Value::String(String::from_utf8_lossy(&body).into_owned())),
            S3Operation::Put => self
                .objects
                .put_object(bucket, key, data.unwrap_or_default())
                .await
                .map(|_| Value::Null),
            S3Operation::List => self
                .objects
                .list_objects(bucket, key)
                .await
                .and_then(|objects| serde_json::to_value(objects).map_err(anyhow::Error::from)),
        };

        match result {
            Ok(data) => GatewayResponse::direct(data),
            Err(e) => GatewayResponse::failed(format!("{:#}", e)),
        }
    }

    pub fn list_available_connections(&self) -> Vec<GatewayConnection> {
        let Some(info) = self.gateway_info.as_ref().filter(|_| self.client.is_some()) else {
            return vec![
                GatewayConnection::new("analytics-postgres", "DATABASE", "PostgreSQL Database", "simulated"),
                GatewayConnection::new("data-warehouse", "DATABASE", "Redshift Database", "simulated"),
                GatewayConnection::new("analytics-data-lake", "S3", "S3 Bucket", "simulated"),
                GatewayConnection::new("market-data-api", "REST", "Market Data API", "simulated"),
            ];
        };

        let mut connections = Vec::new();
        let gateways = info.get("gateways").and_then(Value::as_array);
        for gateway in gateways.into_iter().flatten() {
            let configuration = &gateway["configuration"];
            let entries = |field: &str| {
                configuration
                    .get(field)
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default()
            };
            let text = |value: &Value, field: &str| {
                value.get(field).and_then(Value::as_str).unwrap_or_default().to_string()
            };

            match gateway.get("type").and_then(Value::as_str) {
                Some("REST") => {
                    for endpoint in entries("endpoints") {
                        connections.push(GatewayConnection::new(
                            &text(&endpoint, "name"),
                            "REST",
                            &text(&endpoint, "url"),
                            "active",
                        ));
                    }
                }
                Some("DATABASE") => {
                    for conn in entries("connections") {
                        let conn_type = text(&conn, "type");
                        connections.push(GatewayConnection::new(
                            &text(&conn, "name"),
                            &conn_type,
                            &format!("{} Database", conn_type),
                            "active",
                        ));
                    }
                }
                Some("S3") => {
                    for bucket in entries("buckets") {
                        connections.push(GatewayConnection::new(
                            &text(&bucket, "name"),
                            "S3",
                            &text(&bucket, "bucket"),
                            "active",
                        ));
                    }
                }
                _ => {}
            }
        }
        connections
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analytics_agent_storage::LocalObjectStore;
    use tempfile::TempDir;

    async fn fallback_gateway(dir: &TempDir) -> AgentCoreGateway {
        AgentCoreGateway::connect(
            &GatewayConfig::default(),
            None,
            Arc::new(DatabaseIntegration::simulated()),
            Arc::new(LocalObjectStore::new(dir.path())),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_unconfigured_gateway_reports_fallback_mode() {
        let dir = TempDir::new().unwrap();
        let gateway = fallback_gateway(&dir).await;

        assert!(!gateway.is_available());
        let status = gateway.get_gateway_status().await;
        assert_eq!(status.status, "unavailable");
        assert!(status.fallback_mode);
    }

    #[tokio::test]
    async fn test_unknown_rest_endpoint() {
        let dir = TempDir::new().unwrap();
        let gateway = fallback_gateway(&dir).await;

        let response = gateway
            .execute_rest_call(&RestCall::new("nowhere-api", "GET", "/quotes"))
            .await;
        assert!(!response.success);
        assert!(!response.gateway_used);
        assert_eq!(response.error.as_deref(), Some("Unknown endpoint: nowhere-api"));
    }

    #[tokio::test]
    async fn test_database_query_falls_back_to_integration() {
        let dir = TempDir::new().unwrap();
        let gateway = fallback_gateway(&dir).await;

        let response = gateway
            .execute_database_query(
                "analytics-postgres",
                "SELECT region FROM sales.transactions GROUP BY region",
                &[],
            )
            .await;
        assert!(response.success);
        assert!(!response.gateway_used);
        assert_eq!(response.connection.as_deref(), Some("analytics-postgres"));
        assert_eq!(response.data["query_method"], "simulated");
        assert_eq!(response.data["row_count"], 4);
    }

    #[tokio::test]
    async fn test_s3_round_trip_through_object_store() {
        let dir = TempDir::new().unwrap();
        let gateway = fallback_gateway(&dir).await;

        let put = gateway
            .access_s3_data("bucket", "put", "data/sales.csv", Some(b"date,revenue\n"))
            .await;
        assert!(put.success);

        let get = gateway.access_s3_data("bucket", "GET", "data/sales.csv", None).await;
        assert_eq!(get.data_text(), Some("date,revenue\n"));

        let list = gateway.access_s3_data("bucket", "LIST", "data/", None).await;
        assert_eq!(list.data[0]["key"], "data/sales.csv");
    }

    #[tokio::test]
    async fn test_s3_missing_object_and_bad_operation() {
        let dir = TempDir::new().unwrap();
        let gateway = fallback_gateway(&dir).await;

        let missing = gateway.access_s3_data("bucket", "GET", "absent.csv", None).await;
        assert!(!missing.success);

        let unsupported = gateway.access_s3_data("bucket", "DELETE", "x", None).await;
        assert_eq!(unsupported.error.as_deref(), Some("Unsupported operation: DELETE"));
    }

    #[tokio::test]
    async fn test_simulated_connections() {
        let dir = TempDir::new().unwrap();
        let gateway = fallback_gateway(&dir).await;

        let connections = gateway.list_available_connections();
        assert_eq!(connections.len(), 4);
        assert_eq!(connections[0].name, "analytics-postgres");
        assert!(connections.iter().all(|c| c.status == "simulated"));
    }
}
