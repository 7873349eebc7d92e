use analytics_agent_common::GatewayConfig;
use analytics_agent_gateway::{AgentCoreGateway, GatewayClient, HttpGatewayClient, RestCall};
use analytics_agent_storage::{DatabaseIntegration, LocalObjectStore};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> GatewayConfig {
    GatewayConfig {
        name: "test-gateway".to_string(),
        url: Some(server.uri()),
        timeout_secs: 5,
        ..GatewayConfig::default()
    }
}

async fn gateway_for(config: &GatewayConfig, dir: &TempDir) -> AgentCoreGateway {
    AgentCoreGateway::from_config(
        config,
        Arc::new(DatabaseIntegration::simulated()),
        Arc::new(LocalObjectStore::new(dir.path())),
    )
    .await
    .unwrap()
}

async fn mount_describe(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/gateways/test-gateway"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "gateway": {
                "gateways": [
                    {"type": "REST", "configuration": {"endpoints": [
                        {"name": "market-data-api", "url": "https://api.marketdata.com/v1"}
                    ]}},
                    {"type": "DATABASE", "configuration": {"connections": [
                        {"name": "analytics-postgres", "type": "PostgreSQL"}
                    ]}},
                    {"type": "S3", "configuration": {"buckets": [
                        {"name": "analytics-data-lake", "bucket": "lake-bucket"}
                    ]}}
                ]
            }
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_http_client_decodes_encoded_response_data() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/gateways/test-gateway/invoke"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "responseData": "{\"success\": true, \"data\": [1, 2, 3]}"
        })))
        .mount(&server)
        .await;

    let client = HttpGatewayClient::new(&server.uri(), 5).unwrap();
    let result = client
        .invoke("test-gateway", analytics_agent_gateway::GatewayType::Rest, &json!({}))
        .await
        .unwrap();
    assert_eq!(result["data"], json!([1, 2, 3]));
}

#[tokio::test]
async fn test_available_gateway_routes_calls_and_lists_connections() {
    let server = MockServer::start().await;
    mount_describe(&server).await;
    Mock::given(method("POST"))
        .and(path("/gateways/test-gateway/invoke"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "responseData": {"success": true, "data": {"rows": 7}}
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let gateway = gateway_for(&config_for(&server), &dir).await;
    assert!(gateway.is_available());

    let response = gateway
        .execute_database_query("analytics-postgres", "SELECT 1", &[])
        .await;
    assert!(response.gateway_used);
    assert_eq!(response.data["rows"], 7);

    let connections = gateway.list_available_connections();
    let names: Vec<_> = connections.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["market-data-api", "analytics-postgres", "analytics-data-lake"]);
    assert_eq!(connections[1].endpoint, "PostgreSQL Database");
    assert_eq!(connections[2].endpoint, "lake-bucket");
}

#[tokio::test]
async fn test_failed_invocation_falls_back_to_direct_path() {
    let server = MockServer::start().await;
    mount_describe(&server).await;
    Mock::given(method("POST"))
        .and(path("/gateways/test-gateway/invoke"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let gateway = gateway_for(&config_for(&server), &dir).await;

    let response = gateway
        .execute_database_query("analytics-postgres", "SELECT month FROM sales.transactions", &[])
        .await;
    assert!(!response.gateway_used);
    assert!(response.success);
    assert_eq!(response.data["row_count"], 5);
}

#[tokio::test]
async fn test_unreachable_gateway_starts_in_fallback_mode() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let gateway = gateway_for(&config_for(&server), &dir).await;
    assert!(!gateway.is_available());
    assert!(gateway.get_gateway_status().await.fallback_mode);
}

#[tokio::test]
async fn test_rest_fallback_calls_endpoint_directly() {
    let api = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/quotes"))
        .and(query_param("symbol", "AMZN"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"price": 185.5})))
        .mount(&api)
        .await;

    let dir = TempDir::new().unwrap();
    let gateway = gateway_for(&GatewayConfig::default(), &dir)
        .await
        .with_rest_endpoint("market-data-api", &api.uri());

    let response = gateway
        .execute_rest_call(&RestCall::new("market-data-api", "get", "/quotes").param("symbol", "AMZN"))
        .await;
    assert!(response.success);
    assert!(!response.gateway_used);
    assert_eq!(response.status_code, Some(200));
    assert_eq!(response.data["price"], 185.5);
}

#[tokio::test]
async fn test_rest_fallback_reports_error_status() {
    let api = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&api)
        .await;

    let dir = TempDir::new().unwrap();
    let gateway = gateway_for(&GatewayConfig::default(), &dir)
        .await
        .with_rest_endpoint("weather-api", &api.uri());

    let response = gateway
        .execute_rest_call(&RestCall::new("weather-api", "GET", "/forecast"))
        .await;
    assert!(!response.success);
    assert_eq!(response.status_code, Some(500));
    assert_eq!(response.data, "boom");
}
