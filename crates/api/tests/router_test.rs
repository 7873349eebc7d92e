use analytics_agent_api::build_router;
use analytics_agent_common::AgentConfig;
use analytics_agent_orchestrator::AnalyticsAgent;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

async fn router() -> (Router, TempDir) {
    let dir = TempDir::new().unwrap();
    let mut config = AgentConfig::default();
    config.storage.data_dir = dir.path().to_path_buf();
    let agent = AnalyticsAgent::from_config(config).await.unwrap();
    (build_router(Arc::new(agent)), dir)
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_health() {
    let (app, _dir) = router().await;
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(body_text(response).await, "OK");
}

#[tokio::test]
async fn test_get_query() {
    let (app, _dir) = router().await;
    let response = app
        .oneshot(
            Request::builder()
                .uri("/?query=show%20sales%20by%20region")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/plain"));
    assert!(body_text(response).await.starts_with("# Analytics Results"));
}

#[tokio::test]
async fn test_post_json_and_plain_text() {
    let (app, _dir) = router().await;
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"prompt": "top products", "session_id": "s1"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("## Recommendations"));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .body(Body::from("revenue trend over time"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.starts_with("# Analytics Results"));
}

#[tokio::test]
async fn test_post_invalid_utf8_is_server_error() {
    let (app, _dir) = router().await;
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .body(Body::from(vec![0xff, 0xfe, 0xfd]))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_text(response).await.starts_with("Error processing request:"));
}

#[tokio::test]
async fn test_status_reports_fallback_backends() {
    let (app, _dir) = router().await;
    let response = app
        .oneshot(Request::builder().uri("/status").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let status: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(status["status"], "healthy");
    assert!(status["mcp_tools"]["total_tools"].as_u64().unwrap() > 0);
    assert!(status.get("gateway").is_some());
    assert!(status.get("memory").is_some());
}

#[tokio::test]
async fn test_gateway_target_routes() {
    let (app, _dir) = router().await;
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/gateway/analyze")
                .body(Body::from(r#"{"data": [1, 2, 3], "analysis_type": "statistical"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/gateway/nope")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_retention_sweep_removes_old_conversations() {
    use analytics_agent_api::spawn_retention_sweep;
    use analytics_agent_common::ConversationRecord;
    use chrono::{Duration, Utc};

    let dir = TempDir::new().unwrap();
    let mut config = AgentConfig::default();
    config.storage.data_dir = dir.path().to_path_buf();
    let agent = Arc::new(AnalyticsAgent::from_config(config).await.unwrap());

    let store = agent.services().conversations.clone();
    for (query, age) in [("old", 45), ("recent", 1)] {
        let timestamp = Utc::now() - Duration::days(age);
        let record = ConversationRecord {
            session_id: "s1".to_string(),
            user_id: None,
            timestamp,
            query: query.to_string(),
            response: "r".to_string(),
            expires_at: Utc::now() + Duration::days(30),
        };
        store.insert_conversation(&record).await.unwrap();
    }

    let sweep = spawn_retention_sweep(agent.clone(), std::time::Duration::from_millis(20));
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    sweep.abort();

    let remaining = store.recent_conversations("s1", 10).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].query, "recent");
}
