use analytics_agent_common::MemoryConfig;
use analytics_agent_history::{AgentCoreMemory, ConversationMemory, InMemoryConversationStore};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn traditional() -> Arc<ConversationMemory> {
    Arc::new(ConversationMemory::new(
        Arc::new(InMemoryConversationStore::new()),
        None,
        &MemoryConfig::default(),
    ))
}

fn config(url: Option<String>) -> MemoryConfig {
    MemoryConfig {
        conversation_memory_id: Some("mem-conv".to_string()),
        user_preferences_memory_id: Some("mem-prefs".to_string()),
        service_url: url,
        ..MemoryConfig::default()
    }
}

#[tokio::test]
async fn test_without_service_uses_traditional_memory() {
    let memory = AgentCoreMemory::from_config(&config(None), 5, traditional()).unwrap();
    assert!(!memory.is_available());

    let outcome = memory
        .store_conversation("s1", Some("u1"), "show sales", "done", json!({}))
        .await;
    assert!(outcome.success);
    assert!(outcome.fallback);

    let history = memory.get_conversation_history("s1", 10).await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].query, "show sales");

    let health = memory.health_check().await;
    assert_eq!(health["success"], false);
    assert_eq!(health["fallback_available"], true);
}

#[tokio::test]
async fn test_store_and_read_through_service() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/memories/mem-conv/records"))
        .and(body_partial_json(json!({"sessionId": "s1", "userId": "u1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let stored = json!({
        "session_id": "s1",
        "user_id": "u1",
        "query": "top regions",
        "response": "Europe",
        "timestamp": "2024-05-01T10:00:00Z",
        "metadata": {}
    });
    Mock::given(method("GET"))
        .and(path("/memories/mem-conv/records"))
        .and(query_param("sessionId", "s1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "memoryContents": [{"content": stored.to_string()}, {"content": "garbage"}]
        })))
        .mount(&server)
        .await;

    let memory = AgentCoreMemory::from_config(&config(Some(server.uri())), 5, traditional()).unwrap();
    assert!(memory.is_available());

    let outcome = memory
        .store_conversation("s1", Some("u1"), "top regions", "Europe", json!({"source": "test"}))
        .await;
    assert!(outcome.success);
    assert!(!outcome.fallback);
    assert_eq!(outcome.memory_id.as_deref(), Some("mem-conv"));

    let history = memory.get_conversation_history("s1", 10).await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].response, "Europe");
}

#[tokio::test]
async fn test_service_errors_fall_back() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let traditional = traditional();
    let memory =
        AgentCoreMemory::from_config(&config(Some(server.uri())), 5, traditional.clone()).unwrap();

    let outcome = memory.store_conversation("s2", None, "q", "r", json!({})).await;
    assert!(outcome.success);
    assert!(outcome.fallback);
    assert_eq!(traditional.get_conversation_history("s2", 5).await.len(), 1);

    let prefs = json!({"chart": "pie"}).as_object().cloned().unwrap();
    let outcome = memory.store_user_preferences("u1", prefs).await;
    assert!(outcome.fallback);
    assert_eq!(memory.get_user_preferences("u1").await["chart"], "pie");
}

#[tokio::test]
async fn test_health_check_reports_each_memory() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/memories/mem-conv"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"memoryName": "conversations"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/memories/mem-prefs"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let memory = AgentCoreMemory::from_config(&config(Some(server.uri())), 5, traditional()).unwrap();
    let health = memory.health_check().await;

    assert_eq!(health["success"], true);
    assert_eq!(health["healthy_count"], 1);
    let memories = health["memories"].as_array().unwrap();
    assert_eq!(memories.len(), 2);
    assert!(memories
        .iter()
        .any(|m| m["name"] == "conversations" && m["type"] == "conversation"));
}

#[tokio::test]
async fn test_session_context_requires_service() {
    let memory = AgentCoreMemory::from_config(&config(None), 5, traditional()).unwrap();
    let outcome = memory.store_session_context("s1", json!({"topic": "sales"})).await;
    assert!(!outcome.success);
    assert!(memory.get_session_context("s1").await.is_empty());
}
