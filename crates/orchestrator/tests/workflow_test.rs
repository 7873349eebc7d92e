use analytics_agent_common::AgentConfig;
use analytics_agent_orchestrator::{AnalyticsAgent, Stage};
use tempfile::TempDir;

async fn agent() -> (AnalyticsAgent, TempDir) {
    let dir = TempDir::new().unwrap();
    let mut config = AgentConfig::default();
    config.storage.data_dir = dir.path().to_path_buf();
    let agent = AnalyticsAgent::from_config(config).await.unwrap();
    (agent, dir)
}

#[tokio::test]
async fn test_query_returns_markdown() {
    let (agent, _dir) = agent().await;
    let text = agent.process_query("Show sales by region for Q1", None, None).await;

    assert!(text.starts_with("# Analytics Results"));
    assert!(text.contains("## Recommendations"));
}

#[tokio::test]
async fn test_run_without_session_skips_nothing_but_error_handler() {
    let (agent, _dir) = agent().await;
    let response = agent.run("What are the top products?", None, None).await;

    assert!(response.success);
    assert!(response.error.is_none());
    assert_eq!(response.stages.len(), 7);
    assert!(!response.stages.contains(&Stage::ErrorHandler));
    assert!(response.completed_tasks.contains(&"primary_analysis".to_string()));
    assert!(!response.recommendations.is_empty());
    assert!(response.recommendations.len() <= 7);
}

#[tokio::test]
async fn test_session_history_feeds_later_queries() {
    let (agent, _dir) = agent().await;
    agent.run("Show revenue by region", Some("s1"), Some("u1")).await;
    let second = agent.run("Compare sales performance by product", Some("s1"), Some("u1")).await;

    let history = agent.services().memory.get_conversation_history("s1", 10).await;
    assert_eq!(history.len(), 2);

    let context = second.context.unwrap();
    assert_eq!(context.related_queries, vec!["Show revenue by region"]);
    let summary = context.conversation_summary.unwrap();
    assert!(summary.contains("focusing on"));

    let prefs = agent.services().memory.get_user_preferences("u1").await;
    assert!(prefs.contains_key("domain"));
    assert!(prefs.contains_key("complexity_level"));
}

#[tokio::test]
async fn test_successful_run_is_learned() {
    let (agent, _dir) = agent().await;
    agent.run("Forecast sales growth", Some("s2"), None).await;

    let summary = agent.services().context.get_context_summary(Some("s2"), None);
    assert_eq!(summary.total_patterns, 1);
    assert_eq!(summary.active_sessions, 1);
}
