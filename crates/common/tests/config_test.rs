use analytics_agent_common::config::AgentConfig;
use std::collections::HashMap;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_config_load_from_toml() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("test_config.toml");

    let config_content = r#"
[server]
host = "127.0.0.1"
port = 9090

[storage]
postgres_url = "postgresql://localhost/analytics"
redis_url = "redis://localhost:6379"
data_dir = "/tmp/analytics-data"

[memory]
conversation_memory_id = "mem-conv-1"
retention_days = 14
cache_size = 10

[gateway]
name = "test-gateway"
data_bucket = "test-bucket"

[mcp]
available_tools = ["postgres", "data-analysis"]
"#;

    fs::write(&config_path, config_content).unwrap();

    let config = AgentConfig::load(config_path.to_str().unwrap()).unwrap();

    assert_eq!(config.server.port, 9090);
    assert_eq!(config.storage.redis_url.as_deref(), Some("redis://localhost:6379"));
    assert_eq!(config.memory.retention_days, 14);
    assert_eq!(config.memory.cache_size, 10);
    // untouched fields keep their defaults
    assert_eq!(config.memory.cache_ttl_secs, 86_400);
    assert_eq!(config.gateway.data_key, "data/sample_sales_data.csv");
    assert_eq!(config.mcp.available_tools, vec!["postgres", "data-analysis"]);
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_validation_rejects_zero_cache_size() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("invalid_config.toml");

    fs::write(&config_path, "[memory]\ncache_size = 0\n").unwrap();

    let config = AgentConfig::load(config_path.to_str().unwrap()).unwrap();
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("cache_size"));
}

#[test]
fn test_config_load_missing_file_fails() {
    assert!(AgentConfig::load("/nonexistent/analytics.toml").is_err());
}

#[test]
fn test_overrides_from_lookup() {
    let env: HashMap<&str, &str> = HashMap::from([
        ("PORT", "3000"),
        ("CONVERSATION_MEMORY_ID", "conv-123"),
        ("SESSION_CONTEXT_MEMORY_ID", "ctx-456"),
        ("AGENTCORE_GATEWAY_URL", "http://gateway.local"),
        ("DATABASE_URL", "postgresql://db/analytics"),
    ]);

    let mut config = AgentConfig::default();
    config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

    assert_eq!(config.server.port, 3000);
    assert_eq!(config.gateway.url.as_deref(), Some("http://gateway.local"));
    assert_eq!(config.storage.postgres_url.as_deref(), Some("postgresql://db/analytics"));

    let ids = config.memory.memory_ids();
    assert_eq!(
        ids,
        vec![
            ("conversation", "conv-123".to_string()),
            ("session_context", "ctx-456".to_string()),
        ]
    );
}

#[test]
fn test_invalid_port_override_is_ignored() {
    let mut config = AgentConfig::default();
    config.apply_overrides(|key| (key == "PORT").then(|| "not-a-port".to_string()));
    assert_eq!(config.server.port, 8080);
}
