use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{AnalyticsError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub memory: MemoryConfig,
    pub gateway: GatewayConfig,
    pub identity: IdentityConfig,
    pub mcp: McpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub postgres_url: Option<String>,
    pub redis_url: Option<String>,
    /// Root directory of the local object store used when S3 is unreachable.
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            postgres_url: None,
            redis_url: None,
            data_dir: PathBuf::from("data"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub conversation_memory_id: Option<String>,
    pub user_preferences_memory_id: Option<String>,
    pub session_context_memory_id: Option<String>,
    pub analytics_context_memory_id: Option<String>,
    /// Base URL of the managed memory service
    pub service_url: Option<String>,
    pub conversation_table: String,
    pub preferences_table: String,
    pub retention_days: u32,
    pub cache_size: usize,
    pub cache_ttl_secs: u64,
    pub fallback_to_traditional: bool,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            conversation_memory_id: None,
            user_preferences_memory_id: None,
            session_context_memory_id: None,
            analytics_context_memory_id: None,
            service_url: None,
            conversation_table: "production-analytics-agent-conversation-history".to_string(),
            preferences_table: "production-analytics-agent-user-preferences".to_string(),
            retention_days: 30,
            cache_size: 20,
            cache_ttl_secs: 86_400,
            fallback_to_traditional: true,
        }
    }
}

impl MemoryConfig {
    /// Configured memory resources as `(kind, id)` pairs, unset ones skipped.
    pub fn memory_ids(&self) -> Vec<(&'static str, String)> {
        [
            ("conversation", &self.conversation_memory_id),
            ("user_preferences", &self.user_preferences_memory_id),
            ("session_context", &self.session_context_memory_id),
            ("analytics_context", &self.analytics_context_memory_id),
        ]
        .into_iter()
        .filter_map(|(kind, id)| id.clone().map(|id| (kind, id)))
        .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub name: String,
    pub region: String,
    /// Managed gateway endpoint; no URL means the gateway runs in fallback mode.
    pub url: Option<String>,
    pub data_bucket: String,
    pub data_key: String,
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            name: "production-analytics-gateway".to_string(),
            region: "us-west-2".to_string(),
            url: None,
            data_bucket: "production-analytics-agent-agent-logs-839dae02".to_string(),
            data_key: "data/sample_sales_data.csv".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub oauth_provider: String,
    pub client_id: Option<String>,
    pub scopes: Vec<String>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            oauth_provider: "cognito".to_string(),
            client_id: None,
            scopes: vec!["openid".to_string(), "profile".to_string(), "email".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct McpConfig {
    /// Tool servers treated as reachable
    pub available_tools: Vec<String>,
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            available_tools: vec![
                "aws-docs".to_string(),
                "filesystem".to_string(),
                "postgres".to_string(),
            ],
        }
    }
}

impl AgentConfig {
    /// Load from a TOML file, then apply environment overrides.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: AgentConfig = toml::from_str(&content)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Defaults plus environment overrides, for deployments without a config file.
    pub fn from_env() -> Self {
        let mut config = AgentConfig::default();
        config.apply_env_overrides();
        config
    }

    /// Load `path` when it exists, otherwise fall back to the environment.
    pub fn load_or_env(path: &str) -> anyhow::Result<Self> {
        if std::path::Path::new(path).exists() {
            Self::load(path)
        } else {
            tracing::info!("Config file {} not found, using environment", path);
            Ok(Self::from_env())
        }
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok().filter(|v| !v.is_empty()));
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }

        if let Some(url) = lookup("POSTGRES_CONNECTION_STRING").or_else(|| lookup("DATABASE_URL")) {
            self.storage.postgres_url = Some(url);
        }
        if let Some(url) = lookup("REDIS_URL") {
            self.storage.redis_url = Some(url);
        }
        if let Some(dir) = lookup("DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }

        let memory = &mut self.memory;
        for (key, slot) in [
            ("CONVERSATION_MEMORY_ID", &mut memory.conversation_memory_id),
            ("USER_PREFERENCES_MEMORY_ID", &mut memory.user_preferences_memory_id),
            ("SESSION_CONTEXT_MEMORY_ID", &mut memory.session_context_memory_id),
            ("ANALYTICS_CONTEXT_MEMORY_ID", &mut memory.analytics_context_memory_id),
            ("AGENTCORE_MEMORY_URL", &mut memory.service_url),
        ] {
            if let Some(value) = lookup(key) {
                *slot = Some(value);
            }
        }
        if let Some(table) = lookup("CONVERSATION_TABLE") {
            memory.conversation_table = table;
        }
        if let Some(table) = lookup("USER_PREFERENCES_TABLE") {
            memory.preferences_table = table;
        }

        if let Some(name) = lookup("AGENTCORE_GATEWAY_NAME") {
            self.gateway.name = name;
        }
        if let Some(region) = lookup("AWS_REGION") {
            self.gateway.region = region;
        }
        if let Some(url) = lookup("AGENTCORE_GATEWAY_URL") {
            self.gateway.url = Some(url);
        }
        if let Some(bucket) = lookup("DATA_BUCKET") {
            self.gateway.data_bucket = bucket;
        }
        if let Some(key) = lookup("DATA_KEY") {
            self.gateway.data_key = key;
        }

        if let Some(provider) = lookup("OAUTH_PROVIDER") {
            self.identity.oauth_provider = provider;
        }
        if let Some(client_id) = lookup("OAUTH_CLIENT_ID") {
            self.identity.client_id = Some(client_id);
        }

        if let Some(tools) = lookup("MCP_AVAILABLE_TOOLS") {
            self.mcp.available_tools = tools
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect();
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(AnalyticsError::Config("server.port must be non-zero".to_string()));
        }
        if self.memory.cache_size == 0 {
            return Err(AnalyticsError::Config("memory.cache_size must be at least 1".to_string()));
        }
        if self.memory.retention_days == 0 {
            return Err(AnalyticsError::Config("memory.retention_days must be at least 1".to_string()));
        }
        if self.gateway.data_bucket.trim().is_empty() {
            return Err(AnalyticsError::Config("gateway.data_bucket must not be empty".to_string()));
        }
        Ok(())
    }
}
