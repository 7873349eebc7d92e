//! AgentCore Memory integration with fallback to [`ConversationMemory`].

use crate::memory::{ConversationEntry, ConversationMemory};
use analytics_agent_common::MemoryConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

/// Filter for listing records of one memory resource
#[derive(Debug, Clone, Default)]
pub struct RecordFilter<'a> {
    pub session_id: Option<&'a str>,
    pub user_id: Option<&'a str>,
    pub max_results: Option<usize>,
}

#[async_trait]
pub trait MemoryService: Send + Sync {
    /// Metadata document of a memory resource
    async fn get_memory(&self, memory_id: &str) -> Result<Value>;

    async fn put_record(
        &self,
        memory_id: &str,
        content: &Value,
        session_id: Option<&str>,
        user_id: Option<&str>,
    ) -> Result<()>;

    /// Raw record contents, newest first
    async fn list_records(&self, memory_id: &str, filter: RecordFilter<'_>) -> Result<Vec<String>>;
}

/// JSON-over-HTTP client for the managed memory service
#[derive(Debug, Clone)]
pub struct HttpMemoryService {
    base_url: String,
    client: Client,
}

impl HttpMemoryService {
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

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Memory service returned error status {}: {}", status, error_text);
        }
        Ok(response)
    }
}

#[derive(Deserialize)]
struct RecordList {
    #[serde(rename = "memoryContents", default)]
    memory_contents: Vec<RecordItem>,
}

#[derive(Deserialize)]
struct RecordItem {
    #[serde(default)]
    content: String,
}

#[async_trait]
impl MemoryService for HttpMemoryService {
    async fn get_memory(&self, memory_id: &str) -> Result<Value> {
        let response = self
            .client
            .get(format!("{}/memories/{}", self.base_url, memory_id))
            .send()
            .await
            .context("Failed to reach memory service")?;
        Self::check(response)
            .await?
            .json()
            .await
            .context("Failed to parse memory metadata")
    }

    async fn put_record(
        &self,
        memory_id: &str,
        content: &Value,
        session_id: Option<&str>,
        user_id: Option<&str>,
    ) -> Result<()> {
        let mut payload = json!({ "content": content.to_string() });
        if let Some(session_id) = session_id {
            payload["sessionId"] = json!(session_id);
        }
        if let Some(user_id) = user_id {
            payload["userId"] = json!(user_id);
        }

        let response = self
            .client
            .post(format!("{}/memories/{}/records", self.base_url, memory_id))
            .json(&payload)
            .send()
            .await
            .context("Failed to send memory record")?;
        Self::check(response).await?;
        Ok(())
    }

    async fn list_records(&self, memory_id: &str, filter: RecordFilter<'_>) -> Result<Vec<String>> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(session_id) = filter.session_id {
            query.push(("sessionId", session_id.to_string()));
        }
        if let Some(user_id) = filter.user_id {
            query.push(("userId", user_id.to_string()));
        }
        if let Some(max) = filter.max_results {
            query.push(("maxResults", max.to_string()));
        }

        let response = self
            .client
            .get(format!("{}/memories/{}/records", self.base_url, memory_id))
            .query(&query)
            .send()
            .await
            .context("Failed to list memory records")?;
        let list: RecordList = Self::check(response)
            .await?
            .json()
            .await
            .context("Failed to parse memory records")?;
        Ok(list.memory_contents.into_iter().map(|item| item.content).collect())
    }
}

/// Result of a memory write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryOutcome {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_id: Option<String>,
    #[serde(default)]
    pub fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MemoryOutcome {
    fn stored(message: &str, memory_id: &str) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            memory_id: Some(memory_id.to_string()),
            fallback: false,
            error: None,
        }
    }

    fn traditional(success: bool) -> Self {
        Self {
            success,
            message: "Stored using traditional memory system".to_string(),
            memory_id: None,
            fallback: true,
            error: None,
        }
    }

    fn failed(message: &str, error: Option<String>) -> Self {
        Self {
            success: false,
            message: message.to_string(),
            memory_id: None,
            fallback: false,
            error,
        }
    }
}

pub struct AgentCoreMemory {
    service: Option<Arc<dyn MemoryService>>,
    memory_ids: BTreeMap<&'static str, String>,
    traditional: Arc<ConversationMemory>,
    fallback_to_traditional: bool,
}

impl AgentCoreMemory {
    /// HTTP service from `service_url` when set, otherwise traditional memory only
    pub fn from_config(
        config: &MemoryConfig,
        timeout_secs: u64,
        traditional: Arc<ConversationMemory>,
    ) -> Result<Self> {
        let service: Option<Arc<dyn MemoryService>> = match config.service_url.as_deref() {
            Some(url) => Some(Arc::new(HttpMemoryService::new(url, timeout_secs)?)),
            None => None,
        };
        Ok(Self::new(service, config, traditional))
    }

    pub fn new(
        service: Option<Arc<dyn MemoryService>>,
        config: &MemoryConfig,
        traditional: Arc<ConversationMemory>,
    ) -> Self {
        let memory_ids: BTreeMap<&'static str, String> = config.memory_ids().into_iter().collect();
        let memory = Self {
            service,
            memory_ids,
            traditional,
            fallback_to_traditional: config.fallback_to_traditional,
        };
        info!(
            available = memory.is_available(),
            memories = ?memory.memory_ids.keys().collect::<Vec<_>>(),
            "AgentCore Memory integration initialized"
        );
        memory
    }

    pub fn is_available(&self) -> bool {
        self.service.is_some() && !self.memory_ids.is_empty()
    }

    pub fn traditional(&self) -> &Arc<ConversationMemory> {
        &self.traditional
    }

    fn resource(&self, kind: &str, label: &str) -> Result<(&Arc<dyn MemoryService>, &str)> {
        let service = self
            .service
            .as_ref()
            .context("AgentCore Memory not available")?;
        let id = self
            .memory_ids
            .get(kind)
            .with_context(|| format!("{} memory ID not configured", label))?;
        Ok((service, id.as_str()))
    }

    pub async fn health_check(&self) -> Value {
        let Some(service) = self.service.as_ref().filter(|_| self.is_available()) else {
            return json!({
                "success": false,
                "message": "AgentCore Memory not available",
                "fallback_available": self.fallback_to_traditional,
            });
        };

        let mut memories = Vec::with_capacity(self.memory_ids.len());
        for (kind, id) in &self.memory_ids {
            match service.get_memory(id).await {
                Ok(info) => memories.push(json!({
                    "type": kind,
                    "id": id,
                    "status": "healthy",
                    "name": info.get("memoryName").and_then(Value::as_str).unwrap_or("unknown"),
                })),
                Err(e) => memories.push(json!({
                    "type": kind,
                    "id": id,
                    "status": "error",
                    "error": format!("{:#}", e),
                })),
            }
        }
        let healthy_count = memories.iter().filter(|m| m["status"] == "healthy").count();

        json!({
            "success": true,
            "message": "Direct health check completed",
            "memories": memories,
            "healthy_count": healthy_count,
        })
    }

    #[instrument(skip(self, query, response, metadata))]
    pub async fn store_conversation(
        &self,
        session_id: &str,
        user_id: Option<&str>,
        query: &str,
        response: &str,
        metadata: Value,
    ) -> MemoryOutcome {
        if !self.is_available() {
            return self.fallback_store_conversation(session_id, user_id, query, response).await;
        }

        let content = json!({
            "session_id": session_id,
            "user_id": user_id,
            "query": query,
            "response": response,
            "timestamp": Utc::now(),
            "metadata": metadata,
        });
        let result = async {
            let (service, id) = self.resource("conversation", "Conversation")?;
            service.put_record(id, &content, Some(session_id), user_id).await?;
            Ok::<_, anyhow::Error>(id.to_string())
        }
        .await;

        match result {
            Ok(id) => {
                info!("Stored conversation in AgentCore Memory: {}", session_id);
                MemoryOutcome::stored("Conversation stored in AgentCore Memory", &id)
            }
            Err(e) => {
                error!("Failed to store conversation in AgentCore Memory: {:#}", e);
                if self.fallback_to_traditional {
                    self.fallback_store_conversation(session_id, user_id, query, response).await
                } else {
                    MemoryOutcome::failed("Failed to store conversation", Some(format!("{:#}", e)))
                }
            }
        }
    }

    async fn fallback_store_conversation(
        &self,
        session_id: &str,
        user_id: Option<&str>,
        query: &str,
        response: &str,
    ) -> MemoryOutcome {
        info!("Using traditional memory fallback for conversation storage");
        let stored = self
            .traditional
            .store_conversation(session_id, query, response, user_id)
            .await;
        MemoryOutcome::traditional(stored)
    }

    pub async fn get_conversation_history(&self, session_id: &str, limit: usize) -> Vec<ConversationEntry> {
        if !self.is_available() {
            return self.traditional.get_conversation_history(session_id, limit).await;
        }

        let result = async {
            let (service, id) = self.resource("conversation", "Conversation")?;
            let filter = RecordFilter {
                session_id: Some(session_id),
                max_results: Some(limit),
                ..Default::default()
            };
            service.list_records(id, filter).await
        }
        .await;

        match result {
            Ok(records) => {
                let entries: Vec<ConversationEntry> = records
                    .iter()
                    .filter_map(|raw| match serde_json::from_str(raw) {
                        Ok(entry) => Some(entry),
                        Err(e) => {
                            warn!("Failed to parse memory content: {}", e);
                            None
                        }
                    })
                    .take(limit)
                    .collect();
                info!("Retrieved {} conversations from AgentCore Memory", entries.len());
                entries
            }
            Err(e) => {
                error!("Failed to retrieve conversation history from AgentCore Memory: {:#}", e);
                if self.fallback_to_traditional {
                    self.traditional.get_conversation_history(session_id, limit).await
                } else {
                    Vec::new()
                }
            }
        }
    }

    pub async fn store_user_preferences(&self, user_id: &str, preferences: Map<String, Value>) -> MemoryOutcome {
        if !self.is_available() {
            info!("Using traditional memory fallback for user preferences storage");
            let stored = self.traditional.update_user_preferences(user_id, preferences).await;
            return MemoryOutcome::traditional(stored);
        }

        let content = json!({
            "user_id": user_id,
            "preferences": preferences,
            "updated_at": Utc::now(),
        });
        let result = async {
            let (service, id) = self.resource("user_preferences", "User preferences")?;
            service.put_record(id, &content, None, Some(user_id)).await?;
            Ok::<_, anyhow::Error>(id.to_string())
        }
        .await;

        match result {
            Ok(id) => {
                info!("Stored user preferences in AgentCore Memory: {}", user_id);
                MemoryOutcome::stored("User preferences stored in AgentCore Memory", &id)
            }
            Err(e) => {
                error!("Failed to store user preferences in AgentCore Memory: {:#}", e);
                if self.fallback_to_traditional {
                    let stored = self.traditional.update_user_preferences(user_id, preferences).await;
                    MemoryOutcome::traditional(stored)
                } else {
                    MemoryOutcome::failed("Failed to store user preferences", Some(format!("{:#}", e)))
                }
            }
        }
    }

    pub async fn get_user_preferences(&self, user_id: &str) -> Map<String, Value> {
        if !self.is_available() {
            return self.traditional_preferences(user_id).await;
        }

        let result = async {
            let (service, id) = self.resource("user_preferences", "User preferences")?;
            let filter = RecordFilter {
                user_id: Some(user_id),
                ..Default::default()
            };
            service.list_records(id, filter).await
        }
        .await;

        match result {
            Ok(records) => find_record(&records, "user_id", user_id, "preferences"),
            Err(e) => {
                error!("Failed to retrieve user preferences from AgentCore Memory: {:#}", e);
                if self.fallback_to_traditional {
                    self.traditional_preferences(user_id).await
                } else {
                    Map::new()
                }
            }
        }
    }

    async fn traditional_preferences(&self, user_id: &str) -> Map<String, Value> {
        self.traditional
            .get_user_preferences(user_id)
            .await
            .map(|p| p.preferences)
            .unwrap_or_default()
    }

    /// Session context lives only in the managed service
    pub async fn store_session_context(&self, session_id: &str, context: Value) -> MemoryOutcome {
        if !self.is_available() {
            return MemoryOutcome::failed("AgentCore Memory not available", None);
        }

        let content = json!({
            "session_id": session_id,
            "context": context,
            "timestamp": Utc::now(),
        });
        let result = async {
            let (service, id) = self.resource("session_context", "Session context")?;
            service.put_record(id, &content, Some(session_id), None).await?;
            Ok::<_, anyhow::Error>(id.to_string())
        }
        .await;

        match result {
            Ok(id) => MemoryOutcome::stored("Session context stored in AgentCore Memory", &id),
            Err(e) => {
                error!("Failed to store session context in AgentCore Memory: {:#}", e);
                MemoryOutcome::failed("Failed to store session context", Some(format!("{:#}", e)))
            }
        }
    }

    pub async fn get_session_context(&self, session_id: &str) -> Map<String, Value> {
        if !self.is_available() {
            return Map::new();
        }

        let result = async {
            let (service, id) = self.resource("session_context", "Session context")?;
            let filter = RecordFilter {
                session_id: Some(session_id),
                ..Default::default()
            };
            service.list_records(id, filter).await
        }
        .await;

        match result {
            Ok(records) => find_record(&records, "session_id", session_id, "context"),
            Err(e) => {
                error!("Failed to retrieve session context from AgentCore Memory: {:#}", e);
                Map::new()
            }
        }
    }
}

/// `field` of the first record whose `key` equals `expected`
fn find_record(records: &[String], key: &str, expected: &str, field: &str) -> Map<String, Value> {
    records
        .iter()
        .filter_map(|raw| serde_json::from_str::<Value>(raw).ok())
        .find(|content| content.get(key).and_then(Value::as_str) == Some(expected))
        .and_then(|content| content.get(field).and_then(Value::as_object).cloned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_record_matches_key() {
        let records = vec![
            "not json".to_string(),
            r#"{"user_id":"u2","preferences":{"a":1}}"#.to_string(),
            r#"{"user_id":"u1","preferences":{"chart":"line"}}"#.to_string(),
        ];
        let prefs = find_record(&records, "user_id", "u1", "preferences");
        assert_eq!(prefs["chart"], "line");
        assert!(find_record(&records, "user_id", "u3", "preferences").is_empty());
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = MemoryOutcome::traditional(true);
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["fallback"], true);
        assert!(value.get("memory_id").is_none());
    }
}
