//! Conversation memory: a durable store with an optional Redis read-through cache.

use crate::store::ConversationStore;
use analytics_agent_common::{ConversationRecord, MemoryConfig, Result, UserPreferences};
use analytics_agent_storage::RedisCache;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// One exchange as returned to callers and kept in the cache list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub query: String,
    pub response: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl From<ConversationRecord> for ConversationEntry {
    fn from(record: ConversationRecord) -> Self {
        Self {
            query: record.query,
            response: record.response,
            timestamp: record.timestamp,
            user_id: record.user_id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionContext {
    pub session_id: String,
    pub conversation_history: Vec<ConversationEntry>,
    pub cache_available: bool,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_preferences: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationStats {
    pub session_id: String,
    pub total_conversations: usize,
    pub avg_query_length: f64,
    pub time_span_minutes: f64,
    pub first_conversation: DateTime<Utc>,
    pub last_conversation: DateTime<Utc>,
    pub cache_active: bool,
}

/// How many exchanges `get_conversation_stats` looks at
const STATS_WINDOW: usize = 100;

pub const DEFAULT_HISTORY_LIMIT: usize = 10;

fn cache_key(session_id: &str) -> String {
    format!("conversation:{}", session_id)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub struct ConversationMemory {
    store: Arc<dyn ConversationStore>,
    cache: Option<Arc<RedisCache>>,
    retention_days: u32,
    cache_size: usize,
    cache_ttl_secs: u64,
}

impl ConversationMemory {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        cache: Option<Arc<RedisCache>>,
        config: &MemoryConfig,
    ) -> Self {
        info!(
            backend = store.backend_name(),
            cache = cache.is_some(),
            "Conversation memory initialized"
        );
        Self {
            store,
            cache,
            retention_days: config.retention_days,
            cache_size: config.cache_size,
            cache_ttl_secs: config.cache_ttl_secs,
        }
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    pub fn retention_days(&self) -> u32 {
        self.retention_days
    }

    pub async fn is_cache_available(&self) -> bool {
        match &self.cache {
            Some(cache) => cache.is_healthy().await,
            None => false,
        }
    }

    /// Persist an exchange, then push it onto the session's cache list.
    /// Returns false when the durable write fails.
    pub async fn store_conversation(
        &self,
        session_id: &str,
        query: &str,
        response: &str,
        user_id: Option<&str>,
    ) -> bool {
        let now = Utc::now();
        let record = ConversationRecord {
            session_id: session_id.to_string(),
            user_id: user_id.map(str::to_string),
            timestamp: now,
            query: query.to_string(),
            response: response.to_string(),
            expires_at: now + Duration::days(i64::from(self.retention_days)),
        };

        if let Err(e) = self.store.insert_conversation(&record).await {
            error!("Failed to store conversation: {}", e);
            return false;
        }
        debug!("Stored conversation for session {}", session_id);

        self.cache_exchange(session_id, record.into()).await;
        true
    }

    async fn cache_exchange(&self, session_id: &str, entry: ConversationEntry) {
        let Some(cache) = &self.cache else {
            return;
        };
        let payload = match serde_json::to_string(&entry) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Failed to encode cached conversation: {}", e);
                return;
            }
        };
        if let Err(e) = cache
            .push_capped(&cache_key(session_id), &payload, self.cache_size, self.cache_ttl_secs)
            .await
        {
            warn!("Failed to cache in Redis: {:#}", e);
        }
    }

    /// Most recent first. Served from the cache when it has entries.
    pub async fn get_conversation_history(&self, session_id: &str, limit: usize) -> Vec<ConversationEntry> {
        if limit == 0 {
            return Vec::new();
        }

        if let Some(cached) = self.cached_history(session_id, limit).await {
            if !cached.is_empty() {
                debug!("Retrieved {} conversations from Redis cache", cached.len());
                return cached;
            }
        }

        match self.store.recent_conversations(session_id, limit).await {
            Ok(records) => records.into_iter().map(ConversationEntry::from).collect(),
            Err(e) => {
                error!("Failed to retrieve conversation history: {}", e);
                Vec::new()
            }
        }
    }

    async fn cached_history(&self, session_id: &str, limit: usize) -> Option<Vec<ConversationEntry>> {
        let cache = self.cache.as_ref()?;
        let stop = limit.saturating_sub(1) as isize;
        match cache.list_range(&cache_key(session_id), 0, stop).await {
            // entries that fail to decode are skipped
            Ok(raw) => Some(
                raw.iter()
                    .filter_map(|item| serde_json::from_str(item).ok())
                    .collect(),
            ),
            Err(e) => {
                warn!("Redis cache retrieval failed: {:#}", e);
                None
            }
        }
    }

    pub async fn get_user_preferences(&self, user_id: &str) -> Option<UserPreferences> {
        match self.store.get_preferences(user_id).await {
            Ok(preferences) => preferences,
            Err(e) => {
                error!("Failed to get user preferences: {}", e);
                None
            }
        }
    }

    /// Replace the preference document; the stored version is incremented
    pub async fn update_user_preferences(&self, user_id: &str, preferences: Map<String, Value>) -> bool {
        let current_version = self
            .get_user_preferences(user_id)
            .await
            .map(|p| p.version)
            .unwrap_or(0);

        let document = UserPreferences {
            user_id: user_id.to_string(),
            preferences,
            version: current_version + 1,
            updated_at: Utc::now(),
        };

        match self.store.put_preferences(&document).await {
            Ok(()) => {
                debug!("Updated preferences for user {} to version {}", user_id, document.version);
                true
            }
            Err(e) => {
                error!("Failed to update user preferences: {}", e);
                false
            }
        }
    }

    /// Recent history plus the preferences of the first user id seen in it
    pub async fn get_session_context(&self, session_id: &str, include_preferences: bool) -> SessionContext {
        let history = self
            .get_conversation_history(session_id, DEFAULT_HISTORY_LIMIT)
            .await;
        let mut context = SessionContext {
            session_id: session_id.to_string(),
            cache_available: self.is_cache_available().await,
            timestamp: Utc::now(),
            user_id: None,
            user_preferences: None,
            conversation_history: history,
        };

        if include_preferences {
            let user_id = context
                .conversation_history
                .iter()
                .find_map(|entry| entry.user_id.clone());
            if let Some(user_id) = user_id {
                context.user_preferences = Some(
                    self.get_user_preferences(&user_id)
                        .await
                        .map(|p| p.preferences)
                        .unwrap_or_default(),
                );
                context.user_id = Some(user_id);
            }
        }
        context
    }

    /// Drop the cached history of a session. Durable records are kept.
    pub async fn clear_session(&self, session_id: &str) -> bool {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.delete(&cache_key(session_id)).await {
                error!("Failed to clear session: {:#}", e);
                return false;
            }
        }
        info!("Cleared session {}", session_id);
        true
    }

    /// `None` when the session has no history
    pub async fn get_conversation_stats(&self, session_id: &str) -> Option<ConversationStats> {
        let history = self.get_conversation_history(session_id, STATS_WINDOW).await;
        let first = history.iter().map(|e| e.timestamp).min()?;
        let last = history.iter().map(|e| e.timestamp).max()?;

        let words: usize = history.iter().map(|e| e.query.split_whitespace().count()).sum();
        let avg_query_length = words as f64 / history.len() as f64;
        let span_minutes = (last - first).num_milliseconds() as f64 / 60_000.0;

        Some(ConversationStats {
            session_id: session_id.to_string(),
            total_conversations: history.len(),
            avg_query_length: round1(avg_query_length),
            time_span_minutes: round1(span_minutes),
            first_conversation: first,
            last_conversation: last,
            cache_active: self.is_cache_available().await,
        })
    }
}
