//! Durable conversation and preference storage.

use analytics_agent_common::{ConversationRecord, Result, UserPreferences};
use analytics_agent_storage::PostgresClient;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Primary record of every exchange and of user preferences
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn insert_conversation(&self, record: &ConversationRecord) -> Result<()>;

    /// Unexpired records, most recent first, at most `limit` of them
    async fn recent_conversations(&self, session_id: &str, limit: usize) -> Result<Vec<ConversationRecord>>;

    /// Remove records older than `cutoff`; returns how many were removed
    async fn delete_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;

    async fn get_preferences(&self, user_id: &str) -> Result<Option<UserPreferences>>;

    async fn put_preferences(&self, preferences: &UserPreferences) -> Result<()>;

    fn backend_name(&self) -> &'static str;
}

/// Process-local store used when no database is configured
#[derive(Default)]
pub struct InMemoryConversationStore {
    conversations: RwLock<Vec<ConversationRecord>>,
    preferences: RwLock<HashMap<String, UserPreferences>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn insert_conversation(&self, record: &ConversationRecord) -> Result<()> {
        let now = Utc::now();
        let mut conversations = self.conversations.write().await;
        conversations.retain(|r| r.expires_at > now);
        conversations.push(record.clone());
        Ok(())
    }

    async fn recent_conversations(&self, session_id: &str, limit: usize) -> Result<Vec<ConversationRecord>> {
        let now = Utc::now();
        let conversations = self.conversations.read().await;
        let mut matching: Vec<(usize, &ConversationRecord)> = conversations
            .iter()
            .enumerate()
            .filter(|(_, r)| r.session_id == session_id && r.expires_at > now)
            .collect();
        // newest first; later inserts win timestamp ties
        matching.sort_by(|a, b| b.1.timestamp.cmp(&a.1.timestamp).then(b.0.cmp(&a.0)));
        Ok(matching.into_iter().take(limit).map(|(_, r)| r.clone()).collect())
    }

    async fn delete_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut conversations = self.conversations.write().await;
        let before = conversations.len();
        conversations.retain(|r| r.timestamp >= cutoff);
        Ok((before - conversations.len()) as u64)
    }

    async fn get_preferences(&self, user_id: &str) -> Result<Option<UserPreferences>> {
        Ok(self.preferences.read().await.get(user_id).cloned())
    }

    async fn put_preferences(&self, preferences: &UserPreferences) -> Result<()> {
        self.preferences
            .write()
            .await
            .insert(preferences.user_id.clone(), preferences.clone());
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "in_memory"
    }
}

/// Postgres-backed store over the `conversations` and `user_preferences` tables
pub struct PostgresConversationStore {
    client: Arc<PostgresClient>,
}

impl PostgresConversationStore {
    pub fn new(client: Arc<PostgresClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ConversationStore for PostgresConversationStore {
    async fn insert_conversation(&self, record: &ConversationRecord) -> Result<()> {
        self.client.insert_conversation(record).await
    }

    async fn recent_conversations(&self, session_id: &str, limit: usize) -> Result<Vec<ConversationRecord>> {
        self.client.recent_conversations(session_id, limit).await
    }

    async fn delete_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        self.client.delete_conversations_before(cutoff).await
    }

    async fn get_preferences(&self, user_id: &str) -> Result<Option<UserPreferences>> {
        self.client.get_preferences(user_id).await
    }

    async fn put_preferences(&self, preferences: &UserPreferences) -> Result<()> {
        self.client.upsert_preferences(preferences).await
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(query: &str, expires_in: Duration) -> ConversationRecord {
        let timestamp = Utc::now();
        ConversationRecord {
            session_id: "s1".to_string(),
            user_id: None,
            timestamp,
            query: query.to_string(),
            response: "r".to_string(),
            expires_at: timestamp + expires_in,
        }
    }

    #[tokio::test]
    async fn test_expired_records_are_not_returned() {
        let store = InMemoryConversationStore::new();
        store.conversations.write().await.push(record("stale", Duration::days(-15)));
        store.conversations.write().await.push(record("live", Duration::days(30)));

        let records = store.recent_conversations("s1", 10).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].query, "live");
    }

    #[tokio::test]
    async fn test_insert_prunes_expired_records() {
        let store = InMemoryConversationStore::new();
        store.conversations.write().await.push(record("stale", Duration::days(-15)));

        store.insert_conversation(&record("fresh", Duration::days(30))).await.unwrap();
        assert_eq!(store.conversations.read().await.len(), 1);
        assert!(store.recent_conversations("s1", 10).await.unwrap().iter().all(|r| r.query == "fresh"));
    }
}
