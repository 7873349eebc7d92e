use crate::store::ConversationStore;
use analytics_agent_common::Result;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleanupReport {
    pub deleted_count: u64,
    pub message: String,
    pub cutoff_date: DateTime<Utc>,
}

/// Delete conversations older than `retention_days`
pub async fn cleanup_expired(store: &dyn ConversationStore, retention_days: u32) -> Result<CleanupReport> {
    cleanup_before(store, Utc::now() - Duration::days(i64::from(retention_days))).await
}

pub async fn cleanup_before(store: &dyn ConversationStore, cutoff: DateTime<Utc>) -> Result<CleanupReport> {
    let deleted_count = store.delete_before(cutoff).await?;
    info!(deleted_count, %cutoff, "Cleaned up old conversation records");
    Ok(CleanupReport {
        deleted_count,
        message: format!("Successfully cleaned up {} records", deleted_count),
        cutoff_date: cutoff,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryConversationStore;
    use analytics_agent_common::ConversationRecord;

    fn record(session: &str, age_days: i64) -> ConversationRecord {
        let timestamp = Utc::now() - Duration::days(age_days);
        ConversationRecord {
            session_id: session.to_string(),
            user_id: None,
            timestamp,
            query: "q".to_string(),
            response: "r".to_string(),
            expires_at: Utc::now() + Duration::days(30),
        }
    }

    #[tokio::test]
    async fn test_only_old_records_are_removed() {
        let store = InMemoryConversationStore::new();
        store.insert_conversation(&record("s1", 45)).await.unwrap();
        store.insert_conversation(&record("s1", 31)).await.unwrap();
        store.insert_conversation(&record("s1", 2)).await.unwrap();

        let report = cleanup_expired(&store, 30).await.unwrap();
        assert_eq!(report.deleted_count, 2);
        assert_eq!(report.message, "Successfully cleaned up 2 records");
        assert_eq!(store.recent_conversations("s1", 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_nothing_to_remove() {
        let store = InMemoryConversationStore::new();
        store.insert_conversation(&record("s1", 1)).await.unwrap();
        let report = cleanup_expired(&store, 30).await.unwrap();
        assert_eq!(report.deleted_count, 0);
    }
}
