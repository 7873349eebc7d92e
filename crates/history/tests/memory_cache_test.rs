use analytics_agent_common::MemoryConfig;
use analytics_agent_history::{ConversationMemory, InMemoryConversationStore};
use analytics_agent_storage::RedisCache;
use std::sync::Arc;
use uuid::Uuid;

fn get_test_redis_url() -> String {
    std::env::var("TEST_REDIS_URL").expect("TEST_REDIS_URL must be set")
}

async fn cached_memory(cache_size: usize) -> (ConversationMemory, Arc<InMemoryConversationStore>) {
    let cache = RedisCache::new(&get_test_redis_url())
        .await
        .expect("Failed to connect to test Redis");
    let store = Arc::new(InMemoryConversationStore::new());
    let config = MemoryConfig {
        cache_size,
        ..MemoryConfig::default()
    };
    (
        ConversationMemory::new(store.clone(), Some(Arc::new(cache)), &config),
        store,
    )
}

#[tokio::test]
#[ignore]
async fn test_cache_keeps_newest_entries() {
    let (memory, _) = cached_memory(3).await;
    let session = format!("test-{}", Uuid::new_v4());

    for i in 0..5 {
        assert!(memory.store_conversation(&session, &format!("q{}", i), "r", None).await);
    }

    // cache is capped at three, newest first
    let history = memory.get_conversation_history(&session, 10).await;
    let queries: Vec<_> = history.iter().map(|e| e.query.as_str()).collect();
    assert_eq!(queries, vec!["q4", "q3", "q2"]);
    assert!(memory.is_cache_available().await);

    memory.clear_session(&session).await;
}

#[tokio::test]
#[ignore]
async fn test_cleared_session_reads_from_store() {
    let (memory, _) = cached_memory(20).await;
    let session = format!("test-{}", Uuid::new_v4());

    memory.store_conversation(&session, "first", "r", Some("u1")).await;
    assert!(memory.clear_session(&session).await);

    let history = memory.get_conversation_history(&session, 10).await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].user_id.as_deref(), Some("u1"));
}
