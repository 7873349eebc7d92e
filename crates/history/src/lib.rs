//! Conversation history: durable store, Redis cache, AgentCore Memory and retention

pub mod agentcore;
pub mod cleanup;
pub mod memory;
pub mod store;

pub use agentcore::{AgentCoreMemory, HttpMemoryService, MemoryOutcome, MemoryService, RecordFilter};
pub use cleanup::{cleanup_before, cleanup_expired, CleanupReport};
pub use memory::{ConversationEntry, ConversationMemory, ConversationStats, SessionContext};
pub use store::{ConversationStore, InMemoryConversationStore, PostgresConversationStore};
