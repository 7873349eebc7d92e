//! Construction of every backend the agent talks to.

use crate::context::ContextEngineering;
use analytics_agent_analytics::{AnalyticsEngine, DatasetSource};
use analytics_agent_common::AgentConfig;
use analytics_agent_gateway::{
    setup_gateway_integration, setup_identity_integration, AgentCoreGateway, GatewaySetup,
    GatewaySetupOptions, GatewayTarget, IdentitySetup,
};
use analytics_agent_history::{
    AgentCoreMemory, ConversationMemory, ConversationStore, InMemoryConversationStore,
    PostgresConversationStore,
};
use analytics_agent_mcp_tools::McpAnalyticsTools;
use analytics_agent_storage::{initialize_storage, DatabaseIntegration, LocalObjectStore, ObjectStore};
use anyhow::Result;
use std::sync::Arc;
use tracing::info;

/// Shared handles, cheap to clone into request handlers
#[derive(Clone)]
pub struct AgentServices {
    pub config: Arc<AgentConfig>,
    pub database: Arc<DatabaseIntegration>,
    pub gateway: Arc<AgentCoreGateway>,
    pub target: Arc<GatewayTarget>,
    pub engine: Arc<AnalyticsEngine>,
    pub memory: Arc<AgentCoreMemory>,
    pub conversations: Arc<dyn ConversationStore>,
    pub mcp: Arc<McpAnalyticsTools>,
    pub context: Arc<ContextEngineering>,
    pub identity: IdentitySetup,
    pub gateway_setup: GatewaySetup,
}

impl AgentServices {
    /// Connect configured backends; anything missing or unreachable runs in fallback mode
    pub async fn from_config(config: AgentConfig) -> Result<Self> {
        let backends = initialize_storage(&config.storage).await;

        let mut database = DatabaseIntegration::new(backends.postgres.clone());
        if let Some(cache) = &backends.redis {
            database = database.with_cache(cache.clone());
        }
        let database = Arc::new(database);

        let objects: Arc<dyn ObjectStore> = Arc::new(LocalObjectStore::new(config.storage.data_dir.clone()));
        let gateway = Arc::new(AgentCoreGateway::from_config(&config.gateway, database.clone(), objects).await?);

        let source: Arc<dyn DatasetSource> = gateway.clone();
        let engine = Arc::new(AnalyticsEngine::new(Some(source), &config.gateway));

        let store: Arc<dyn ConversationStore> = match &backends.postgres {
            Some(client) => Arc::new(PostgresConversationStore::new(client.clone())),
            None => Arc::new(InMemoryConversationStore::new()),
        };
        let traditional = Arc::new(ConversationMemory::new(store.clone(), backends.redis.clone(), &config.memory));
        let memory = Arc::new(AgentCoreMemory::from_config(
            &config.memory,
            config.gateway.timeout_secs,
            traditional,
        )?);

        let identity = setup_identity_integration(&config.identity);
        // connection strings stay out of descriptors that are served over HTTP
        let gateway_setup = setup_gateway_integration(&GatewaySetupOptions {
            analytics_api_url: config.gateway.url.clone(),
            db_connection: None,
        });

        info!(
            gateway = gateway.is_available(),
            memory = memory.is_available(),
            database = database.is_live(),
            "Agent services initialized"
        );

        Ok(Self {
            target: Arc::new(GatewayTarget::new(database.clone())),
            mcp: Arc::new(McpAnalyticsTools::new(&config.mcp)),
            context: Arc::new(ContextEngineering::new()),
            config: Arc::new(config),
            database,
            gateway,
            engine,
            memory,
            conversations: store,
            identity,
            gateway_setup,
        })
    }
}
