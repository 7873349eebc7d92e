use crate::middleware::{get_tracing_layer, logging_middleware};
use crate::routes::{gateway::gateway_target, query, status};
use analytics_agent_common::ServerConfig;
use analytics_agent_history::cleanup_expired;
use analytics_agent_orchestrator::AnalyticsAgent;
use anyhow::{Context, Result};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

const RETENTION_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

pub fn build_router(agent: Arc<AnalyticsAgent>) -> Router {
    Router::new()
        .route("/health", get(status::health))
        .route("/status", get(status::status))
        .route("/", get(query::query_get).post(query::query_post))
        .route("/gateway/:endpoint", post(gateway_target))
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn(logging_middleware))
        .layer(get_tracing_layer())
        .with_state(agent)
}

/// Periodically drop conversations past the configured retention window
pub fn spawn_retention_sweep(agent: Arc<AnalyticsAgent>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let retention_days = agent.services().config.memory.retention_days;
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let store = agent.services().conversations.clone();
            if let Err(e) = cleanup_expired(store.as_ref(), retention_days).await {
                warn!("Retention sweep failed: {}", e);
            }
        }
    })
}

pub struct AgentServer {
    agent: Arc<AnalyticsAgent>,
    host: String,
    port: u16,
}

impl AgentServer {
    pub fn new(agent: Arc<AnalyticsAgent>, config: &ServerConfig) -> Self {
        Self {
            agent,
            host: config.host.clone(),
            port: config.port,
        }
    }

    pub fn router(&self) -> Router {
        build_router(self.agent.clone())
    }

    /// Serve until ctrl-c
    pub async fn run(self) -> Result<()> {
        let uri = format!("{}:{}", self.host, self.port);
        let listener = tokio::net::TcpListener::bind(&uri)
            .await
            .with_context(|| format!("Failed to bind {}", uri))?;
        let addr = listener.local_addr()?;

        info!("Analytics agent listening on http://{}", addr);
        info!("Health check available at /health");

        let sweep = spawn_retention_sweep(self.agent.clone(), RETENTION_SWEEP_INTERVAL);
        let served = axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await;
        sweep.abort();
        served.context("HTTP server failed")?;

        info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
