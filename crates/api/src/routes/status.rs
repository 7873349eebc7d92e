use analytics_agent_orchestrator::AnalyticsAgent;
use axum::{extract::State, response::Json};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;

pub async fn health() -> &'static str {
    "OK"
}

/// Capability and backend health view
pub async fn status(State(agent): State<Arc<AnalyticsAgent>>) -> Json<Value> {
    let services = agent.services();
    Json(json!({
        "status": "healthy",
        "service": "analytics-agent",
        "version": env!("CARGO_PKG_VERSION"),
        "gateway": services.gateway.get_gateway_status().await,
        "memory": services.memory.health_check().await,
        "database": services.database.get_connection_status().await,
        "mcp_tools": services.mcp.get_tool_status(),
        "identity": services.identity,
        "gateway_setup": services.gateway_setup,
        "context": services.context.get_context_summary(None, None),
        "timestamp": Utc::now(),
    }))
}
