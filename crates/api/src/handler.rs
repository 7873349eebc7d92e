use crate::input::Invocation;
use analytics_agent_orchestrator::AnalyticsAgent;
use anyhow::{Context, Result};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Run one query on its own task; a panic comes back as an error
pub async fn answer(agent: &Arc<AnalyticsAgent>, invocation: Invocation) -> Result<String> {
    let agent = agent.clone();
    tokio::spawn(async move {
        agent
            .process_query(
                &invocation.query,
                invocation.session_id.as_deref(),
                invocation.user_id.as_deref(),
            )
            .await
    })
    .await
    .context("Query processing task failed")
}

/// Lambda-style entry point: string or object event in, plain text out
#[instrument(skip_all)]
pub async fn lambda_handler(agent: &Arc<AnalyticsAgent>, event: &Value) -> String {
    info!("Lambda handler started");
    let invocation = Invocation::from_event(event);
    info!(query = %invocation.query, "Extracted user input");

    match answer(agent, invocation).await {
        Ok(text) => {
            info!(chars = text.len(), "Lambda handler completed");
            text
        }
        Err(e) => {
            error!("Error in lambda handler: {:#}", e);
            format!("Error processing request: {:#}", e)
        }
    }
}
