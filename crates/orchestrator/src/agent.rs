use crate::response::render_response;
use crate::services::AgentServices;
use crate::workflow::{AnalyticsWorkflow, WorkflowResponse};
use analytics_agent_analytics::AnalysisResult;
use analytics_agent_common::AgentConfig;
use anyhow::Result;
use std::time::Instant;
use tracing::{info, instrument};

/// Top-level entry point: one query in, one markdown answer out
pub struct AnalyticsAgent {
    services: AgentServices,
    workflow: AnalyticsWorkflow,
}

impl AnalyticsAgent {
    pub fn from_services(services: AgentServices) -> Result<Self> {
        let workflow = AnalyticsWorkflow::from_services(&services)?;
        Ok(Self { services, workflow })
    }

    pub async fn from_config(config: AgentConfig) -> Result<Self> {
        Self::from_services(AgentServices::from_config(config).await?)
    }

    pub fn services(&self) -> &AgentServices {
        &self.services
    }

    pub fn workflow(&self) -> &AnalyticsWorkflow {
        &self.workflow
    }

    /// Run the workflow and keep the structured result
    pub async fn run(&self, input: &str, session_id: Option<&str>, user_id: Option<&str>) -> WorkflowResponse {
        self.workflow.process_query(input, session_id, user_id).await
    }

    #[instrument(skip(self))]
    pub async fn process_query(&self, input: &str, session_id: Option<&str>, user_id: Option<&str>) -> String {
        info!("Processing analytics query");
        let start = Instant::now();

        let response = self.run(input, session_id, user_id).await;
        let text = match &response.results {
            Some(results) => render_response(results, &response.recommendations),
            None => {
                let error = response.error.clone().unwrap_or_else(|| "Unknown error".to_string());
                render_response(&AnalysisResult::failure(input, error), &[])
            }
        };

        info!(
            success = response.success,
            chars = text.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Generated response"
        );
        text
    }
}
