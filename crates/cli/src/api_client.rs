use analytics_agent_common::QueryRequest;
use anyhow::{Context, Result};
use tracing::debug;

/// Client for the analytics agent HTTP API
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST the query and return the markdown answer
    pub async fn query(&self, query: &str, session_id: Option<&str>, user_id: Option<&str>) -> Result<String> {
        let url = format!("{}/", self.base_url);
        debug!(%url, "Sending query");

        let response = self
            .client
            .post(&url)
            .json(&QueryRequest {
                query: query.to_string(),
                session_id: session_id.map(str::to_string),
                user_id: user_id.map(str::to_string),
            })
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", self.base_url))?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            anyhow::bail!("API request failed: {}: {}", status, body);
        }
        Ok(body)
    }

    pub async fn health(&self) -> Result<String> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", self.base_url))?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            anyhow::bail!("Health check failed: {}", status);
        }
        Ok(body)
    }
}
