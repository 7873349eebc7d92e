//! Lambda runtime API client and invocation loop

use crate::handler::lambda_handler;
use analytics_agent_orchestrator::AnalyticsAgent;
use anyhow::{bail, Context, Result};
use axum::body::Bytes;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

pub const RUNTIME_API_ENV: &str = "AWS_LAMBDA_RUNTIME_API";
const API_VERSION: &str = "2018-06-01";
const REQUEST_ID_HEADER: &str = "Lambda-Runtime-Aws-Request-Id";
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Event a runtime uses when no runtime API is configured
pub fn test_event() -> Value {
    json!({"inputText": "Test query"})
}

#[derive(Debug, Clone)]
pub struct PendingInvocation {
    pub request_id: String,
    pub body: Bytes,
}

#[derive(Clone)]
pub struct RuntimeClient {
    http: reqwest::Client,
    base_url: String,
}

impl RuntimeClient {
    /// `runtime_api` is the `host:port` value of `AWS_LAMBDA_RUNTIME_API`
    pub fn new(runtime_api: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: format!("http://{}/{}/runtime/invocation", runtime_api, API_VERSION),
        }
    }

    pub async fn next_invocation(&self) -> Result<PendingInvocation> {
        let response = self
            .http
            .get(format!("{}/next", self.base_url))
            .send()
            .await
            .context("Failed to poll for the next invocation")?;

        if response.status() != reqwest::StatusCode::OK {
            bail!("Failed to get next invocation: {}", response.status());
        }
        let request_id = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .context("Invocation is missing the request id header")?;
        let body = response.bytes().await.context("Failed to read invocation body")?;

        Ok(PendingInvocation { request_id, body })
    }

    pub async fn send_response(&self, request_id: &str, result: String) -> Result<()> {
        self.http
            .post(format!("{}/{}/response", self.base_url, request_id))
            .body(result)
            .send()
            .await
            .context("Failed to post invocation response")?
            .error_for_status()?;
        Ok(())
    }

    pub async fn send_error(&self, request_id: &str, error_type: &str, message: &str) -> Result<()> {
        self.http
            .post(format!("{}/{}/error", self.base_url, request_id))
            .json(&json!({"errorMessage": message, "errorType": error_type}))
            .send()
            .await
            .context("Failed to post invocation error")?
            .error_for_status()?;
        Ok(())
    }
}

pub struct LambdaRuntime {
    agent: Arc<AnalyticsAgent>,
    client: RuntimeClient,
}

impl LambdaRuntime {
    pub fn new(agent: Arc<AnalyticsAgent>, runtime_api: &str) -> Self {
        Self {
            agent,
            client: RuntimeClient::new(runtime_api),
        }
    }

    /// Handle exactly one invocation and return its request id
    pub async fn process_next(&self) -> Result<String> {
        let invocation = self.client.next_invocation().await?;
        let request_id = invocation.request_id;
        info!(request_id = %request_id, "Processing request");

        let event: Value = match serde_json::from_slice(&invocation.body) {
            Ok(event) => event,
            Err(e) => {
                warn!(request_id = %request_id, "Invalid event payload: {}", e);
                self.client.send_error(&request_id, "InvalidEvent", &e.to_string()).await?;
                return Ok(request_id);
            }
        };

        let result = lambda_handler(&self.agent, &event).await;
        if let Err(e) = self.client.send_response(&request_id, result).await {
            let message = format!("{:#}", e);
            self.client.send_error(&request_id, "ResponseFailed", &message).await?;
            return Err(e);
        }

        info!(request_id = %request_id, "Completed request");
        Ok(request_id)
    }

    /// Poll forever; failures are logged and retried after a short pause
    pub async fn run(&self) {
        loop {
            if let Err(e) = self.process_next().await {
                error!("Error in runtime loop: {:#}", e);
                tokio::time::sleep(RETRY_DELAY).await;
            }
        }
    }
}

/// Run against `AWS_LAMBDA_RUNTIME_API`, or answer a single test event when it is unset
pub async fn run_lambda(agent: Arc<AnalyticsAgent>) -> Result<()> {
    match std::env::var(RUNTIME_API_ENV).ok().filter(|v| !v.is_empty()) {
        Some(runtime_api) => {
            info!("Starting Lambda runtime API loop with endpoint: {}", runtime_api);
            LambdaRuntime::new(agent, &runtime_api).run().await;
            Ok(())
        }
        None => {
            warn!("{} is not set, processing a test event", RUNTIME_API_ENV);
            let result = lambda_handler(&agent, &test_event()).await;
            info!("Test result: {}", result);
            Ok(())
        }
    }
}
