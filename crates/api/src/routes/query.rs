use crate::handler::answer;
use crate::input::{Invocation, DEFAULT_QUERY};
use analytics_agent_orchestrator::AnalyticsAgent;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, Default, Deserialize)]
pub struct QueryParams {
    pub query: Option<String>,
    pub session_id: Option<String>,
    pub user_id: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

async fn respond(agent: &Arc<AnalyticsAgent>, invocation: Invocation) -> Response {
    match answer(agent, invocation).await {
        Ok(text) => (StatusCode::OK, text).into_response(),
        Err(e) => internal_error(e),
    }
}

fn internal_error(e: impl std::fmt::Display) -> Response {
    error!("Error handling request: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("Error processing request: {}", e),
    )
        .into_response()
}

/// `GET /?query=…`
pub async fn query_get(
    State(agent): State<Arc<AnalyticsAgent>>,
    Query(params): Query<QueryParams>,
) -> Response {
    let invocation = Invocation {
        query: non_empty(params.query).unwrap_or_else(|| DEFAULT_QUERY.to_string()),
        session_id: non_empty(params.session_id),
        user_id: non_empty(params.user_id),
    };
    info!(query = %invocation.query, "GET query");
    respond(&agent, invocation).await
}

/// `POST /` with a JSON event or plain text
pub async fn query_post(State(agent): State<Arc<AnalyticsAgent>>, body: Bytes) -> Response {
    let text = match std::str::from_utf8(&body) {
        Ok(text) => text,
        Err(e) => return internal_error(e),
    };
    let invocation = Invocation::from_body(text);
    info!(query = %invocation.query, session = ?invocation.session_id, "POST query");
    respond(&agent, invocation).await
}
