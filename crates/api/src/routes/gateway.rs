use crate::middleware::REQUEST_ID_HEADER;
use analytics_agent_gateway::TargetRequest;
use analytics_agent_orchestrator::AnalyticsAgent;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// `POST /gateway/{endpoint}`: the body is handed to the gateway target as-is
pub async fn gateway_target(
    State(agent): State<Arc<AnalyticsAgent>>,
    Path(endpoint): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let body = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned()))
    };
    let request_id = headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let request = TargetRequest::new(&format!("/{}", endpoint), body);
    let target = agent.services().target.handle(&request, &request_id).await;

    let status = StatusCode::from_u16(target.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response = (status, Json(target.body)).into_response();
    for (name, value) in &target.headers {
        if let (Ok(name), Ok(value)) = (HeaderName::try_from(name.as_str()), HeaderValue::from_str(value)) {
            response.headers_mut().insert(name, value);
        }
    }
    response
}
