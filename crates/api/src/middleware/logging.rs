use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use std::time::Instant;
use tower_http::{
    classify::{ServerErrorsAsFailures, SharedClassifier},
    trace::TraceLayer,
};
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Get the default tracing layer for HTTP requests
pub fn get_tracing_layer() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>> {
    TraceLayer::new_for_http()
}

/// Tags every request with an id (kept if the caller sent one) and logs the outcome
pub async fn logging_middleware(mut request: Request, next: Next) -> Response {
    let start_time = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();

    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let content_length = request
        .headers()
        .get("content-length")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0);

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        request.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    info!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        content_length,
        "Incoming HTTP request"
    );

    let span = info_span!("http_request", request_id = %request_id, method = %method, uri = %uri);
    let mut response = next.run(request).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    let duration_ms = start_time.elapsed().as_millis() as u64;
    let status = response.status();
    if status.is_server_error() {
        error!(request_id = %request_id, status = %status, duration_ms, "HTTP request failed with server error");
    } else if status.is_client_error() {
        warn!(request_id = %request_id, status = %status, duration_ms, "HTTP request failed with client error");
    } else {
        info!(request_id = %request_id, status = %status, duration_ms, "HTTP request completed");
    }

    response
}
