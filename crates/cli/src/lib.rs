//! Terminal client for a running analytics agent

pub mod api_client;
pub mod completions;
pub mod interactive;
pub mod oneshot;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080";
