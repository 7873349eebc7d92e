//! HTTP and Lambda front ends for the analytics agent.
//!
//! - `GET /health` liveness probe
//! - `GET /?query=…` and `POST /` answer a query as markdown text
//! - `GET /status` capability and backend health view
//! - `POST /gateway/{endpoint}` gateway target handler
//!
//! The same query path backs [`lambda_handler`] and the Lambda runtime loop in [`runtime`].

pub mod handler;
pub mod input;
pub mod middleware;
pub mod routes;
pub mod runtime;
pub mod server;

pub use handler::{answer, lambda_handler};
pub use input::{extract_input, Invocation, DEFAULT_QUERY};
pub use runtime::{run_lambda, LambdaRuntime, RuntimeClient};
pub use server::{build_router, spawn_retention_sweep, AgentServer};
