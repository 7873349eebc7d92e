pub mod agent;
pub mod context;
pub mod response;
pub mod services;
pub mod workflow;

pub use agent::AnalyticsAgent;
pub use context::{ContextAnalysis, ContextEngineering, ContextSummary, InteractionFeedback};
pub use response::render_response;
pub use services::AgentServices;
pub use workflow::{AnalyticsWorkflow, Stage, WorkflowResponse};
