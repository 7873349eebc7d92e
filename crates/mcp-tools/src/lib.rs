//! MCP tool servers available to the analytics workflow.

pub mod analytics_tools;
pub mod catalog;
pub mod registry;
pub mod simulated;

pub use analytics_tools::{
    McpAnalyticsTools, RelevantTool, ToolCallResult, ToolStatus, WorkflowOutcome, WorkflowStep,
};
pub use catalog::{capability, ToolCapability, TOOL_CATALOGUE};
pub use registry::{ToolExecution, ToolExecutor, ToolRegistry};
pub use simulated::SimulatedToolServer;
