//! Query-processing workflow as a petgraph state machine

pub mod builder;
pub mod executor;
pub mod stages;

pub use builder::{analytics_workflow, WorkflowBuilder};
pub use executor::{StageHandler, WorkflowExecutor};
pub use stages::AnalyticsWorkflow;

use crate::context::{ComplexityLevel, ContextAnalysis, UserContext};
use analytics_agent_analytics::AnalysisResult;
use analytics_agent_common::Intent;
use analytics_agent_history::ConversationEntry;
use analytics_agent_mcp_tools::WorkflowOutcome as McpWorkflowOutcome;
use chrono::{DateTime, Utc};
use petgraph::graph::DiGraph;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum_macros::Display;

/// Workflow graph type
pub type WorkflowGraph = DiGraph<Stage, Transition>;

#[derive(Display, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    QueryAnalyzer,
    ContextRetriever,
    TaskDecomposer,
    McpEnhancer,
    DataProcessor,
    ErrorHandler,
    ResultSynthesizer,
    MemoryUpdater,
}

/// When an edge may be followed, given whether the state carries an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transition {
    Always,
    OnSuccess,
    OnError,
}

impl Transition {
    pub fn allows(self, has_error: bool) -> bool {
        match self {
            Transition::Always => true,
            Transition::OnSuccess => !has_error,
            Transition::OnError => has_error,
        }
    }
}

/// Analytics intent enriched with the context engine's view of the query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowIntent {
    #[serde(flatten)]
    pub query: Intent,
    pub primary_intent: String,
    pub confidence: f64,
    pub primary_domain: String,
    pub complexity_level: ComplexityLevel,
    pub overall_complexity: f64,
    pub semantic_richness: f64,
    pub requires_time_series: bool,
    pub requires_decomposition: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub task_type: String,
    pub description: String,
    pub priority: u8,
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySnapshot {
    pub query: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationPatterns {
    pub query_evolution: Vec<QuerySnapshot>,
    pub complexity_trend: String,
    pub domain_consistency: bool,
    pub intent_progression: Vec<String>,
}

/// Context assembled for one run: analysis plus what memory knows
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowContext {
    #[serde(flatten)]
    pub analysis: ContextAnalysis,
    /// Oldest first
    pub conversation_history: Vec<ConversationEntry>,
    pub conversation_summary: Option<String>,
    pub related_queries: Vec<String>,
    pub conversation_patterns: Option<ConversationPatterns>,
    pub user_preferences: Map<String, Value>,
    pub user_profile: Option<UserContext>,
    pub contextual_insights: Vec<String>,
}

impl WorkflowContext {
    pub fn new(analysis: ContextAnalysis) -> Self {
        Self {
            analysis,
            conversation_history: Vec::new(),
            conversation_summary: None,
            related_queries: Vec::new(),
            conversation_patterns: None,
            user_preferences: Map::new(),
            user_profile: None,
            contextual_insights: Vec::new(),
        }
    }

    /// Number of populated context sources, the query analysis included
    pub fn sources_used(&self) -> usize {
        1 + [
            !self.conversation_history.is_empty(),
            self.conversation_summary.is_some(),
            !self.related_queries.is_empty(),
            self.conversation_patterns.is_some(),
            !self.user_preferences.is_empty(),
            self.user_profile.is_some(),
            !self.contextual_insights.is_empty(),
        ]
        .iter()
        .filter(|present| **present)
        .count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesisMetadata {
    pub context_sources_used: usize,
    pub recommendation_sources: Vec<&'static str>,
    pub complexity_level: ComplexityLevel,
    pub expertise_level: String,
    pub primary_domain: String,
}

/// Mutable state threaded through the stages
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowState {
    pub query: String,
    pub session_id: Option<String>,
    pub user_id: Option<String>,
    pub intent: Option<WorkflowIntent>,
    pub context: Option<WorkflowContext>,
    pub tasks: Vec<Task>,
    pub completed_tasks: Vec<String>,
    pub mcp: Option<McpWorkflowOutcome>,
    pub results: Option<AnalysisResult>,
    pub recommendations: Vec<String>,
    pub synthesis: Option<SynthesisMetadata>,
    pub error: Option<String>,
}

impl WorkflowState {
    pub fn new(query: &str, session_id: Option<&str>, user_id: Option<&str>) -> Self {
        Self {
            query: query.to_string(),
            session_id: session_id.map(str::to_string),
            user_id: user_id.map(str::to_string),
            intent: None,
            context: None,
            tasks: Vec::new(),
            completed_tasks: Vec::new(),
            mcp: None,
            results: None,
            recommendations: Vec::new(),
            synthesis: None,
            error: None,
        }
    }
}

/// What `process_query` hands back to callers
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowResponse {
    pub success: bool,
    pub results: Option<AnalysisResult>,
    pub context: Option<WorkflowContext>,
    pub recommendations: Vec<String>,
    pub completed_tasks: Vec<String>,
    pub intent: Option<WorkflowIntent>,
    pub error: Option<String>,
    /// Stages in the order they ran
    pub stages: Vec<Stage>,
}

impl WorkflowResponse {
    pub fn from_state(state: WorkflowState, stages: Vec<Stage>) -> Self {
        Self {
            success: state.error.is_none(),
            results: state.results,
            context: state.context,
            recommendations: state.recommendations,
            completed_tasks: state.completed_tasks,
            intent: state.intent,
            error: state.error,
            stages,
        }
    }
}
