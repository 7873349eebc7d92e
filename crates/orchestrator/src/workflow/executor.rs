//! Walks the workflow graph from its entry stage

use crate::workflow::{Stage, WorkflowGraph, WorkflowState};
use analytics_agent_common::{AnalyticsError, Result};
use async_trait::async_trait;
use petgraph::algo::toposort;
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use tracing::{debug, info};

/// Runs one stage against the shared state. Stages record failures in
/// `state.error` instead of returning them.
#[async_trait]
pub trait StageHandler: Send + Sync {
    async fn run_stage(&self, stage: Stage, state: &mut WorkflowState);
}

pub struct WorkflowExecutor {
    graph: WorkflowGraph,
    entry: NodeIndex,
}

impl WorkflowExecutor {
    pub fn new(graph: WorkflowGraph, entry: NodeIndex) -> Result<Self> {
        toposort(&graph, None)
            .map_err(|_| AnalyticsError::Workflow("Workflow contains cycles".to_string()))?;
        if graph.node_weight(entry).is_none() {
            return Err(AnalyticsError::Workflow("Entry stage is not in the graph".to_string()));
        }
        Ok(Self { graph, entry })
    }

    pub fn graph(&self) -> &WorkflowGraph {
        &self.graph
    }

    /// Follow the first edge whose transition admits the current error state; stop when none does
    pub async fn execute<H>(&self, handler: &H, state: &mut WorkflowState) -> Vec<Stage>
    where
        H: StageHandler + ?Sized,
    {
        let mut visited = Vec::with_capacity(self.graph.node_count());
        let mut current = Some(self.entry);

        while let Some(node) = current {
            let stage = self.graph[node];
            debug!(%stage, "Running workflow stage");
            handler.run_stage(stage, state).await;
            visited.push(stage);

            let has_error = state.error.is_some();
            current = self
                .graph
                .edges(node)
                .find(|edge| edge.weight().allows(has_error))
                .map(|edge| edge.target());
        }

        info!(stages = visited.len(), failed = state.error.is_some(), "Workflow finished");
        visited
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::{analytics_workflow, Transition, WorkflowBuilder};
    use std::sync::Mutex;

    /// Records the order of stages and fails the data step on request
    struct ScriptedHandler {
        fail_data: bool,
        calls: Mutex<Vec<Stage>>,
    }

    #[async_trait]
    impl StageHandler for ScriptedHandler {
        async fn run_stage(&self, stage: Stage, state: &mut WorkflowState) {
            self.calls.lock().unwrap().push(stage);
            if stage == Stage::DataProcessor && self.fail_data {
                state.error = Some("boom".to_string());
            }
        }
    }

    fn executor() -> WorkflowExecutor {
        let (graph, entry) = analytics_workflow().unwrap();
        WorkflowExecutor::new(graph, entry).unwrap()
    }

    #[tokio::test]
    async fn test_success_path() {
        let handler = ScriptedHandler { fail_data: false, calls: Mutex::new(Vec::new()) };
        let mut state = WorkflowState::new("q", None, None);
        let visited = executor().execute(&handler, &mut state).await;

        assert_eq!(
            visited,
            vec![
                Stage::QueryAnalyzer,
                Stage::ContextRetriever,
                Stage::TaskDecomposer,
                Stage::McpEnhancer,
                Stage::DataProcessor,
                Stage::ResultSynthesizer,
                Stage::MemoryUpdater,
            ]
        );
        assert_eq!(*handler.calls.lock().unwrap(), visited);
    }

    #[tokio::test]
    async fn test_error_path_ends_at_handler() {
        let handler = ScriptedHandler { fail_data: true, calls: Mutex::new(Vec::new()) };
        let mut state = WorkflowState::new("q", None, None);
        let visited = executor().execute(&handler, &mut state).await;

        assert_eq!(visited.last(), Some(&Stage::ErrorHandler));
        assert!(!visited.contains(&Stage::ResultSynthesizer));
        assert!(!visited.contains(&Stage::MemoryUpdater));
    }

    #[test]
    fn test_cycle_is_rejected() {
        let mut builder = WorkflowBuilder::new();
        let entry = builder.add_stage(Stage::QueryAnalyzer);
        builder.add_stage(Stage::ContextRetriever);
        builder
            .add_transition(Stage::QueryAnalyzer, Stage::ContextRetriever, Transition::Always)
            .unwrap();
        builder
            .add_transition(Stage::ContextRetriever, Stage::QueryAnalyzer, Transition::Always)
            .unwrap();

        let err = WorkflowExecutor::new(builder.build(), entry).err().unwrap();
        assert_eq!(err.to_string(), "Workflow error: Workflow contains cycles");
    }
}
