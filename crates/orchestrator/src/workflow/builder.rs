//! Workflow graph builder using petgraph

use crate::workflow::{Stage, Transition, WorkflowGraph};
use analytics_agent_common::{AnalyticsError, Result};
use petgraph::graph::NodeIndex;
use std::collections::HashMap;

pub struct WorkflowBuilder {
    graph: WorkflowGraph,
    stage_indices: HashMap<Stage, NodeIndex>,
}

impl WorkflowBuilder {
    pub fn new() -> Self {
        Self {
            graph: WorkflowGraph::new(),
            stage_indices: HashMap::new(),
        }
    }

    /// Add a stage node; adding the same stage twice returns the existing node
    pub fn add_stage(&mut self, stage: Stage) -> NodeIndex {
        if let Some(index) = self.stage_indices.get(&stage) {
            return *index;
        }
        let index = self.graph.add_node(stage);
        self.stage_indices.insert(stage, index);
        index
    }

    /// Add an edge between two stages already in the graph
    pub fn add_transition(&mut self, from: Stage, to: Stage, transition: Transition) -> Result<()> {
        let from_idx = self
            .stage_indices
            .get(&from)
            .ok_or_else(|| AnalyticsError::Workflow(format!("Stage not found: {}", from)))?;
        let to_idx = self
            .stage_indices
            .get(&to)
            .ok_or_else(|| AnalyticsError::Workflow(format!("Stage not found: {}", to)))?;

        self.graph.add_edge(*from_idx, *to_idx, transition);
        Ok(())
    }

    pub fn get_stage_index(&self, stage: Stage) -> Option<NodeIndex> {
        self.stage_indices.get(&stage).copied()
    }

    pub fn build(self) -> WorkflowGraph {
        self.graph
    }
}

impl Default for WorkflowBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The query pipeline. A failed data step diverts to the error handler, which ends the run.
pub fn analytics_workflow() -> Result<(WorkflowGraph, NodeIndex)> {
    use Stage::*;

    let mut builder = WorkflowBuilder::new();
    let entry = builder.add_stage(QueryAnalyzer);
    for stage in [
        ContextRetriever,
        TaskDecomposer,
        McpEnhancer,
        DataProcessor,
        ErrorHandler,
        ResultSynthesizer,
        MemoryUpdater,
    ] {
        builder.add_stage(stage);
    }

    builder.add_transition(QueryAnalyzer, ContextRetriever, Transition::Always)?;
    builder.add_transition(ContextRetriever, TaskDecomposer, Transition::Always)?;
    builder.add_transition(TaskDecomposer, McpEnhancer, Transition::Always)?;
    builder.add_transition(McpEnhancer, DataProcessor, Transition::Always)?;
    builder.add_transition(DataProcessor, ResultSynthesizer, Transition::OnSuccess)?;
    builder.add_transition(DataProcessor, ErrorHandler, Transition::OnError)?;
    builder.add_transition(ResultSynthesizer, MemoryUpdater, Transition::Always)?;

    Ok((builder.build(), entry))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analytics_workflow_shape() {
        let (graph, entry) = analytics_workflow().unwrap();
        assert_eq!(graph.node_count(), 8);
        assert_eq!(graph.edge_count(), 7);
        assert_eq!(graph[entry], Stage::QueryAnalyzer);
    }

    #[test]
    fn test_unknown_stage_is_rejected() {
        let mut builder = WorkflowBuilder::new();
        builder.add_stage(Stage::QueryAnalyzer);
        let err = builder
            .add_transition(Stage::QueryAnalyzer, Stage::MemoryUpdater, Transition::Always)
            .unwrap_err();
        assert!(err.to_string().contains("Stage not found: memory_updater"));
    }
}
