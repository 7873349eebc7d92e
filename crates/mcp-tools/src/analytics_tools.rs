//! Tool selection and multi-tool analytics workflows.

use crate::catalog::{ToolCapability, TOOL_CATALOGUE};
use crate::registry::{ToolExecution, ToolRegistry};
use crate::simulated::SimulatedToolServer;
use analytics_agent_common::McpConfig;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};
use tracing::{error, info, instrument, warn};

const EXECUTION_LOG_SIZE: usize = 50;

#[derive(Debug, Clone, Serialize)]
pub struct ToolCallResult {
    pub success: bool,
    pub tool: String,
    pub function: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub fallback_needed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelevantTool {
    pub tool: String,
    pub functions: Vec<String>,
    pub relevance: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowStep {
    pub tool: String,
    pub function: String,
    pub success: bool,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowOutcome {
    pub query: String,
    pub success: bool,
    pub relevant_tools: Vec<RelevantTool>,
    pub workflow_steps: Vec<WorkflowStep>,
    /// Keyed `{tool}_{function}`
    pub results: Map<String, Value>,
    pub recommendations: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolStatus {
    pub available_tools: BTreeMap<String, bool>,
    pub tool_capabilities: &'static [ToolCapability],
    pub total_tools: usize,
    pub active_tools: usize,
    pub recent_calls: usize,
    pub last_updated: DateTime<Utc>,
}

struct RelevanceRule {
    keywords: &'static [&'static str],
    tool: &'static str,
    functions: &'static [&'static str],
    relevance: &'static str,
    reason: &'static str,
}

const RELEVANCE_RULES: &[RelevanceRule] = &[
    RelevanceRule {
        keywords: &["sql", "database", "table", "query", "select"],
        tool: "postgres",
        functions: &["query_database", "get_schema"],
        relevance: "high",
        reason: "Query contains database-related keywords",
    },
    RelevanceRule {
        keywords: &["aws", "amazon", "s3", "athena", "redshift", "glue"],
        tool: "aws-docs",
        functions: &["search_aws_docs"],
        relevance: "high",
        reason: "Query mentions AWS services",
    },
    RelevanceRule {
        keywords: &["aws", "amazon", "s3", "athena", "redshift", "glue"],
        tool: "aws-analytics",
        functions: &["query_athena", "describe_glue_tables"],
        relevance: "high",
        reason: "Query involves AWS analytics services",
    },
    RelevanceRule {
        keywords: &["analyze", "statistics", "correlation", "anomaly", "trend"],
        tool: "data-analysis",
        functions: &["analyze_dataset", "generate_statistics", "detect_anomalies"],
        relevance: "high",
        reason: "Query requires advanced data analysis",
    },
    RelevanceRule {
        keywords: &["chart", "graph", "plot", "visualize", "dashboard"],
        tool: "visualization",
        functions: &["create_chart", "generate_dashboard"],
        relevance: "high",
        reason: "Query requests data visualization",
    },
    RelevanceRule {
        keywords: &["file", "csv", "excel", "data file", "export"],
        tool: "filesystem",
        functions: &["read_file", "write_file"],
        relevance: "medium",
        reason: "Query involves file operations",
    },
    RelevanceRule {
        keywords: &["latest", "current", "market", "trends", "news"],
        tool: "web-search",
        functions: &["web_search"],
        relevance: "medium",
        reason: "Query requires current external information",
    },
];

pub fn extract_sql_intent(query: &str) -> &'static str {
    let q = query.to_lowercase();
    if q.contains("sales") {
        "SELECT * FROM sales_data ORDER BY date DESC LIMIT 100"
    } else if q.contains("revenue") {
        "SELECT SUM(amount) as total_revenue FROM sales_data GROUP BY date"
    } else {
        "SELECT * FROM information_schema.tables"
    }
}

pub fn determine_analysis_type(query: &str) -> &'static str {
    let q = query.to_lowercase();
    if q.contains("anomaly") || q.contains("outlier") {
        "anomaly_detection"
    } else if q.contains("correlation") {
        "correlation_analysis"
    } else if q.contains("trend") || q.contains("forecast") {
        "time_series_analysis"
    } else {
        "descriptive_statistics"
    }
}

pub fn determine_chart_type(query: &str) -> &'static str {
    let q = query.to_lowercase();
    if q.contains("bar") || q.contains("column") {
        "bar"
    } else if q.contains("line") || q.contains("trend") {
        "line"
    } else if q.contains("pie") {
        "pie"
    } else if q.contains("scatter") {
        "scatter"
    } else {
        "bar"
    }
}

/// Parameters for one tool call, derived from the query and optional data context
pub fn prepare_tool_parameters(tool: &str, function: &str, query: &str, data_context: Option<&Value>) -> Value {
    let context_field = |field: &str| {
        data_context
            .and_then(|ctx| ctx.get(field))
            .cloned()
            .unwrap_or(Value::Null)
    };

    match (tool, function) {
        ("aws-docs", _) => json!({ "query": query }),
        ("postgres", "query_database") => json!({ "query": extract_sql_intent(query) }),
        ("postgres", "get_schema") => json!({ "table_name": context_field("table_name") }),
        ("data-analysis", _) => {
            let mut params = json!({ "analysis_type": determine_analysis_type(query) });
            if let Some(dataset) = data_context.and_then(|ctx| ctx.get("dataset")) {
                params["dataset"] = dataset.clone();
            }
            params
        }
        ("visualization", _) => json!({
            "chart_type": determine_chart_type(query),
            "data": context_field("data"),
        }),
        ("web-search", _) => json!({ "query": query, "num_results": 5 }),
        _ => json!({}),
    }
}

/// Follow-up suggestions from the results of a workflow run
pub fn workflow_recommendations(results: &Map<String, Value>) -> Vec<String> {
    let mut recommendations = Vec::new();

    if results.contains_key("postgres_query_database") {
        recommendations.push(
            "Consider creating an index on frequently queried columns for better performance".to_string(),
        );
    }
    let anomalies = results
        .get("data-analysis_detect_anomalies")
        .and_then(|r| r.get("anomalies_detected"))
        .and_then(Value::as_u64)
        .unwrap_or(0);
    if anomalies > 0 {
        recommendations.push("Investigate detected anomalies for potential data quality issues".to_string());
    }
    if results.contains_key("aws-analytics_query_athena") {
        recommendations.push(
            "Consider partitioning your data in S3 for improved Athena query performance".to_string(),
        );
    }

    if recommendations.is_empty() {
        recommendations.push(
            "Workflow completed successfully. Consider setting up automated monitoring for similar queries."
                .to_string(),
        );
    }
    recommendations
}

pub struct McpAnalyticsTools {
    registry: ToolRegistry,
    available: BTreeMap<String, bool>,
    executions: Mutex<VecDeque<ToolExecution>>,
}

impl McpAnalyticsTools {
    /// Register a simulated server for every configured tool that the catalogue knows
    pub fn new(config: &McpConfig) -> Self {
        let registry = ToolRegistry::new();
        let mut available = BTreeMap::new();
        for capability in TOOL_CATALOGUE.iter() {
            let enabled = config.available_tools.iter().any(|t| t == capability.server);
            if enabled {
                registry.register(Arc::new(SimulatedToolServer::new(capability)));
            }
            available.insert(capability.server.to_string(), enabled);
        }
        for unknown in config
            .available_tools
            .iter()
            .filter(|t| !available.contains_key(t.as_str()))
        {
            warn!("MCP tool {} is not in the catalogue and is ignored", unknown);
        }

        info!(tools = ?registry.names(), "MCP Analytics Tools initialized");
        Self {
            registry,
            available,
            executions: Mutex::new(VecDeque::with_capacity(EXECUTION_LOG_SIZE)),
        }
    }

    /// Replace the executor for a server and mark it available
    pub fn with_tool(mut self, tool: Arc<dyn crate::registry::ToolExecutor>) -> Self {
        self.available.insert(tool.name().to_string(), true);
        self.registry.register(tool);
        self
    }

    pub fn is_available(&self, tool: &str) -> bool {
        self.available.get(tool).copied().unwrap_or(false) && self.registry.contains(tool)
    }

    #[instrument(skip(self, parameters))]
    pub async fn call_mcp_tool(&self, tool: &str, function: &str, parameters: Value) -> ToolCallResult {
        if !self.is_available(tool) {
            return ToolCallResult {
                success: false,
                tool: tool.to_string(),
                function: function.to_string(),
                result: None,
                timestamp: None,
                error: Some(format!("MCP tool {} not available", tool)),
                fallback_needed: true,
            };
        }

        let execution = ToolExecution::new(tool, function, &parameters);
        let outcome = self.registry.execute(tool, function, parameters).await;
        let execution = execution.with_result(&outcome);
        let timestamp = execution.timestamp;
        self.record(execution);

        match outcome {
            Ok(result) => ToolCallResult {
                success: true,
                tool: tool.to_string(),
                function: function.to_string(),
                result: Some(result),
                timestamp: Some(timestamp),
                error: None,
                fallback_needed: false,
            },
            Err(e) => {
                error!("Error calling MCP tool {}.{}: {:#}", tool, function, e);
                ToolCallResult {
                    success: false,
                    tool: tool.to_string(),
                    function: function.to_string(),
                    result: None,
                    timestamp: Some(timestamp),
                    error: Some(e.to_string()),
                    fallback_needed: false,
                }
            }
        }
    }

    fn record(&self, execution: ToolExecution) {
        let mut log = self.executions.lock().unwrap_or_else(|e| e.into_inner());
        if log.len() == EXECUTION_LOG_SIZE {
            log.pop_front();
        }
        log.push_back(execution);
    }

    /// Most recent last
    pub fn recent_executions(&self) -> Vec<ToolExecution> {
        self.executions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    /// Available tools whose keywords appear in the query, in rule order
    pub fn get_relevant_tools_for_query(&self, query: &str) -> Vec<RelevantTool> {
        let q = query.to_lowercase();
        RELEVANCE_RULES
            .iter()
            .filter(|rule| rule.keywords.iter().any(|k| q.contains(k)))
            .filter(|rule| self.is_available(rule.tool))
            .map(|rule| RelevantTool {
                tool: rule.tool.to_string(),
                functions: rule.functions.iter().map(|f| f.to_string()).collect(),
                relevance: rule.relevance.to_string(),
                reason: rule.reason.to_string(),
            })
            .collect()
    }

    /// Run every function of every relevant tool in order
    #[instrument(skip(self, data_context))]
    pub async fn execute_analytics_workflow(&self, query: &str, data_context: Option<&Value>) -> WorkflowOutcome {
        let relevant_tools = self.get_relevant_tools_for_query(query);
        let mut outcome = WorkflowOutcome {
            query: query.to_string(),
            success: true,
            relevant_tools: Vec::new(),
            workflow_steps: Vec::new(),
            results: Map::new(),
            recommendations: Vec::new(),
            errors: Vec::new(),
        };

        for tool in &relevant_tools {
            for function in &tool.functions {
                let parameters = prepare_tool_parameters(&tool.tool, function, query, data_context);
                let result = self.call_mcp_tool(&tool.tool, function, parameters).await;

                outcome.workflow_steps.push(WorkflowStep {
                    tool: tool.tool.clone(),
                    function: function.clone(),
                    success: result.success,
                    timestamp: result.timestamp,
                });

                match (result.success, result.result) {
                    (true, Some(value)) => {
                        outcome.results.insert(format!("{}_{}", tool.tool, function), value);
                    }
                    _ => {
                        outcome.success = false;
                        outcome
                            .errors
                            .push(result.error.unwrap_or_else(|| "unknown error".to_string()));
                    }
                }
            }
        }

        outcome.relevant_tools = relevant_tools;
        outcome.recommendations = workflow_recommendations(&outcome.results);
        outcome
    }

    pub fn get_tool_status(&self) -> ToolStatus {
        ToolStatus {
            active_tools: self.available.values().filter(|a| **a).count(),
            available_tools: self.available.clone(),
            tool_capabilities: &TOOL_CATALOGUE,
            total_tools: TOOL_CATALOGUE.len(),
            recent_calls: self.recent_executions().len(),
            last_updated: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_tools() -> McpAnalyticsTools {
        McpAnalyticsTools::new(&McpConfig {
            available_tools: TOOL_CATALOGUE.iter().map(|c| c.server.to_string()).collect(),
        })
    }

    #[test]
    fn test_relevance_respects_availability() {
        let tools = McpAnalyticsTools::new(&McpConfig::default());
        let relevant = tools.get_relevant_tools_for_query("Run a SQL query on the s3 data and chart it");
        let names: Vec<_> = relevant.iter().map(|t| t.tool.as_str()).collect();
        // visualization and aws-analytics are not enabled by default
        assert_eq!(names, vec!["postgres", "aws-docs"]);
    }

    #[test]
    fn test_parameter_preparation() {
        let params = prepare_tool_parameters("postgres", "query_database", "total revenue", None);
        assert_eq!(
            params["query"],
            "SELECT SUM(amount) as total_revenue FROM sales_data GROUP BY date"
        );

        let ctx = json!({"dataset": "s3://bucket/sales.csv"});
        let params = prepare_tool_parameters("data-analysis", "detect_anomalies", "find outliers", Some(&ctx));
        assert_eq!(params["analysis_type"], "anomaly_detection");
        assert_eq!(params["dataset"], "s3://bucket/sales.csv");

        let params = prepare_tool_parameters("visualization", "create_chart", "pie of regions", None);
        assert_eq!(params["chart_type"], "pie");
        assert!(params["data"].is_null());
    }

    #[tokio::test]
    async fn test_unavailable_tool_needs_fallback() {
        let tools = McpAnalyticsTools::new(&McpConfig::default());
        let result = tools.call_mcp_tool("visualization", "create_chart", json!({})).await;
        assert!(!result.success);
        assert!(result.fallback_needed);
        assert_eq!(result.error.as_deref(), Some("MCP tool visualization not available"));
    }

    #[tokio::test]
    async fn test_workflow_collects_results_and_recommendations() {
        let tools = all_tools();
        let outcome = tools
            .execute_analytics_workflow("analyze anomaly patterns in the sales database", None)
            .await;

        assert!(outcome.success);
        assert!(outcome.results.contains_key("postgres_query_database"));
        assert!(outcome.results.contains_key("data-analysis_detect_anomalies"));
        assert_eq!(outcome.workflow_steps.len(), 5);
        assert_eq!(
            outcome.recommendations,
            vec![
                "Consider creating an index on frequently queried columns for better performance",
                "Investigate detected anomalies for potential data quality issues",
            ]
        );
        assert_eq!(tools.recent_executions().len(), 5);
    }

    #[tokio::test]
    async fn test_workflow_without_matches() {
        let tools = all_tools();
        let outcome = tools.execute_analytics_workflow("hello there", None).await;
        assert!(outcome.success);
        assert!(outcome.workflow_steps.is_empty());
        assert_eq!(outcome.recommendations.len(), 1);
    }

    #[test]
    fn test_status_counts() {
        let status = McpAnalyticsTools::new(&McpConfig::default()).get_tool_status();
        assert_eq!(status.total_tools, 8);
        assert_eq!(status.active_tools, 3);
        assert_eq!(status.available_tools.get("postgres"), Some(&true));
        assert_eq!(status.available_tools.get("redshift"), Some(&false));
    }
}
