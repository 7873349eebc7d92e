//! Canned tool servers used until real MCP transports are wired in.

use crate::catalog::ToolCapability;
use crate::registry::ToolExecutor;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

const PLACEHOLDER_PNG: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

/// Tool server answering every function with fixed sample payloads
#[derive(Debug, Clone)]
pub struct SimulatedToolServer {
    capability: &'static ToolCapability,
}

impl SimulatedToolServer {
    pub fn new(capability: &'static ToolCapability) -> Self {
        Self { capability }
    }

    fn respond(&self, function: &str, parameters: &Value) -> Value {
        match (self.capability.server, function) {
            ("aws-docs", "search_aws_docs") => json!({
                "documents": [{
                    "title": format!(
                        "AWS Documentation for {}",
                        parameters.get("query").and_then(Value::as_str).unwrap_or("analytics")
                    ),
                    "content": "Comprehensive guide to AWS analytics services...",
                    "url": "https://docs.aws.amazon.com/analytics/",
                    "relevance_score": 0.95
                }],
                "total_results": 1
            }),
            ("postgres", "query_database") => json!({
                "rows": [
                    {"id": 1, "name": "Sample Data", "value": 100},
                    {"id": 2, "name": "Test Record", "value": 200}
                ],
                "row_count": 2,
                "execution_time_ms": 45
            }),
            ("postgres", "get_schema") => json!({
                "tables": [{
                    "name": "sales_data",
                    "columns": [
                        {"name": "id", "type": "integer", "nullable": false},
                        {"name": "date", "type": "date", "nullable": false},
                        {"name": "amount", "type": "decimal", "nullable": false}
                    ]
                }]
            }),
            ("data-analysis", "analyze_dataset") => json!({
                "summary_statistics": {
                    "row_count": 1000,
                    "column_count": 5,
                    "missing_values": 12,
                    "data_types": {"numeric": 3, "categorical": 2}
                },
                "insights": [
                    "Dataset has high data quality with minimal missing values",
                    "Strong correlation detected between sales and marketing spend"
                ]
            }),
            ("data-analysis", "detect_anomalies") => json!({
                "anomalies_detected": 5,
                "anomaly_score_threshold": 0.8,
                "anomalous_records": [
                    {"index": 45, "score": 0.95, "reason": "Unusually high sales value"},
                    {"index": 123, "score": 0.87, "reason": "Negative revenue recorded"}
                ]
            }),
            ("visualization", "create_chart") => json!({
                "chart_id": "chart_123",
                "chart_type": parameters.get("chart_type").cloned().unwrap_or_else(|| json!("bar")),
                "image_base64": PLACEHOLDER_PNG,
                "interactive_url": "https://charts.example.com/chart_123"
            }),
            ("aws-analytics", "query_athena") => json!({
                "query_execution_id": "qe-12345",
                "results": [
                    {"region": "us-west-2", "sales": 150000, "orders": 1200},
                    {"region": "us-east-1", "sales": 180000, "orders": 1450}
                ],
                "execution_time_ms": 2340,
                "data_scanned_bytes": 1024000
            }),
            (server, function) => json!({
                "message": format!("Simulated response from {}.{}", server, function),
                "parameters_received": parameters
            }),
        }
    }
}

#[async_trait]
impl ToolExecutor for SimulatedToolServer {
    fn name(&self) -> &str {
        self.capability.server
    }

    fn description(&self) -> String {
        format!(
            "{} tools: {}",
            self.capability.category,
            self.capability.analytics_use_cases.join(", ")
        )
    }

    fn functions(&self) -> Vec<String> {
        self.capability.tools.iter().map(|t| t.to_string()).collect()
    }

    async fn call(&self, function: &str, parameters: Value) -> Result<Value> {
        debug!(server = self.capability.server, function, "Simulated MCP call");
        Ok(self.respond(function, &parameters))
    }
}
