use serde::Serialize;

/// What one MCP tool server offers for analytics work
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolCapability {
    pub server: &'static str,
    pub category: &'static str,
    pub analytics_use_cases: &'static [&'static str],
    pub tools: &'static [&'static str],
}

pub static TOOL_CATALOGUE: [ToolCapability; 8] = [
    ToolCapability {
        server: "aws-docs",
        category: "documentation",
        analytics_use_cases: &[
            "AWS service documentation lookup",
            "Best practices for AWS analytics services",
            "Configuration guidance for data pipelines",
        ],
        tools: &["search_aws_docs", "get_aws_service_info"],
    },
    ToolCapability {
        server: "postgres",
        category: "database",
        analytics_use_cases: &[
            "SQL query execution",
            "Database schema analysis",
            "Data extraction and transformation",
        ],
        tools: &["query_database", "get_schema", "list_tables"],
    },
    ToolCapability {
        server: "filesystem",
        category: "data_access",
        analytics_use_cases: &[
            "Data file reading and writing",
            "Dataset management",
            "Result export and storage",
        ],
        tools: &["read_file", "write_file", "list_directory"],
    },
    ToolCapability {
        server: "data-analysis",
        category: "analytics",
        analytics_use_cases: &[
            "Advanced statistical analysis",
            "Anomaly detection",
            "Time series forecasting",
            "Dataset profiling",
        ],
        tools: &[
            "analyze_dataset",
            "generate_statistics",
            "detect_anomalies",
            "forecast_timeseries",
        ],
    },
    ToolCapability {
        server: "visualization",
        category: "visualization",
        analytics_use_cases: &[
            "Advanced chart creation",
            "Dashboard generation",
            "Interactive visualizations",
            "Export to multiple formats",
        ],
        tools: &["create_chart", "generate_dashboard", "export_visualization"],
    },
    ToolCapability {
        server: "aws-analytics",
        category: "cloud_analytics",
        analytics_use_cases: &[
            "AWS Athena queries",
            "AWS Glue catalog exploration",
            "QuickSight dashboard management",
        ],
        tools: &["query_athena", "describe_glue_tables", "list_quicksight_dashboards"],
    },
    ToolCapability {
        server: "redshift",
        category: "data_warehouse",
        analytics_use_cases: &[
            "Large-scale data queries",
            "Data warehouse analytics",
            "Performance optimization",
        ],
        tools: &["query_redshift", "get_schema", "list_tables"],
    },
    ToolCapability {
        server: "web-search",
        category: "external_data",
        analytics_use_cases: &[
            "Market research data",
            "Current trends and insights",
            "External data validation",
        ],
        tools: &["web_search"],
    },
];

pub fn capability(server: &str) -> Option<&'static ToolCapability> {
    TOOL_CATALOGUE.iter().find(|c| c.server == server)
}
