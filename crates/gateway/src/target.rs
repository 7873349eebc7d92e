//! Gateway target handler
//!
//! Serves the requests the managed gateway forwards to this agent:
//! `/analyze`, `/query`, `/schema` and `/health`.

use analytics_agent_storage::{DatabaseIntegration, DEFAULT_ROW_LIMIT};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument};

#[derive(Debug, Clone, Deserialize)]
pub struct TargetRequest {
    #[serde(rename = "httpMethod", default = "default_method")]
    pub http_method: String,
    #[serde(default = "default_path")]
    pub path: String,
    /// JSON object or a JSON-encoded string
    #[serde(default)]
    pub body: Value,
}

fn default_method() -> String {
    "POST".to_string()
}

fn default_path() -> String {
    "/".to_string()
}

impl TargetRequest {
    pub fn new(path: &str, body: Value) -> Self {
        Self {
            http_method: default_method(),
            path: path.to_string(),
            body,
        }
    }

    fn body_object(&self) -> Value {
        match &self.body {
            Value::String(raw) => serde_json::from_str(raw).unwrap_or_else(|_| json!({})),
            Value::Object(_) => self.body.clone(),
            _ => json!({}),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TargetResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Value,
}

impl TargetResponse {
    fn new(status_code: u16, body: Value) -> Self {
        let headers = [
            ("Content-Type", "application/json"),
            ("Access-Control-Allow-Origin", "*"),
            ("Access-Control-Allow-Methods", "GET, POST, OPTIONS"),
            ("Access-Control-Allow-Headers", "Content-Type, Authorization"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        Self {
            status_code,
            headers,
            body,
        }
    }

    /// Lambda proxy shape with the body encoded as a string
    pub fn to_lambda_value(&self) -> Value {
        json!({
            "statusCode": self.status_code,
            "headers": self.headers,
            "body": self.body.to_string(),
        })
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Numbers found directly in `data` or as values of its objects
pub fn extract_numeric_data(data: &[Value]) -> Vec<f64> {
    let mut numbers = Vec::new();
    for item in data {
        match item {
            Value::Object(map) => numbers.extend(map.values().filter_map(Value::as_f64)),
            other => numbers.extend(other.as_f64()),
        }
    }
    numbers
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

pub fn statistical_analysis(data: &[Value]) -> Value {
    if data.is_empty() {
        return json!({"summary": "No data provided for analysis"});
    }
    let values = extract_numeric_data(data);
    if values.is_empty() {
        return json!({"summary": "No numeric data found for statistical analysis"});
    }

    let sorted = sorted(&values);
    let mean = round_to(values.iter().sum::<f64>() / values.len() as f64, 2);
    let median = sorted[sorted.len() / 2];
    let min = sorted[0];
    let max = sorted[sorted.len() - 1];

    json!({
        "summary": format!("Statistical analysis of {} data points", values.len()),
        "metrics": {
            "mean": mean,
            "median": median,
            "min": min,
            "max": max,
            "count": values.len(),
        },
        "insights": [
            format!("Average value is {}", mean),
            format!("Data range spans from {} to {}", min, max),
            format!("Median value is {}", median),
        ],
    })
}

/// IQR outliers at 1.5 times the interquartile range
pub fn anomaly_detection(data: &[Value]) -> Value {
    let values = extract_numeric_data(data);
    if values.len() < 4 {
        return json!({"summary": "Insufficient data for anomaly detection"});
    }

    let sorted = sorted(&values);
    let n = sorted.len();
    let q1 = sorted[n / 4];
    let q3 = sorted[3 * n / 4];
    let iqr = q3 - q1;
    let lower = q1 - 1.5 * iqr;
    let upper = q3 + 1.5 * iqr;

    let anomalies = values.iter().filter(|&&x| x < lower || x > upper).count();
    let rate = round_to(anomalies as f64 / n as f64 * 100.0, 2);

    json!({
        "summary": format!("Anomaly detection completed on {} data points", n),
        "metrics": {
            "total_points": n,
            "anomalies_found": anomalies,
            "anomaly_rate": rate,
            "bounds": {"lower": lower, "upper": upper},
        },
        "insights": [
            format!("Found {} anomalous data points", anomalies),
            format!("Anomaly rate: {}%", rate),
            format!("Normal range: {} to {}", round_to(lower, 2), round_to(upper, 2)),
        ],
    })
}

/// Least-squares line over the series index, projected three steps ahead
pub fn predictive_analysis(data: &[Value]) -> Value {
    let values = extract_numeric_data(data);
    if values.len() < 3 {
        return json!({"summary": "Insufficient data for predictive analysis"});
    }

    let n = values.len() as f64;
    let sum_x: f64 = (0..values.len()).map(|x| x as f64).sum();
    let sum_y: f64 = values.iter().sum();
    let sum_xy: f64 = values.iter().enumerate().map(|(x, y)| x as f64 * y).sum();
    let sum_x2: f64 = (0..values.len()).map(|x| (x * x) as f64).sum();

    let slope = (n * sum_xy - sum_x * sum_y) / (n * sum_x2 - sum_x * sum_x);
    let intercept = (sum_y - slope * sum_x) / n;
    let predictions: Vec<f64> = (0..3)
        .map(|i| round_to(slope * (n + i as f64) + intercept, 2))
        .collect();

    let (direction, shape) = if slope > 0.0 {
        ("increasing", "upward")
    } else if slope < 0.0 {
        ("decreasing", "downward")
    } else {
        ("stable", "stable")
    };
    let strength = if slope.abs() > 1.0 {
        "strong"
    } else if slope.abs() > 0.1 {
        "moderate"
    } else {
        "weak"
    };
    let listed = predictions
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(", ");

    json!({
        "summary": format!("Predictive analysis based on {} data points", values.len()),
        "metrics": {
            "trend_slope": round_to(slope, 4),
            "trend_direction": direction,
            "predictions": predictions,
        },
        "insights": [
            format!("Data shows {} trend", shape),
            format!("Predicted next values: {}", listed),
            format!("Trend strength: {}", strength),
        ],
    })
}

pub struct GatewayTarget {
    database: Arc<DatabaseIntegration>,
}

impl GatewayTarget {
    pub fn new(database: Arc<DatabaseIntegration>) -> Self {
        Self { database }
    }

    #[instrument(skip(self, request), fields(path = %request.path))]
    pub async fn handle(&self, request: &TargetRequest, request_id: &str) -> TargetResponse {
        info!(method = %request.http_method, "Gateway target request");
        let body = request.body_object();

        match request.path.as_str() {
            "/analyze" => self.handle_analyze(&body, request_id),
            "/query" => self.handle_query(&body).await,
            "/schema" => self.handle_schema(&body).await,
            "/health" => self.handle_health().await,
            _ => TargetResponse::new(404, json!({"error": "Endpoint not found"})),
        }
    }

    fn handle_analyze(&self, body: &Value, request_id: &str) -> TargetResponse {
        let data = body
            .get("data")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let analysis_type = body
            .get("analysis_type")
            .and_then(Value::as_str)
            .unwrap_or("statistical");

        let results = match analysis_type {
            "statistical" => statistical_analysis(&data),
            "anomaly_detection" => anomaly_detection(&data),
            "predictive" => predictive_analysis(&data),
            other => {
                return TargetResponse::new(
                    400,
                    json!({"error": format!("Unsupported analysis type: {}", other)}),
                )
            }
        };

        TargetResponse::new(
            200,
            json!({
                "analysis_id": format!("analysis_{}", request_id),
                "results": results,
                "processing_time": 0.5,
                "status": "completed",
            }),
        )
    }

    async fn handle_query(&self, body: &Value) -> TargetResponse {
        let sql = body.get("sql").and_then(Value::as_str).unwrap_or_default();
        let question = body.get("question").and_then(Value::as_str).unwrap_or_default();
        if sql.is_empty() && question.is_empty() {
            return TargetResponse::new(400, json!({"error": "SQL query is required"}));
        }
        let max_rows = body
            .get("max_rows")
            .and_then(Value::as_u64)
            .map(|n| n as usize)
            .unwrap_or(DEFAULT_ROW_LIMIT);

        // a plain-language question is translated to SQL first
        let (generated, outcome) = if sql.is_empty() {
            let (generated, outcome) = self.database.answer_question(question, max_rows).await;
            (Some(generated), outcome)
        } else {
            (None, self.database.execute_query(sql, max_rows).await)
        };
        let columns: Vec<Value> = outcome
            .columns
            .iter()
            .map(|name| json!({"name": name, "type": "unknown", "nullable": true}))
            .collect();
        let rows: Vec<Vec<Value>> = outcome
            .data
            .iter()
            .map(|row| {
                outcome
                    .columns
                    .iter()
                    .map(|c| row.get(c).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        let mut result = json!({
            "query_id": format!("query_{}", Utc::now().timestamp()),
            "columns": columns,
            "rows": rows,
            "row_count": outcome.row_count,
            "execution_time_ms": outcome.execution_time_ms,
            "status": if outcome.success { "success" } else { "error" },
        });
        if let Some(error) = outcome.error {
            result["error"] = Value::String(error);
        }
        if let Some(generated) = generated {
            result["generated_sql"] = Value::String(generated.sql_query);
            result["explanation"] = Value::String(generated.explanation);
        }
        TargetResponse::new(200, result)
    }

    async fn handle_schema(&self, body: &Value) -> TargetResponse {
        let table_name = body.get("table_name").and_then(Value::as_str);
        let schema = self.database.discover_schema().await;

        let mut tables = Vec::new();
        for (schema_name, infos) in &schema.tables {
            for table in infos {
                let wanted = match table_name {
                    Some(name) => table.name == name,
                    None => schema_name == "public",
                };
                if !wanted {
                    continue;
                }
                let columns: Vec<Value> = table
                    .columns
                    .iter()
                    .map(|c| {
                        json!({
                            "column_name": c.name,
                            "data_type": c.column_type,
                            "is_nullable": c.nullable,
                            "default_value": c.default,
                            "is_primary_key": false,
                            "is_foreign_key": false,
                        })
                    })
                    .collect();
                tables.push(json!({
                    "table_name": table.name,
                    "schema_name": schema_name,
                    "columns": columns,
                    "indexes": [],
                    "row_count": table.row_count,
                }));
            }
        }

        TargetResponse::new(200, json!({"database_name": "analytics", "tables": tables}))
    }

    async fn handle_health(&self) -> TargetResponse {
        let healthy = self.database.test_connection().await.success;
        TargetResponse::new(
            200,
            json!({
                "status": if healthy { "healthy" } else { "degraded" },
                "database": if healthy { "healthy" } else { "unhealthy" },
                "timestamp": Utc::now().to_rfc3339(),
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> GatewayTarget {
        GatewayTarget::new(Arc::new(DatabaseIntegration::simulated()))
    }

    #[test]
    fn test_statistics_over_mixed_records() {
        let data = vec![json!({"revenue": 10, "region": "North"}), json!(20), json!(30.0)];
        let result = statistical_analysis(&data);
        assert_eq!(result["metrics"]["mean"], 20.0);
        assert_eq!(result["metrics"]["median"], 20.0);
        assert_eq!(result["metrics"]["count"], 3);
    }

    #[test]
    fn test_anomaly_detection_flags_outlier() {
        let data: Vec<Value> = [10, 11, 12, 13, 12, 11, 500].iter().map(|v| json!(v)).collect();
        let result = anomaly_detection(&data);
        assert_eq!(result["metrics"]["anomalies_found"], 1);
        assert_eq!(result["insights"][0], "Found 1 anomalous data points");
    }

    #[test]
    fn test_predictive_linear_series() {
        let data: Vec<Value> = [1, 2, 3, 4].iter().map(|v| json!(v)).collect();
        let result = predictive_analysis(&data);
        assert_eq!(result["metrics"]["trend_direction"], "increasing");
        assert_eq!(result["metrics"]["predictions"], json!([5.0, 6.0, 7.0]));
        assert_eq!(result["insights"][2], "Trend strength: moderate");
    }

    #[tokio::test]
    async fn test_unknown_path_is_404() {
        let response = target()
            .handle(&TargetRequest::new("/nope", json!({})), "req-1")
            .await;
        assert_eq!(response.status_code, 404);
        assert_eq!(response.body["error"], "Endpoint not found");
    }

    #[tokio::test]
    async fn test_analyze_rejects_unknown_type() {
        let request = TargetRequest::new("/analyze", json!({"analysis_type": "clustering"}));
        let response = target().handle(&request, "req-2").await;
        assert_eq!(response.status_code, 400);
    }

    #[tokio::test]
    async fn test_query_requires_sql_and_accepts_string_body() {
        let response = target()
            .handle(&TargetRequest::new("/query", json!("{}")), "req-3")
            .await;
        assert_eq!(response.status_code, 400);

        let body = json!({"sql": "SELECT region FROM sales.transactions", "max_rows": 2}).to_string();
        let response = target()
            .handle(&TargetRequest::new("/query", Value::String(body)), "req-4")
            .await;
        assert_eq!(response.status_code, 200);
        assert_eq!(response.body["row_count"], 2);
        assert_eq!(response.body["rows"][0][0], "North");
        assert_eq!(response.body["columns"][0]["name"], "region");
    }

    #[tokio::test]
    async fn test_query_accepts_natural_language_question() {
        let request = TargetRequest::new("/query", json!({"question": "Show me sales by region"}));
        let response = target().handle(&request, "req-7").await;
        assert_eq!(response.status_code, 200);
        let sql = response.body["generated_sql"].as_str().unwrap().to_lowercase();
        assert!(sql.contains("region"));
        assert!(response.body["row_count"].as_u64().unwrap() > 0);
    }

    #[tokio::test]
    async fn test_schema_defaults_to_public_tables() {
        let response = target()
            .handle(&TargetRequest::new("/schema", json!({})), "req-5")
            .await;
        let tables = response.body["tables"].as_array().unwrap();
        assert_eq!(tables.len(), 2);

        let response = target()
            .handle(&TargetRequest::new("/schema", json!({"table_name": "transactions"})), "req-6")
            .await;
        assert_eq!(response.body["tables"][0]["schema_name"], "sales");
    }

    #[test]
    fn test_lambda_shape_encodes_body() {
        let response = TargetResponse::new(200, json!({"ok": true}));
        let value = response.to_lambda_value();
        assert_eq!(value["statusCode"], 200);
        assert_eq!(value["body"], "{\"ok\":true}");
        assert_eq!(value["headers"]["Access-Control-Allow-Origin"], "*");
    }
}
