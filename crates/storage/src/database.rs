//! Analytics database access with a simulated fallback.
//!
//! With a live [`PostgresClient`] every call goes to the database. Without
//! one, or when the database errors, schema and query results come from a
//! fixed simulated warehouse so callers always receive the same shape.

use crate::postgres::PostgresClient;
use crate::redis::RedisCache;
use crate::sql_generator::{self, GeneratedSql};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

const QUERY_CACHE_TTL_SECS: u64 = 300;
pub const DEFAULT_ROW_LIMIT: usize = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionTest {
    pub success: bool,
    pub connection_method: String,
    pub database_accessible: bool,
    pub response_time_ms: f64,
    pub message: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
    pub nullable: bool,
    pub default: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub table_type: String,
    pub columns: Vec<ColumnInfo>,
    pub row_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaInfo {
    pub success: bool,
    pub databases: Vec<String>,
    pub schemas: Vec<String>,
    pub tables: BTreeMap<String, Vec<TableInfo>>,
    pub discovery_timestamp: i64,
    pub total_tables: usize,
    pub total_columns: usize,
    pub discovery_method: String,
}

impl SchemaInfo {
    fn from_tables(
        schemas: Vec<String>,
        tables: BTreeMap<String, Vec<TableInfo>>,
        method: &str,
    ) -> Self {
        let total_tables = tables.values().map(Vec::len).sum();
        let total_columns = tables
            .values()
            .flat_map(|t| t.iter())
            .map(|t| t.columns.len())
            .sum();
        Self {
            success: true,
            databases: vec!["analytics".to_string()],
            schemas,
            tables,
            discovery_timestamp: Utc::now().timestamp(),
            total_tables,
            total_columns,
            discovery_method: method.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryOutcome {
    pub success: bool,
    pub data: Vec<Map<String, Value>>,
    pub columns: Vec<String>,
    pub row_count: usize,
    pub execution_time_ms: f64,
    pub query_method: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueryOutcome {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Vec::new(),
            columns: Vec::new(),
            row_count: 0,
            execution_time_ms: 0.0,
            query_method: "none".to_string(),
            message: "Query execution failed".to_string(),
            error: Some(error.into()),
        }
    }
}

pub struct DatabaseIntegration {
    postgres: Option<Arc<PostgresClient>>,
    cache: Option<Arc<RedisCache>>,
    schema_cache: RwLock<Option<SchemaInfo>>,
}

fn col(name: &str, ty: &str, nullable: bool) -> ColumnInfo {
    ColumnInfo {
        name: name.to_string(),
        column_type: ty.to_string(),
        nullable,
        default: None,
    }
}

fn table(name: &str, columns: Vec<ColumnInfo>, row_count: i64) -> TableInfo {
    TableInfo {
        name: name.to_string(),
        table_type: "BASE TABLE".to_string(),
        columns,
        row_count,
    }
}

/// Simulated warehouse layout
pub fn simulated_schema() -> SchemaInfo {
    let mut tables = BTreeMap::new();
    tables.insert(
        "public".to_string(),
        vec![
            table(
                "customers",
                vec![
                    col("customer_id", "integer", false),
                    col("customer_name", "varchar", false),
                    col("email", "varchar", true),
                    col("registration_date", "date", false),
                    col("customer_segment", "varchar", true),
                ],
                15_000,
            ),
            table(
                "products",
                vec![
                    col("product_id", "integer", false),
                    col("product_name", "varchar", false),
                    col("category", "varchar", false),
                    col("price", "decimal", false),
                    col("launch_date", "date", false),
                ],
                500,
            ),
        ],
    );
    tables.insert(
        "sales".to_string(),
        vec![table(
            "transactions",
            vec![
                col("transaction_id", "integer", false),
                col("customer_id", "integer", false),
                col("product_id", "integer", false),
                col("transaction_date", "timestamp", false),
                col("quantity", "integer", false),
                col("unit_price", "decimal", false),
                col("total_amount", "decimal", false),
                col("region", "varchar", true),
            ],
            250_000,
        )],
    );

    let schemas = ["public", "sales", "marketing", "finance"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    SchemaInfo::from_tables(schemas, tables, "simulated")
}

fn rows(values: Value) -> Vec<Map<String, Value>> {
    match values {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|v| match v {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Canned rows keyed off the statement text.
pub fn simulated_rows(sql: &str) -> (Vec<String>, Vec<Map<String, Value>>) {
    let q = sql.to_lowercase();
    let (columns, data): (&[&str], Value) = if q.contains("sales.transactions") {
        if q.contains("region") {
            (
                &["region", "total_sales", "transaction_count", "avg_transaction_value"],
                json!([
                    {"region": "North", "total_sales": 1250000.50, "transaction_count": 5200, "avg_transaction_value": 240.38},
                    {"region": "South", "total_sales": 980000.25, "transaction_count": 4100, "avg_transaction_value": 239.02},
                    {"region": "East", "total_sales": 1100000.75, "transaction_count": 4800, "avg_transaction_value": 229.17},
                    {"region": "West", "total_sales": 1350000.00, "transaction_count": 5500, "avg_transaction_value": 245.45}
                ]),
            )
        } else if q.contains("month") {
            (
                &["month", "monthly_sales", "transaction_count"],
                json!([
                    {"month": "2024-01-01", "monthly_sales": 400000.00, "transaction_count": 1800},
                    {"month": "2024-02-01", "monthly_sales": 420000.00, "transaction_count": 1900},
                    {"month": "2024-03-01", "monthly_sales": 450000.00, "transaction_count": 2000},
                    {"month": "2024-04-01", "monthly_sales": 480000.00, "transaction_count": 2100},
                    {"month": "2024-05-01", "monthly_sales": 510000.00, "transaction_count": 2200}
                ]),
            )
        } else {
            (
                &["total_transactions", "total_sales", "avg_transaction_value"],
                json!([{"total_transactions": 25000, "total_sales": 4680000.50, "avg_transaction_value": 187.20}]),
            )
        }
    } else {
        (
            &["data_type", "record_count"],
            json!([{"data_type": "simulated", "record_count": 1000}]),
        )
    };
    (columns.iter().map(|c| c.to_string()).collect(), rows(data))
}

/// Strip a trailing `;` and append `LIMIT n` unless the statement already limits.
pub fn apply_row_limit(sql: &str, limit: usize) -> String {
    if sql.to_lowercase().contains("limit") {
        return sql.to_string();
    }
    format!("{} LIMIT {}", sql.trim_end().trim_end_matches(';'), limit)
}

fn elapsed_ms(start: Instant) -> f64 {
    (start.elapsed().as_secs_f64() * 100_000.0).round() / 100.0
}

impl DatabaseIntegration {
    pub fn new(postgres: Option<Arc<PostgresClient>>) -> Self {
        tracing::info!(
            live = postgres.is_some(),
            "Database integration initialized"
        );
        Self {
            postgres,
            cache: None,
            schema_cache: RwLock::new(None),
        }
    }

    /// Simulation only
    pub fn simulated() -> Self {
        Self::new(None)
    }

    /// Cache query results in Redis for five minutes
    pub fn with_cache(mut self, cache: Arc<RedisCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn is_live(&self) -> bool {
        self.postgres.is_some()
    }

    pub async fn test_connection(&self) -> ConnectionTest {
        let start = Instant::now();
        let Some(pg) = &self.postgres else {
            return ConnectionTest {
                success: true,
                connection_method: "simulated".to_string(),
                database_accessible: true,
                response_time_ms: 150.0,
                message: "Database connection test simulated successfully".to_string(),
                error: None,
            };
        };

        match pg.ping().await {
            Ok(()) => {
                tracing::info!("Database connection test successful");
                ConnectionTest {
                    success: true,
                    connection_method: "sqlx_pool".to_string(),
                    database_accessible: true,
                    response_time_ms: elapsed_ms(start),
                    message: "Database connection test successful".to_string(),
                    error: None,
                }
            }
            Err(e) => {
                tracing::error!("Database connection test failed: {}", e);
                ConnectionTest {
                    success: false,
                    connection_method: "sqlx_pool".to_string(),
                    database_accessible: false,
                    response_time_ms: elapsed_ms(start),
                    message: "Database connection test failed".to_string(),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    pub async fn discover_schema(&self) -> SchemaInfo {
        let schema = match &self.postgres {
            Some(pg) => match Self::discover_live_schema(pg).await {
                Ok(schema) => schema,
                Err(e) => {
                    tracing::warn!("Schema discovery failed, using simulated schema: {}", e);
                    simulated_schema()
                }
            },
            None => simulated_schema(),
        };

        tracing::info!(
            tables = schema.total_tables,
            columns = schema.total_columns,
            method = %schema.discovery_method,
            "Schema discovery completed"
        );
        *self.schema_cache.write().await = Some(schema.clone());
        schema
    }

    async fn discover_live_schema(pg: &PostgresClient) -> analytics_agent_common::Result<SchemaInfo> {
        let schemas = pg.list_schemas().await?;
        let mut tables = BTreeMap::new();
        for schema in &schemas {
            let mut infos = Vec::new();
            for (name, table_type) in pg.list_tables(schema).await? {
                let columns = pg
                    .list_columns(schema, &name)
                    .await?
                    .into_iter()
                    .map(|(name, column_type, nullable, default)| ColumnInfo {
                        name,
                        column_type,
                        nullable,
                        default,
                    })
                    .collect();
                let row_count = pg.estimate_row_count(&name).await.unwrap_or(0);
                infos.push(TableInfo {
                    name,
                    table_type,
                    columns,
                    row_count,
                });
            }
            tables.insert(schema.clone(), infos);
        }
        Ok(SchemaInfo::from_tables(schemas, tables, "real_database"))
    }

    pub async fn execute_query(&self, sql: &str, limit: usize) -> QueryOutcome {
        let start = Instant::now();
        let statement = apply_row_limit(sql, limit);

        if let Some(pg) = &self.postgres {
            match self.run_live(pg, &statement).await {
                Ok((columns, data)) => {
                    let row_count = data.len();
                    tracing::info!(rows = row_count, "Query execution completed");
                    return QueryOutcome {
                        success: true,
                        data,
                        columns,
                        row_count,
                        execution_time_ms: elapsed_ms(start),
                        query_method: "sqlx".to_string(),
                        message: format!("Query executed successfully, returned {} rows", row_count),
                        error: None,
                    };
                }
                Err(e) => {
                    tracing::error!("Query execution failed: {}", e);
                    return QueryOutcome::failed(e.to_string());
                }
            }
        }

        tracing::info!(
            "Simulating query execution: {}",
            sql.chars().take(100).collect::<String>()
        );
        let (columns, mut data) = simulated_rows(sql);
        data.truncate(limit);
        let row_count = data.len();
        QueryOutcome {
            success: true,
            data,
            columns,
            row_count,
            execution_time_ms: elapsed_ms(start),
            query_method: "simulated".to_string(),
            message: format!("Query simulated successfully, returned {} rows", row_count),
            error: None,
        }
    }

    async fn run_live(
        &self,
        pg: &PostgresClient,
        statement: &str,
    ) -> anyhow::Result<(Vec<String>, Vec<Map<String, Value>>)> {
        match &self.cache {
            Some(cache) => {
                let key = format!("query:{:x}", md5::compute(statement.as_bytes()));
                cache
                    .cache_or_compute(&key, QUERY_CACHE_TTL_SECS, || async {
                        pg.fetch_json(statement).await.map_err(anyhow::Error::from)
                    })
                    .await
            }
            None => Ok(pg.fetch_json(statement).await?),
        }
    }

    pub async fn natural_language_to_sql(&self, query: &str) -> GeneratedSql {
        let generated = sql_generator::natural_language_to_sql(query);
        tracing::info!("Generated SQL query: {}", generated.explanation);
        generated
    }

    /// Generate SQL for `query` and run it
    pub async fn answer_question(&self, query: &str, limit: usize) -> (GeneratedSql, QueryOutcome) {
        let generated = self.natural_language_to_sql(query).await;
        let outcome = self.execute_query(&generated.sql_query, limit).await;
        (generated, outcome)
    }

    pub async fn get_connection_status(&self) -> Value {
        let test = self.test_connection().await;
        let schema_cached = self.schema_cache.read().await.is_some();
        json!({
            "live": self.is_live(),
            "connection_test": test,
            "schema_cached": schema_cached,
            "query_cache": self.cache.is_some(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_limit_appended_once() {
        assert_eq!(apply_row_limit("SELECT * FROM t;", 50), "SELECT * FROM t LIMIT 50");
        assert_eq!(apply_row_limit("SELECT * FROM t LIMIT 5", 50), "SELECT * FROM t LIMIT 5");
        assert_eq!(apply_row_limit("SELECT 1", 0), "SELECT 1 LIMIT 0");
    }

    #[test]
    fn test_simulated_schema_totals() {
        let schema = simulated_schema();
        assert_eq!(schema.total_tables, 3);
        assert_eq!(schema.total_columns, 18);
        assert_eq!(schema.schemas, vec!["public", "sales", "marketing", "finance"]);
        assert_eq!(schema.tables["sales"][0].row_count, 250_000);
    }

    #[tokio::test]
    async fn test_simulated_region_query() {
        let db = DatabaseIntegration::simulated();
        let outcome = db
            .execute_query("SELECT region, SUM(total_amount) FROM sales.transactions GROUP BY region", 1000)
            .await;

        assert!(outcome.success);
        assert_eq!(outcome.query_method, "simulated");
        assert_eq!(outcome.row_count, 4);
        assert_eq!(outcome.columns[0], "region");
        assert_eq!(outcome.data[3]["region"], "West");
    }

    #[tokio::test]
    async fn test_simulated_query_respects_limit() {
        let db = DatabaseIntegration::simulated();
        let outcome = db
            .execute_query("SELECT month FROM sales.transactions", 2)
            .await;
        assert_eq!(outcome.row_count, 2);
        assert_eq!(outcome.data[1]["monthly_sales"], 420000.0);

        let outcome = db.execute_query("SELECT month FROM sales.transactions", 0).await;
        assert!(outcome.success);
        assert_eq!(outcome.row_count, 0);
        assert!(outcome.data.is_empty());
    }

    #[tokio::test]
    async fn test_non_sales_query_returns_placeholder_row() {
        let db = DatabaseIntegration::simulated();
        let outcome = db.execute_query("SELECT * FROM public.customers", 10).await;
        assert_eq!(outcome.data[0]["data_type"], "simulated");
        assert_eq!(outcome.data[0]["record_count"], 1000);
    }

    #[tokio::test]
    async fn test_answer_question_runs_generated_sql() {
        let db = DatabaseIntegration::simulated();
        let (generated, outcome) = db.answer_question("monthly revenue", 100).await;
        assert!(generated.sql_query.contains("monthly_sales"));
        assert_eq!(outcome.row_count, 5);
    }

    #[tokio::test]
    async fn test_schema_is_cached_after_discovery() {
        let db = DatabaseIntegration::simulated();
        let status = db.get_connection_status().await;
        assert_eq!(status["schema_cached"], false);

        db.discover_schema().await;
        let status = db.get_connection_status().await;
        assert_eq!(status["schema_cached"], true);
        assert_eq!(status["connection_test"]["connection_method"], "simulated");
    }
}
