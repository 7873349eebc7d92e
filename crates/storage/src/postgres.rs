use analytics_agent_common::{AnalyticsError, ConversationRecord, Result, UserPreferences};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::{postgres::PgPoolOptions, Column, Executor, PgPool};

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS conversations (
        id BIGSERIAL PRIMARY KEY,
        session_id TEXT NOT NULL,
        user_id TEXT,
        query TEXT NOT NULL,
        response TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        expires_at TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_conversations_session ON conversations (session_id, created_at DESC)",
    r#"
    CREATE TABLE IF NOT EXISTS user_preferences (
        user_id TEXT PRIMARY KEY,
        preferences JSONB NOT NULL DEFAULT '{}'::jsonb,
        version INTEGER NOT NULL DEFAULT 0,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
];

pub struct PostgresClient {
    pool: PgPool,
}

fn db_err(e: sqlx::Error) -> AnalyticsError {
    AnalyticsError::Database(e.to_string())
}

impl PostgresClient {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .min_connections(2)
            .connect(database_url)
            .await
            .map_err(db_err)?;
        tracing::info!("Connected to PostgreSQL");
        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<()> {
        for statement in MIGRATIONS {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(db_err)?;
        }
        tracing::info!("Applied {} schema statements", MIGRATIONS.len());
        Ok(())
    }

    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await.map_err(db_err)?;
        Ok(())
    }

    /// Run a read query and return `(columns, rows)` with each row as a JSON object.
    ///
    /// The statement is wrapped in `row_to_json`, so only row-returning
    /// statements are accepted.
    pub async fn fetch_json(&self, sql: &str) -> Result<(Vec<String>, Vec<Map<String, Value>>)> {
        let describe = (&self.pool).describe(sql).await.map_err(db_err)?;
        let columns = describe
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();

        let wrapped = format!("SELECT row_to_json(q) FROM ({}) q", sql);
        let rows: Vec<Value> = sqlx::query_scalar(&wrapped)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        let rows = rows
            .into_iter()
            .filter_map(|row| match row {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect();
        Ok((columns, rows))
    }

    pub async fn list_schemas(&self) -> Result<Vec<String>> {
        sqlx::query_scalar(
            "SELECT schema_name::text FROM information_schema.schemata \
             WHERE schema_name NOT IN ('information_schema', 'pg_catalog', 'pg_toast') \
             ORDER BY schema_name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }

    /// `(table_name, table_type)` pairs of one schema
    pub async fn list_tables(&self, schema: &str) -> Result<Vec<(String, String)>> {
        sqlx::query_as(
            "SELECT table_name::text, table_type::text FROM information_schema.tables \
             WHERE table_schema = $1 ORDER BY table_name",
        )
        .bind(schema)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }

    /// `(name, type, is_nullable, default)` per column in ordinal order
    pub async fn list_columns(
        &self,
        schema: &str,
        table: &str,
    ) -> Result<Vec<(String, String, bool, Option<String>)>> {
        let rows: Vec<(String, String, String, Option<String>)> = sqlx::query_as(
            "SELECT column_name::text, data_type::text, is_nullable::text, column_default::text \
             FROM information_schema.columns \
             WHERE table_schema = $1 AND table_name = $2 ORDER BY ordinal_position",
        )
        .bind(schema)
        .bind(table)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(rows
            .into_iter()
            .map(|(name, ty, nullable, default)| (name, ty, nullable == "YES", default))
            .collect())
    }

    /// Planner row estimate from `pg_class`
    pub async fn estimate_row_count(&self, table: &str) -> Result<i64> {
        let estimate: Option<i64> =
            sqlx::query_scalar("SELECT reltuples::BIGINT FROM pg_class WHERE relname = $1")
                .bind(table)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;
        Ok(estimate.unwrap_or(0).max(0))
    }

    pub async fn insert_conversation(&self, record: &ConversationRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO conversations (session_id, user_id, query, response, created_at, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&record.session_id)
        .bind(&record.user_id)
        .bind(&record.query)
        .bind(&record.response)
        .bind(record.timestamp)
        .bind(record.expires_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    /// Unexpired conversations, most recent first
    pub async fn recent_conversations(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationRecord>> {
        let rows: Vec<(String, Option<String>, String, String, DateTime<Utc>, DateTime<Utc>)> =
            sqlx::query_as(
                "SELECT session_id, user_id, query, response, created_at, expires_at \
                 FROM conversations WHERE session_id = $1 AND expires_at > NOW() \
                 ORDER BY created_at DESC LIMIT $2",
            )
            .bind(session_id)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(rows
            .into_iter()
            .map(|(session_id, user_id, query, response, timestamp, expires_at)| ConversationRecord {
                session_id,
                user_id,
                timestamp,
                query,
                response,
                expires_at,
            })
            .collect())
    }

    /// Delete conversations created before `cutoff`; returns the number removed
    pub async fn delete_conversations_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM conversations WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected())
    }

    pub async fn get_preferences(&self, user_id: &str) -> Result<Option<UserPreferences>> {
        let row: Option<(String, Value, i32, DateTime<Utc>)> = sqlx::query_as(
            "SELECT user_id, preferences, version, updated_at FROM user_preferences WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(row.map(|(user_id, preferences, version, updated_at)| UserPreferences {
            user_id,
            preferences: match preferences {
                Value::Object(map) => map,
                _ => Map::new(),
            },
            version: version.max(0) as u32,
            updated_at,
        }))
    }

    pub async fn upsert_preferences(&self, prefs: &UserPreferences) -> Result<()> {
        sqlx::query(
            "INSERT INTO user_preferences (user_id, preferences, version, updated_at) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (user_id) DO UPDATE \
             SET preferences = EXCLUDED.preferences, version = EXCLUDED.version, updated_at = EXCLUDED.updated_at",
        )
        .bind(&prefs.user_id)
        .bind(Value::Object(prefs.preferences.clone()))
        .bind(prefs.version as i32)
        .bind(prefs.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }
}
