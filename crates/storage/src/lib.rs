pub mod database;
pub mod object_store;
pub mod postgres;
pub mod redis;
pub mod sql_generator;

pub use database::{
    ColumnInfo, ConnectionTest, DatabaseIntegration, QueryOutcome, SchemaInfo, TableInfo,
    DEFAULT_ROW_LIMIT,
};
pub use object_store::{LocalObjectStore, ObjectInfo, ObjectStore};
pub use postgres::PostgresClient;
pub use redis::RedisCache;
pub use sql_generator::{GeneratedSql, QueryComplexity};

use analytics_agent_common::StorageConfig;
use std::sync::Arc;

/// Connected storage backends. Each one is optional; callers fall back to
/// in-process or simulated behaviour when a backend is absent.
#[derive(Clone, Default)]
pub struct StorageBackends {
    pub postgres: Option<Arc<PostgresClient>>,
    pub redis: Option<Arc<RedisCache>>,
}

/// Connect to every configured backend. Connection failures are logged and
/// leave that backend unset.
pub async fn initialize_storage(config: &StorageConfig) -> StorageBackends {
    let postgres = match config.postgres_url.as_deref() {
        Some(url) => match PostgresClient::new(url).await {
            Ok(client) => match client.run_migrations().await {
                Ok(()) => Some(Arc::new(client)),
                Err(e) => {
                    tracing::warn!("PostgreSQL migrations failed, running without database: {}", e);
                    None
                }
            },
            Err(e) => {
                tracing::warn!("PostgreSQL unavailable, running without database: {}", e);
                None
            }
        },
        None => None,
    };

    let redis = match config.redis_url.as_deref() {
        Some(url) => match RedisCache::new(url).await {
            Ok(cache) => Some(Arc::new(cache)),
            Err(e) => {
                tracing::warn!("Redis unavailable, running without cache: {:#}", e);
                None
            }
        },
        None => None,
    };

    tracing::info!(
        postgres = postgres.is_some(),
        redis = redis.is_some(),
        "Storage backends initialized"
    );
    StorageBackends { postgres, redis }
}
