use redis::AsyncCommands;
use redis::Client;

use crate::db::KeyValueStore;
use crate::error::{AppError, AppResult};

/// Creates a Redis client for the redis storage backend
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Redis-backed store, keys are prefixed with the namespace (`namespace:key`)
///
/// Writes go straight to Redis and are awaited; stores rely on a mutation being
/// durable once the call returns.
#[derive(Clone)]
pub struct RedisStore {
    redis_client: Client,
    namespace: String,
}

impl RedisStore {
    pub fn new(redis_client: Client, namespace: impl Into<String>) -> Self {
        Self {
            redis_client,
            namespace: namespace.into(),
        }
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }

    async fn connection(
        &self,
        on_error: fn(String) -> AppError,
    ) -> AppResult<redis::aio::MultiplexedConnection> {
        self.redis_client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| on_error(format!("Redis connection failed: {}", e)))
    }
}

#[async_trait::async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.connection(AppError::StorageRead).await?;
        let value: Option<String> = conn.get(self.full_key(key)).await.map_err(|e| {
            tracing::warn!(error = %e, key = %key, "Redis get failed");
            AppError::StorageRead(e.to_string())
        })?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: String) -> AppResult<()> {
        let mut conn = self.connection(AppError::StorageWrite).await?;
        let _: () = conn.set(self.full_key(key), value).await.map_err(|e| {
            tracing::warn!(error = %e, key = %key, "Redis set failed");
            AppError::StorageWrite(e.to_string())
        })?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> AppResult<()> {
        let mut conn = self.connection(AppError::StorageWrite).await?;
        let _: () = conn
            .del(self.full_key(key))
            .await
            .map_err(|e| AppError::StorageWrite(e.to_string()))?;
        Ok(())
    }

    fn namespace(&self) -> &str {
        &self.namespace
    }
}
