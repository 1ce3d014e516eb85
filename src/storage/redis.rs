// src/storage/redis.rs

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use crate::config::RedisConfig;
use crate::error::{GatewayError, Result, StorageError};
use crate::storage::{window_cutoff, RequestRecord, WindowStore};

/// Window storage in Redis, one sorted set per scope.
///
/// Score is the record timestamp in milliseconds; members are unique so two
/// requests in the same millisecond are both counted. Check-then-record is
/// only serialized within one process.
#[derive(Clone)]
pub struct RedisWindowStore {
    connection: ConnectionManager,
    config: RedisConfig,
}

// Manually implement Debug
impl fmt::Debug for RedisWindowStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisWindowStore")
            .field("url", &self.config.url)
            .field("key_prefix", &self.config.key_prefix)
            .finish()
    }
}

#[derive(Serialize)]
struct Member<'a> {
    id: Uuid,
    #[serde(flatten)]
    record: &'a RequestRecord,
}

impl RedisWindowStore {
    /// Connects to Redis, giving up after the configured connection timeout
    pub async fn new(config: RedisConfig) -> Result<Self> {
        // Open the client - this doesn't actually connect to Redis yet
        let client = Client::open(config.url.as_str()).map_err(|e| {
            GatewayError::Storage(StorageError::RedisConnection(e.to_string()))
        })?;

        let connection =
            match tokio::time::timeout(config.connection_timeout, ConnectionManager::new(client))
                .await
            {
                Ok(result) => result.map_err(|e| {
                    GatewayError::Storage(StorageError::RedisConnection(e.to_string()))
                })?,
                Err(_) => {
                    return Err(GatewayError::Storage(StorageError::RedisConnection(
                        format!(
                            "Connection to Redis at {} timed out after {:?}",
                            config.url, config.connection_timeout
                        ),
                    )));
                }
            };

        debug!(url = %config.url, "Connected window store to Redis");
        Ok(Self { connection, config })
    }

    fn key(&self, scope: &str) -> String {
        format!("{}:{}", self.config.key_prefix, scope)
    }

    async fn prune(&self, key: &str, now_ms: u64, window: Duration) -> Result<()> {
        if let Some(cutoff) = window_cutoff(now_ms, window) {
            let mut conn = self.connection.clone();
            let _: () = conn.zrembyscore(key, "-inf", cutoff).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl WindowStore for RedisWindowStore {
    async fn count(&self, scope: &str, now_ms: u64, window: Duration) -> Result<u64> {
        let key = self.key(scope);
        self.prune(&key, now_ms, window).await?;

        let mut conn = self.connection.clone();
        let count: u64 = conn.zcard(&key).await?;
        Ok(count)
    }

    async fn record(&self, scope: &str, record: RequestRecord, window: Duration) -> Result<()> {
        let key = self.key(scope);
        let member = serde_json::to_string(&Member {
            id: Uuid::new_v4(),
            record: &record,
        })?;
        let ttl_ms = i64::try_from(window.as_millis()).unwrap_or(i64::MAX);

        let mut conn = self.connection.clone();
        let _: () = redis::pipe()
            .atomic()
            .zadd(&key, member, record.timestamp_ms)
            .ignore()
            .pexpire(&key, ttl_ms)
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn oldest(&self, scope: &str, now_ms: u64, window: Duration) -> Result<Option<u64>> {
        let key = self.key(scope);
        self.prune(&key, now_ms, window).await?;

        let mut conn = self.connection.clone();
        let first: Vec<(String, f64)> = conn.zrange_withscores(&key, 0, 0).await?;
        Ok(first.first().map(|(_, score)| *score as u64))
    }

    async fn clear(&self, scope: &str) -> Result<()> {
        let mut conn = self.connection.clone();
        let _: () = conn.del(self.key(scope)).await?;
        Ok(())
    }
}
