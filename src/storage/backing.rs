// src/storage/backing.rs

use async_trait::async_trait;
use std::time::Duration;
use tracing::info;

use crate::config::RedisConfig;
use crate::error::Result;
use crate::storage::{MemoryWindowStore, RedisWindowStore, RequestRecord, WindowStore};

/// The store picked at startup: Redis when configured, memory otherwise
#[derive(Debug, Clone)]
pub enum BackingStore {
    Memory(MemoryWindowStore),
    Redis(RedisWindowStore),
}

impl BackingStore {
    pub async fn connect(redis: Option<&RedisConfig>) -> Result<Self> {
        match redis {
            Some(config) => {
                info!(url = %config.url, "Using Redis for rate-limit windows");
                Ok(BackingStore::Redis(RedisWindowStore::new(config.clone()).await?))
            }
            None => {
                info!("Using in-process memory for rate-limit windows");
                Ok(BackingStore::Memory(MemoryWindowStore::new()))
            }
        }
    }
}

#[async_trait]
impl WindowStore for BackingStore {
    async fn count(&self, scope: &str, now_ms: u64, window: Duration) -> Result<u64> {
        match self {
            BackingStore::Memory(store) => store.count(scope, now_ms, window).await,
            BackingStore::Redis(store) => store.count(scope, now_ms, window).await,
        }
    }

    async fn record(&self, scope: &str, record: RequestRecord, window: Duration) -> Result<()> {
        match self {
            BackingStore::Memory(store) => store.record(scope, record, window).await,
            BackingStore::Redis(store) => store.record(scope, record, window).await,
        }
    }

    async fn oldest(&self, scope: &str, now_ms: u64, window: Duration) -> Result<Option<u64>> {
        match self {
            BackingStore::Memory(store) => store.oldest(scope, now_ms, window).await,
            BackingStore::Redis(store) => store.oldest(scope, now_ms, window).await,
        }
    }

    async fn clear(&self, scope: &str) -> Result<()> {
        match self {
            BackingStore::Memory(store) => store.clear(scope).await,
            BackingStore::Redis(store) => store.clear(scope).await,
        }
    }
}
