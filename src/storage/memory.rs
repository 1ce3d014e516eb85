// src/storage/memory.rs

// In-memory window storage, the default backend.
// State lives for the life of the process and is not shared across instances.
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::error::{GatewayError, Result, StorageError};
use crate::storage::{RequestRecord, SlidingWindowCounter, WindowStore};

/// In-memory storage backend implementation
#[derive(Debug, Clone, Default)]
pub struct MemoryWindowStore {
    counters: Arc<Mutex<HashMap<String, SlidingWindowCounter>>>,
}

impl MemoryWindowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of scopes currently holding at least one live record
    pub fn scope_count(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, SlidingWindowCounter>>> {
        self.counters.lock().map_err(|e| {
            GatewayError::Storage(StorageError::LockPoisoned(e.to_string()))
        })
    }

    /// Prunes a scope and drops it once empty so idle callers don't pile up.
    /// Returns the pruned counter if anything is left in it.
    fn prune_scope<'a>(
        counters: &'a mut HashMap<String, SlidingWindowCounter>,
        scope: &str,
        now_ms: u64,
    ) -> Option<&'a mut SlidingWindowCounter> {
        let empty = match counters.get_mut(scope) {
            Some(counter) => {
                counter.prune(now_ms);
                counter.is_empty()
            }
            None => return None,
        };

        if empty {
            counters.remove(scope);
            None
        } else {
            counters.get_mut(scope)
        }
    }
}

#[async_trait]
impl WindowStore for MemoryWindowStore {
    async fn count(&self, scope: &str, now_ms: u64, _window: Duration) -> Result<u64> {
        let mut counters = self.lock()?;
        Ok(Self::prune_scope(&mut counters, scope, now_ms)
            .map(|counter| counter.count(now_ms))
            .unwrap_or(0))
    }

    async fn record(&self, scope: &str, record: RequestRecord, window: Duration) -> Result<()> {
        let mut counters = self.lock()?;
        if let Some(counter) = counters.get_mut(scope) {
            counter.record(record);
            return Ok(());
        }

        let mut counter = SlidingWindowCounter::new(window)?;
        counter.record(record);
        counters.insert(scope.to_string(), counter);
        Ok(())
    }

    async fn oldest(&self, scope: &str, now_ms: u64, _window: Duration) -> Result<Option<u64>> {
        let mut counters = self.lock()?;
        Ok(Self::prune_scope(&mut counters, scope, now_ms)
            .and_then(|counter| counter.oldest_timestamp()))
    }

    async fn clear(&self, scope: &str) -> Result<()> {
        self.lock()?.remove(scope);
        Ok(())
    }
}
