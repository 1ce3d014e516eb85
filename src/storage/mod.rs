// src/storage/mod.rs

pub mod backing;
pub mod counter;
pub mod memory;
pub mod redis;

#[cfg(test)]
mod tests;

pub use backing::BackingStore;
pub use counter::SlidingWindowCounter;
pub use memory::MemoryWindowStore;
pub use redis::RedisWindowStore;

use super::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::time::Duration;

/// One admitted request, as seen by a window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestRecord {
    /// Epoch milliseconds at which the request was admitted
    pub timestamp_ms: u64,

    /// Caller the request was made on behalf of, if known
    pub caller_id: Option<String>,
}

impl RequestRecord {
    pub fn new(timestamp_ms: u64, caller_id: Option<&str>) -> Self {
        Self {
            timestamp_ms,
            caller_id: caller_id.map(str::to_string),
        }
    }
}

/// Core trait that all window storage backends must implement.
///
/// A scope is an opaque key ("global", "caller:<id>", ...). Every read prunes
/// records with `timestamp <= now - window` before answering.
#[async_trait]
pub trait WindowStore: Send + Sync + Debug {
    // Number of records in the scope within the trailing window
    async fn count(&self, scope: &str, now_ms: u64, window: Duration) -> Result<u64>;

    // Appends one record to the scope unconditionally
    async fn record(&self, scope: &str, record: RequestRecord, window: Duration) -> Result<()>;

    // Earliest retained timestamp in the scope
    async fn oldest(&self, scope: &str, now_ms: u64, window: Duration) -> Result<Option<u64>>;

    // Drops every record in the scope
    async fn clear(&self, scope: &str) -> Result<()>;
}

/// Milliseconds strictly after which a record is still inside the window.
///
/// `None` means nothing can have expired yet.
pub(crate) fn window_cutoff(now_ms: u64, window: Duration) -> Option<u64> {
    let window_ms = u64::try_from(window.as_millis()).unwrap_or(u64::MAX);
    now_ms.checked_sub(window_ms)
}
