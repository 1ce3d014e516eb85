// src/limiter/mod.rs

pub mod tiers;

#[cfg(test)]
mod tests;

pub use tiers::{AdmissionDecision, Tier, TierRegistry};

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::clock::Clock;
use crate::config::RateLimitConfig;
use crate::error::Result;
use crate::rate_limit_event;
use crate::storage::{RequestRecord, WindowStore};

/// Read-only usage snapshot for one tier and (optionally) one caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageStats {
    pub global_usage: u64,
    pub global_limit: u64,
    pub global_remaining: u64,
    pub caller_usage: Option<u64>,
    pub caller_limit: Option<u64>,
    pub caller_remaining: Option<u64>,
    /// Milliseconds until the binding limit frees a slot; 0 when allowed
    pub reset_time_ms: u64,
}

/// Result of an atomic check-and-record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionStatus {
    /// Whether the request was admitted (and recorded)
    pub allowed: bool,

    /// Milliseconds until a slot frees up; 0 when admitted
    pub reset_time_ms: u64,

    /// Usage after the decision
    pub stats: UsageStats,
}

/// Counts observed at one instant
#[derive(Debug, Clone, Copy)]
struct Snapshot {
    now_ms: u64,
    global: u64,
    caller: Option<u64>,
}

/// Sliding-window limiter for one tier.
///
/// Holds one global scope plus one scope per caller id. Both limits must pass
/// for a request to be admitted.
#[derive(Debug)]
pub struct RateLimiter<S: WindowStore> {
    tier: String,
    config: RateLimitConfig,
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    // Serializes check-then-record so concurrent callers can't both take the last slot
    admission: Mutex<()>,
}

impl<S: WindowStore> RateLimiter<S> {
    pub fn new(
        tier: impl Into<String>,
        config: RateLimitConfig,
        store: Arc<S>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            tier: tier.into(),
            config,
            store,
            clock,
            admission: Mutex::new(()),
        })
    }

    pub fn tier(&self) -> &str {
        &self.tier
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Checks both limits without recording anything.
    pub async fn is_allowed(&self, caller_id: Option<&str>) -> Result<bool> {
        let _guard = self.admission.lock().await;
        let snapshot = self.snapshot(normalize(caller_id)).await?;
        Ok(self.allows(&snapshot))
    }

    /// Checks without recording; a denial's reset time comes from the same snapshot.
    pub async fn check(&self, caller_id: Option<&str>) -> Result<AdmissionStatus> {
        let caller_id = normalize(caller_id);
        let _guard = self.admission.lock().await;

        let snapshot = self.snapshot(caller_id).await?;
        let allowed = self.allows(&snapshot);
        let reset_time_ms = if allowed {
            0
        } else {
            self.reset_time_for(caller_id, &snapshot).await?
        };

        Ok(AdmissionStatus {
            allowed,
            reset_time_ms,
            stats: self.stats_for(&snapshot, reset_time_ms),
        })
    }

    /// Records one request against the global scope and the caller's scope.
    ///
    /// Not gated: callers must have seen `is_allowed` return true first.
    pub async fn record_request(&self, caller_id: Option<&str>) -> Result<()> {
        let _guard = self.admission.lock().await;
        let now_ms = self.clock.now_millis();
        self.record_at(normalize(caller_id), now_ms).await
    }

    /// Checks and, when allowed, records in one step.
    pub async fn check_and_record(&self, caller_id: Option<&str>) -> Result<AdmissionStatus> {
        let caller_id = normalize(caller_id);
        let _guard = self.admission.lock().await;

        let mut snapshot = self.snapshot(caller_id).await?;
        let allowed = self.allows(&snapshot);

        rate_limit_event!(
            self.tier.as_str(),
            caller_id.unwrap_or("-"),
            allowed,
            self.config.max_global_requests,
            self.config.window_ms()
        );

        let reset_time_ms = if allowed {
            self.record_at(caller_id, snapshot.now_ms).await?;
            snapshot.global += 1;
            snapshot.caller = snapshot.caller.map(|count| count + 1);
            0
        } else {
            self.reset_time_for(caller_id, &snapshot).await?
        };

        Ok(AdmissionStatus {
            allowed,
            reset_time_ms,
            stats: self.stats_for(&snapshot, reset_time_ms),
        })
    }

    /// Milliseconds until the binding limit admits again; 0 when allowed now.
    pub async fn reset_time_ms(&self, caller_id: Option<&str>) -> Result<u64> {
        let caller_id = normalize(caller_id);
        let _guard = self.admission.lock().await;
        let snapshot = self.snapshot(caller_id).await?;
        self.reset_time_for(caller_id, &snapshot).await
    }

    /// Usage snapshot. Only side effect is pruning stale records.
    pub async fn stats(&self, caller_id: Option<&str>) -> Result<UsageStats> {
        let caller_id = normalize(caller_id);
        let _guard = self.admission.lock().await;
        let snapshot = self.snapshot(caller_id).await?;
        let reset_time_ms = self.reset_time_for(caller_id, &snapshot).await?;
        Ok(self.stats_for(&snapshot, reset_time_ms))
    }

    /// Clears a caller's window, or the global window when no caller is given.
    pub async fn reset(&self, caller_id: Option<&str>) -> Result<()> {
        let _guard = self.admission.lock().await;
        let scope = match normalize(caller_id) {
            Some(caller) => self.caller_scope(caller),
            None => self.global_scope(),
        };
        debug!(tier = %self.tier, scope = %scope, "Resetting rate limit window");
        self.store.clear(&scope).await
    }

    fn global_scope(&self) -> String {
        format!("{}:global", self.tier)
    }

    fn caller_scope(&self, caller_id: &str) -> String {
        format!("{}:caller:{}", self.tier, caller_id)
    }

    async fn snapshot(&self, caller_id: Option<&str>) -> Result<Snapshot> {
        let now_ms = self.clock.now_millis();
        let window = self.config.window;

        let global = self.store.count(&self.global_scope(), now_ms, window).await?;
        let caller = match caller_id {
            Some(caller) => Some(
                self.store
                    .count(&self.caller_scope(caller), now_ms, window)
                    .await?,
            ),
            None => None,
        };

        Ok(Snapshot {
            now_ms,
            global,
            caller,
        })
    }

    fn global_saturated(&self, snapshot: &Snapshot) -> bool {
        snapshot.global >= self.config.max_global_requests
    }

    fn caller_saturated(&self, snapshot: &Snapshot) -> bool {
        match (self.config.max_requests_per_caller, snapshot.caller) {
            (Some(cap), Some(count)) => count >= cap,
            _ => false,
        }
    }

    fn allows(&self, snapshot: &Snapshot) -> bool {
        !self.global_saturated(snapshot) && !self.caller_saturated(snapshot)
    }

    async fn record_at(&self, caller_id: Option<&str>, now_ms: u64) -> Result<()> {
        let window = self.config.window;
        let record = RequestRecord::new(now_ms, caller_id);

        self.store
            .record(&self.global_scope(), record.clone(), window)
            .await?;
        if let Some(caller) = caller_id {
            self.store
                .record(&self.caller_scope(caller), record, window)
                .await?;
        }
        Ok(())
    }

    async fn reset_time_for(&self, caller_id: Option<&str>, snapshot: &Snapshot) -> Result<u64> {
        let window = self.config.window;
        let now_ms = snapshot.now_ms;

        let global_oldest = if self.global_saturated(snapshot) {
            self.store
                .oldest(&self.global_scope(), now_ms, window)
                .await?
        } else {
            None
        };

        let caller_oldest = match caller_id {
            Some(caller) if self.caller_saturated(snapshot) => {
                self.store
                    .oldest(&self.caller_scope(caller), now_ms, window)
                    .await?
            }
            _ => None,
        };

        let oldest_blocking = match (global_oldest, caller_oldest) {
            (Some(g), Some(c)) => Some(g.min(c)),
            (g, c) => g.or(c),
        };

        Ok(oldest_blocking
            .map(|oldest| {
                oldest
                    .saturating_add(self.config.window_ms())
                    .saturating_sub(now_ms)
            })
            .unwrap_or(0))
    }

    fn stats_for(&self, snapshot: &Snapshot, reset_time_ms: u64) -> UsageStats {
        let limit = self.config.max_global_requests;
        let caller_limit = snapshot
            .caller
            .and(self.config.max_requests_per_caller);

        UsageStats {
            global_usage: snapshot.global,
            global_limit: limit,
            global_remaining: limit.saturating_sub(snapshot.global),
            caller_usage: snapshot.caller,
            caller_limit,
            caller_remaining: caller_limit
                .zip(snapshot.caller)
                .map(|(cap, used)| cap.saturating_sub(used)),
            reset_time_ms,
        }
    }
}

// Blank caller ids are treated as anonymous
fn normalize(caller_id: Option<&str>) -> Option<&str> {
    caller_id.map(str::trim).filter(|id| !id.is_empty())
}
