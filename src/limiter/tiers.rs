//! Named rate-limit tiers.
//!
//! Callers are classified by a premium flag. Each tier owns its own
//! [`RateLimiter`] so usage in one tier never counts against the other.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info};

use crate::clock::{Clock, SystemClock};
use crate::config::TierConfig;
use crate::error::Result;
use crate::limiter::{RateLimiter, UsageStats};
use crate::storage::{MemoryWindowStore, WindowStore};

/// Rate-limit profile a caller is classified into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Default,
    Premium,
}

impl Tier {
    pub fn for_caller(is_premium: bool) -> Self {
        if is_premium {
            Tier::Premium
        } else {
            Tier::Default
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Tier::Default => "default",
            Tier::Premium => "premium",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of an admission check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionDecision {
    pub allowed: bool,
    pub tier: Tier,
    /// Set only on denial
    pub reset_time_ms: Option<u64>,
    /// Human-readable wait message, set only on denial
    pub message: Option<String>,
    /// Usage after the decision, when the store could be read
    pub stats: Option<UsageStats>,
}

impl AdmissionDecision {
    fn allowed(tier: Tier, stats: Option<UsageStats>) -> Self {
        Self {
            allowed: true,
            tier,
            reset_time_ms: None,
            message: None,
            stats,
        }
    }

    fn denied(tier: Tier, reset_time_ms: u64, stats: Option<UsageStats>) -> Self {
        Self {
            allowed: false,
            tier,
            reset_time_ms: Some(reset_time_ms),
            message: Some(wait_message(reset_time_ms)),
            stats,
        }
    }
}

/// Wait message with the minutes until reset rounded up.
pub fn wait_message(reset_time_ms: u64) -> String {
    match reset_time_ms.div_ceil(60_000) {
        0 => "Too many interpretation requests. Please try again shortly.".to_string(),
        1 => "Too many interpretation requests. Please try again in 1 minute.".to_string(),
        minutes => format!(
            "Too many interpretation requests. Please try again in {} minutes.",
            minutes
        ),
    }
}

/// Owns one limiter per tier for the life of the process.
///
/// Construct once at startup and share it (usually behind an `Arc`).
#[derive(Debug)]
pub struct TierRegistry<S: WindowStore> {
    default: RateLimiter<S>,
    premium: RateLimiter<S>,
}

impl TierRegistry<MemoryWindowStore> {
    /// Registry backed by process memory and the system clock
    pub fn in_memory(config: TierConfig) -> Result<Self> {
        Self::new(
            config,
            Arc::new(MemoryWindowStore::new()),
            Arc::new(SystemClock),
        )
    }
}

impl<S: WindowStore> TierRegistry<S> {
    /// Both tiers share one store; their scopes are namespaced by tier name.
    pub fn new(config: TierConfig, store: Arc<S>, clock: Arc<dyn Clock>) -> Result<Self> {
        let default = RateLimiter::new(
            Tier::Default.name(),
            config.default,
            Arc::clone(&store),
            Arc::clone(&clock),
        )?;
        let premium = RateLimiter::new(Tier::Premium.name(), config.premium, store, clock)?;

        info!(
            default_global = default.config().max_global_requests,
            default_per_caller = ?default.config().max_requests_per_caller,
            premium_global = premium.config().max_global_requests,
            premium_per_caller = ?premium.config().max_requests_per_caller,
            "Rate limit tiers configured"
        );

        Ok(Self { default, premium })
    }

    pub fn limiter(&self, tier: Tier) -> &RateLimiter<S> {
        match tier {
            Tier::Default => &self.default,
            Tier::Premium => &self.premium,
        }
    }

    /// Checks the caller's tier without recording.
    ///
    /// A storage failure admits the request.
    pub async fn check_rate_limit(
        &self,
        caller_id: Option<&str>,
        is_premium: bool,
    ) -> AdmissionDecision {
        let tier = Tier::for_caller(is_premium);
        let limiter = self.limiter(tier);

        match limiter.check(caller_id).await {
            Ok(status) if status.allowed => AdmissionDecision::allowed(tier, Some(status.stats)),
            Ok(status) => AdmissionDecision::denied(tier, status.reset_time_ms, Some(status.stats)),
            Err(e) => {
                error!(tier = %tier, error = %e, "Rate limit check failed, admitting request");
                AdmissionDecision::allowed(tier, None)
            }
        }
    }

    /// Records one AI request against the caller's tier.
    pub async fn record_ai_request(&self, caller_id: Option<&str>, is_premium: bool) {
        let tier = Tier::for_caller(is_premium);
        if let Err(e) = self.limiter(tier).record_request(caller_id).await {
            error!(tier = %tier, error = %e, "Failed to record AI request");
        }
    }

    /// Checks and records in one step; what the service uses.
    pub async fn admit(&self, caller_id: Option<&str>, is_premium: bool) -> AdmissionDecision {
        let tier = Tier::for_caller(is_premium);

        match self.limiter(tier).check_and_record(caller_id).await {
            Ok(status) if status.allowed => AdmissionDecision::allowed(tier, Some(status.stats)),
            Ok(status) => AdmissionDecision::denied(tier, status.reset_time_ms, Some(status.stats)),
            Err(e) => {
                error!(tier = %tier, error = %e, "Rate limit admission failed, admitting request");
                AdmissionDecision::allowed(tier, None)
            }
        }
    }

    pub async fn stats(&self, caller_id: Option<&str>, is_premium: bool) -> Result<UsageStats> {
        self.limiter(Tier::for_caller(is_premium))
            .stats(caller_id)
            .await
    }
}
