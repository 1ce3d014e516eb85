// library entry
pub mod clock;
pub mod config;
pub mod error;
pub mod limiter;
pub mod logging;
pub mod model;
pub mod prompt;
pub mod providers;
pub mod resilience;
pub mod service;
pub mod storage;

#[cfg(test)]
mod test_utils;
#[cfg(test)]
mod tests;

// Re-export key components for convenience
pub use config::{GatewayConfig, RateLimitConfig, TierConfig};
pub use error::{GatewayError, ProviderError, Result};
pub use limiter::{AdmissionDecision, RateLimiter, Tier, TierRegistry, UsageStats};
pub use logging::init as init_logging;
pub use model::{
    ContentDomain, GenerateOutcome, GenerationInput, GenerationOutput, InterpretationSource,
    RateLimitRejection,
};
pub use service::InterpretationService;
pub use storage::{BackingStore, MemoryWindowStore, WindowStore};
