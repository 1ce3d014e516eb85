// src/config/mod.rs

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{GatewayError, Result};

/// Thresholds for one rate-limit tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Length of the trailing window
    #[serde(with = "duration_serde")]
    pub window: Duration,

    /// Maximum requests admitted across all callers within the window
    pub max_global_requests: u64,

    /// Maximum requests admitted per caller within the window
    #[serde(default)]
    pub max_requests_per_caller: Option<u64>,
}

impl RateLimitConfig {
    /// 100 requests/hour globally, 10/hour per caller
    pub fn default_tier() -> Self {
        Self {
            window: Duration::from_secs(3600),
            max_global_requests: 100,
            max_requests_per_caller: Some(10),
        }
    }

    /// 500 requests/hour globally, 50/hour per caller
    pub fn premium_tier() -> Self {
        Self {
            window: Duration::from_secs(3600),
            max_global_requests: 500,
            max_requests_per_caller: Some(50),
        }
    }

    pub fn window_ms(&self) -> u64 {
        u64::try_from(self.window.as_millis()).unwrap_or(u64::MAX)
    }

    pub fn validate(&self) -> Result<()> {
        if self.window.is_zero() {
            return Err(GatewayError::Config(
                "rate limit window must be greater than zero".to_string(),
            ));
        }
        if self.max_global_requests == 0 {
            return Err(GatewayError::Config(
                "max_global_requests must be greater than zero".to_string(),
            ));
        }
        if self.max_requests_per_caller == Some(0) {
            return Err(GatewayError::Config(
                "max_requests_per_caller must be greater than zero when set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Per-tier rate limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierConfig {
    #[serde(default = "RateLimitConfig::default_tier")]
    pub default: RateLimitConfig,

    #[serde(default = "RateLimitConfig::premium_tier")]
    pub premium: RateLimitConfig,
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            default: RateLimitConfig::default_tier(),
            premium: RateLimitConfig::premium_tier(),
        }
    }
}

/// Connection settings for one AI provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Scheme and host of the vendor API, without a trailing slash
    pub base_url: String,

    /// Absent key means the provider is treated as permanently down
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Model used when the caller does not supply one
    pub model: String,

    /// Upper bound on a single call, including reading the body
    #[serde(default = "default_provider_timeout", with = "duration_serde")]
    pub timeout: Duration,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl ProviderConfig {
    pub fn gemini_default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            timeout: default_provider_timeout(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }

    pub fn openai_default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            timeout: default_provider_timeout(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Model used by the built-in prompt defaults
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

fn default_provider_timeout() -> Duration {
    Duration::from_secs(20)
}

fn default_temperature() -> f32 {
    0.8
}

fn default_max_tokens() -> u32 {
    1024
}

/// Configuration for the per-provider circuit breaker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Number of failures before opening the circuit
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: usize,

    /// Duration to keep the circuit open before transitioning to half-open
    #[serde(default = "default_reset_timeout", with = "duration_serde")]
    pub reset_timeout: Duration,

    /// Number of consecutive successes in half-open state to close the circuit
    #[serde(default = "default_success_threshold")]
    pub success_threshold: usize,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            reset_timeout: default_reset_timeout(),
            success_threshold: default_success_threshold(),
        }
    }
}

fn default_failure_threshold() -> usize {
    5
}

fn default_reset_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_success_threshold() -> usize {
    1
}

/// Configuration for Redis-backed window storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL
    pub url: String,

    /// Key prefix to use for all window keys
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Connection timeout
    #[serde(default = "default_conn_timeout", with = "duration_serde")]
    pub connection_timeout: Duration,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: default_key_prefix(),
            connection_timeout: default_conn_timeout(),
        }
    }
}

fn default_key_prefix() -> String {
    "oracle:ratelimit".to_string()
}

fn default_conn_timeout() -> Duration {
    Duration::from_secs(2)
}

/// Everything needed to assemble an `InterpretationService`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub tiers: TierConfig,

    #[serde(default = "ProviderConfig::gemini_default")]
    pub gemini: ProviderConfig,

    #[serde(default = "ProviderConfig::openai_default")]
    pub openai: ProviderConfig,

    /// JSON file holding per-domain prompt templates
    #[serde(default)]
    pub prompt_file: Option<PathBuf>,

    /// Upper bound on a prompt config lookup
    #[serde(default = "default_prompt_timeout", with = "duration_serde")]
    pub prompt_timeout: Duration,

    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,

    /// When set, rate-limit windows live in Redis instead of process memory
    #[serde(default)]
    pub redis: Option<RedisConfig>,
}

fn default_prompt_timeout() -> Duration {
    Duration::from_secs(5)
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            tiers: TierConfig::default(),
            gemini: ProviderConfig::gemini_default(),
            openai: ProviderConfig::openai_default(),
            prompt_file: None,
            prompt_timeout: default_prompt_timeout(),
            circuit_breaker: CircuitBreakerConfig::default(),
            redis: None,
        }
    }
}

impl GatewayConfig {
    /// Builds the configuration from process environment variables.
    ///
    /// API keys are read once here; a missing key disables that provider.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        config.gemini.api_key = non_empty_var("GEMINI_API_KEY");
        config.openai.api_key = non_empty_var("OPENAI_API_KEY");

        if let Some(url) = non_empty_var("GEMINI_BASE_URL") {
            config.gemini = config.gemini.with_base_url(url);
        }
        if let Some(url) = non_empty_var("OPENAI_BASE_URL") {
            config.openai = config.openai.with_base_url(url);
        }
        if let Some(model) = non_empty_var("OPENAI_MODEL") {
            config.openai.model = model;
        }
        if let Some(raw) = non_empty_var("ORACLE_PROVIDER_TIMEOUT_MS") {
            let millis = raw.parse::<u64>().map_err(|e| {
                GatewayError::Config(format!("ORACLE_PROVIDER_TIMEOUT_MS is not a number: {}", e))
            })?;
            let timeout = Duration::from_millis(millis);
            config.gemini.timeout = timeout;
            config.openai.timeout = timeout;
        }

        config.prompt_file = non_empty_var("ORACLE_PROMPT_FILE").map(PathBuf::from);
        config.redis = non_empty_var("ORACLE_REDIS_URL").map(|url| RedisConfig {
            url,
            key_prefix: default_key_prefix(),
            connection_timeout: default_conn_timeout(),
        });

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.tiers.default.validate()?;
        self.tiers.premium.validate()?;
        for provider in [&self.gemini, &self.openai] {
            if provider.timeout.is_zero() {
                return Err(GatewayError::Config(format!(
                    "provider timeout for {} must be greater than zero",
                    provider.base_url
                )));
            }
        }
        if self.prompt_timeout.is_zero() {
            return Err(GatewayError::Config(
                "prompt_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// Helper module to serialize/deserialize Duration with serde
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
