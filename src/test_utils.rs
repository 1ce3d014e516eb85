// src/test_utils.rs

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::clock::{Clock, ManualClock};
use crate::config::{RateLimitConfig, TierConfig};
use crate::error::{GatewayError, ProviderError, PromptSourceError, Result, StorageError};
use crate::limiter::{RateLimiter, TierRegistry};
use crate::model::{ContentDomain, GenerationInput};
use crate::prompt::{PromptConfig, PromptSource};
use crate::providers::{InterpretationProvider, ProviderRequest};
use crate::storage::{MemoryWindowStore, RequestRecord, WindowStore};

/// Limiter over a fresh memory store with a clock starting at zero
pub fn manual_limiter(config: RateLimitConfig) -> (RateLimiter<MemoryWindowStore>, ManualClock) {
    let clock = ManualClock::new(0);
    let limiter = RateLimiter::new(
        "test",
        config,
        Arc::new(MemoryWindowStore::new()),
        Arc::new(clock.clone()),
    )
    .unwrap();
    (limiter, clock)
}

/// Registry over a fresh memory store with a clock starting at zero
pub fn manual_registry(config: TierConfig) -> (TierRegistry<MemoryWindowStore>, ManualClock) {
    let clock = ManualClock::new(0);
    let registry = TierRegistry::new(
        config,
        Arc::new(MemoryWindowStore::new()),
        Arc::new(clock.clone()),
    )
    .unwrap();
    (registry, clock)
}

/// Clock that moves forward by `step_ms` every time it is read
#[derive(Debug)]
pub struct SteppingClock {
    now: AtomicU64,
    step_ms: u64,
}

impl SteppingClock {
    pub fn new(start_ms: u64, step_ms: u64) -> Self {
        Self {
            now: AtomicU64::new(start_ms),
            step_ms,
        }
    }
}

impl Clock for SteppingClock {
    fn now_millis(&self) -> u64 {
        self.now.fetch_add(self.step_ms, Ordering::SeqCst)
    }
}

/// A well-formed request for the given domain
pub fn sample_input(domain: ContentDomain) -> GenerationInput {
    match domain {
        ContentDomain::Tarot => GenerationInput {
            question: "Should I take the new job offer?".to_string(),
            card_spread_or_context: "Three-card past/present/future".to_string(),
            structured_card_or_context: "The Tower, Six of Cups (reversed), The Star".to_string(),
            is_guest_user: false,
            domain_id: "tarot".to_string(),
            style_id: None,
        },
        ContentDomain::Dream => GenerationInput {
            question: "What does this dream mean?".to_string(),
            card_spread_or_context: "I was lost in a library whose shelves kept moving".to_string(),
            structured_card_or_context: "library, moving shelves, being lost".to_string(),
            is_guest_user: false,
            domain_id: "dream".to_string(),
            style_id: None,
        },
    }
}

/// Window store whose every operation fails
#[derive(Debug)]
pub struct FailingWindowStore;

fn storage_down() -> GatewayError {
    GatewayError::Storage(StorageError::RedisConnection("simulated outage".to_string()))
}

#[async_trait]
impl WindowStore for FailingWindowStore {
    async fn count(&self, _scope: &str, _now_ms: u64, _window: Duration) -> Result<u64> {
        Err(storage_down())
    }

    async fn record(&self, _scope: &str, _record: RequestRecord, _window: Duration) -> Result<()> {
        Err(storage_down())
    }

    async fn oldest(&self, _scope: &str, _now_ms: u64, _window: Duration) -> Result<Option<u64>> {
        Err(storage_down())
    }

    async fn clear(&self, _scope: &str) -> Result<()> {
        Err(storage_down())
    }
}

/// Prompt source that always errors
#[derive(Debug)]
pub struct FailingPromptSource;

#[async_trait]
impl PromptSource for FailingPromptSource {
    async fn load(
        &self,
        _domain: ContentDomain,
    ) -> std::result::Result<Option<PromptConfig>, PromptSourceError> {
        Err(PromptSourceError::Unavailable(
            "simulated config outage".to_string(),
        ))
    }
}

/// Prompt source that answers only after a delay
#[derive(Debug)]
pub struct SlowPromptSource {
    delay: Duration,
    config: PromptConfig,
}

impl SlowPromptSource {
    pub fn new(delay: Duration, config: PromptConfig) -> Self {
        Self { delay, config }
    }
}

#[async_trait]
impl PromptSource for SlowPromptSource {
    async fn load(
        &self,
        _domain: ContentDomain,
    ) -> std::result::Result<Option<PromptConfig>, PromptSourceError> {
        tokio::time::sleep(self.delay).await;
        Ok(Some(self.config.clone()))
    }
}

/// How a [`ScriptedProvider`] answers
#[derive(Debug, Clone)]
pub enum Script {
    Reply(String),
    Fail(ProviderError),
    /// Never answers; only the chain timeout ends the call
    Hang,
}

/// Provider double that records calls and answers from a script
#[derive(Debug)]
pub struct ScriptedProvider {
    name: String,
    script: Script,
    timeout: Duration,
    calls: AtomicUsize,
    last_request: Mutex<Option<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(name: &str, script: Script) -> Arc<Self> {
        Self::with_timeout(name, script, Duration::from_secs(20))
    }

    pub fn with_timeout(name: &str, script: Script, timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            script,
            timeout,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<ProviderRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl InterpretationProvider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn generate(
        &self,
        request: &ProviderRequest,
    ) -> std::result::Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());

        match &self.script {
            Script::Reply(text) => Ok(text.clone()),
            Script::Fail(error) => Err(error.clone()),
            Script::Hang => {
                futures::future::pending::<()>().await;
                Err(ProviderError::Transport("unreachable".to_string()))
            }
        }
    }
}
