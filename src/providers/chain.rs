// src/providers/chain.rs

use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::config::CircuitBreakerConfig;
use crate::error::ProviderError;
use crate::model::{ContentDomain, GenerationInput, InterpretationSource};
use crate::prompt::{render_prompt, PromptConfig};
use crate::provider_attempt;
use crate::providers::{AttemptOutcome, InterpretationProvider, MockInterpreter, ProviderRequest};
use crate::resilience::CircuitBreaker;

#[derive(Debug)]
struct ChainEntry {
    provider: Arc<dyn InterpretationProvider>,
    breaker: CircuitBreaker,
}

/// What the chain produced, plus why earlier providers were passed over
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainResult {
    /// Never empty
    pub text: String,
    pub source: InterpretationSource,
    pub failures: Vec<(String, ProviderError)>,
}

/// Providers in priority order, tried one at a time.
///
/// The first non-empty answer wins. When every provider fails the
/// [`MockInterpreter`] answers instead, so `run` never fails.
#[derive(Debug)]
pub struct ProviderFallbackChain {
    entries: Vec<ChainEntry>,
    fallback: MockInterpreter,
}

impl ProviderFallbackChain {
    /// `providers` are tried in the given order.
    pub fn new(
        providers: Vec<Arc<dyn InterpretationProvider>>,
        breaker_config: CircuitBreakerConfig,
    ) -> Self {
        let entries = providers
            .into_iter()
            .map(|provider| ChainEntry {
                breaker: CircuitBreaker::new(provider.name(), breaker_config.clone()),
                provider,
            })
            .collect();

        Self {
            entries,
            fallback: MockInterpreter,
        }
    }

    /// Chain with no external providers; always answers from the fallback
    pub fn fallback_only() -> Self {
        Self::new(Vec::new(), CircuitBreakerConfig::default())
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.entries
            .iter()
            .map(|entry| entry.provider.name())
            .collect()
    }

    pub async fn run(
        &self,
        domain: ContentDomain,
        input: &GenerationInput,
        prompt: &PromptConfig,
    ) -> ChainResult {
        let request = ProviderRequest {
            prompt: render_prompt(&prompt.prompt_template, input),
            model: prompt.model.clone(),
        };

        let mut failures = Vec::new();
        for entry in &self.entries {
            let name = entry.provider.name();
            match self.attempt(entry, &request).await {
                AttemptOutcome::Success(text) => {
                    info!(provider = name, "Interpretation generated");
                    return ChainResult {
                        text,
                        source: InterpretationSource::Provider(name.to_string()),
                        failures,
                    };
                }
                AttemptOutcome::Failure(reason) => {
                    warn!(provider = name, error = %reason, "Provider failed, trying next");
                    failures.push((name.to_string(), reason));
                }
            }
        }

        warn!(
            attempted = failures.len(),
            "All providers failed, using built-in interpretation"
        );
        ChainResult {
            text: self.fallback.interpret(domain, input),
            source: InterpretationSource::Fallback,
            failures,
        }
    }

    async fn attempt(&self, entry: &ChainEntry, request: &ProviderRequest) -> AttemptOutcome {
        if !entry.breaker.allow_request().await {
            return AttemptOutcome::Failure(ProviderError::CircuitOpen);
        }

        let timeout = entry.provider.timeout();
        let started = Instant::now();
        let result = match tokio::time::timeout(timeout, entry.provider.generate(request)).await {
            Ok(Ok(text)) if text.trim().is_empty() => Err(ProviderError::EmptyText),
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(timeout)),
        };
        provider_attempt!(
            entry.provider.name(),
            result,
            started.elapsed().as_millis() as u64
        );

        match result {
            Ok(text) => {
                entry.breaker.record_success().await;
                AttemptOutcome::Success(text)
            }
            Err(reason) => {
                entry.breaker.record_failure().await;
                AttemptOutcome::Failure(reason)
            }
        }
    }
}
