// src/service.rs
//! The interpretation façade.
//!
//! `generate` validates the input, asks the [`TierRegistry`] for admission,
//! and on approval resolves the prompt and runs the provider chain. Quota is
//! consumed at admission, whatever happens downstream.

use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::clock::SystemClock;
use crate::config::GatewayConfig;
use crate::error::Result;
use crate::limiter::tiers::wait_message;
use crate::limiter::{Tier, TierRegistry};
use crate::model::{GenerateOutcome, GenerationInput, GenerationOutput, RateLimitRejection};
use crate::prompt::{FilePromptSource, PromptConfigResolver};
use crate::providers::{
    GeminiProvider, InterpretationProvider, OpenAiProvider, ProviderFallbackChain,
};
use crate::storage::{BackingStore, WindowStore};

#[derive(Debug)]
pub struct InterpretationService<S: WindowStore> {
    registry: Arc<TierRegistry<S>>,
    resolver: PromptConfigResolver,
    chain: ProviderFallbackChain,
}

impl InterpretationService<BackingStore> {
    /// Wires the service from configuration.
    ///
    /// Providers without an API key are left out of the chain.
    pub async fn from_config(config: GatewayConfig) -> Result<Self> {
        config.validate()?;

        let store = BackingStore::connect(config.redis.as_ref()).await?;
        let registry = TierRegistry::new(config.tiers, Arc::new(store), Arc::new(SystemClock))?;

        let resolver = match config.prompt_file {
            Some(path) => {
                info!(path = %path.display(), "Loading prompt configs from file");
                PromptConfigResolver::new(
                    Arc::new(FilePromptSource::new(path)),
                    config.prompt_timeout,
                )
            }
            None => PromptConfigResolver::builtin(),
        };

        let mut providers: Vec<Arc<dyn InterpretationProvider>> = Vec::new();
        if config.gemini.api_key.is_some() {
            providers.push(Arc::new(GeminiProvider::new(config.gemini)));
        } else {
            warn!("GEMINI_API_KEY not set, skipping Gemini provider");
        }
        if config.openai.api_key.is_some() {
            providers.push(Arc::new(OpenAiProvider::new(config.openai)));
        } else {
            warn!("OPENAI_API_KEY not set, skipping OpenAI provider");
        }

        let chain = ProviderFallbackChain::new(providers, config.circuit_breaker);
        info!(providers = ?chain.provider_names(), "Interpretation service ready");

        Ok(Self::new(Arc::new(registry), resolver, chain))
    }
}

impl<S: WindowStore> InterpretationService<S> {
    pub fn new(
        registry: Arc<TierRegistry<S>>,
        resolver: PromptConfigResolver,
        chain: ProviderFallbackChain,
    ) -> Self {
        Self {
            registry,
            resolver,
            chain,
        }
    }

    pub fn registry(&self) -> &Arc<TierRegistry<S>> {
        &self.registry
    }

    pub fn chain(&self) -> &ProviderFallbackChain {
        &self.chain
    }

    /// Produces an interpretation or a rate-limit rejection.
    ///
    /// Only invalid input is an error; provider and config failures degrade
    /// to fallbacks, and storage failures admit the request.
    pub async fn generate(
        &self,
        input: &GenerationInput,
        caller_id: Option<&str>,
        is_premium: bool,
    ) -> Result<GenerateOutcome> {
        let domain = input.validate()?;
        let tier = Tier::for_caller(is_premium);

        let span = info_span!(
            "generate",
            request_id = %Uuid::new_v4(),
            caller = caller_id.unwrap_or("anonymous"),
            tier = %tier,
            domain = %domain,
        );

        async move {
            let decision = self.registry.admit(caller_id, is_premium).await;
            if !decision.allowed {
                let reset_time_ms = decision.reset_time_ms.unwrap_or(0);
                info!(reset_time_ms, "Request rejected by rate limiter");
                return Ok(GenerateOutcome::Rejected(RateLimitRejection {
                    tier: decision.tier,
                    reset_time_ms,
                    message: decision
                        .message
                        .unwrap_or_else(|| wait_message(reset_time_ms)),
                    stats: decision.stats,
                }));
            }

            let prompt = self.resolver.resolve(domain).await;
            let result = self.chain.run(domain, input, &prompt).await;

            info!(source = %result.source, failures = result.failures.len(), "Interpretation ready");
            Ok(GenerateOutcome::Generated(GenerationOutput {
                interpretation_text: result.text,
                source: result.source,
            }))
        }
        .instrument(span)
        .await
    }
}
