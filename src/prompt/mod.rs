// src/prompt/mod.rs
//! Prompt templates per content domain.
//!
//! The resolver never fails: when the configured [`PromptSource`] errors,
//! times out or has nothing for a domain, the built-in template and model are
//! used instead and a warning is logged.

pub mod source;
pub mod templates;

#[cfg(test)]
mod tests;

pub use source::{FilePromptSource, StaticPromptSource};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::PromptSourceError;
use crate::model::{ContentDomain, GenerationInput};

/// Template and target model for one domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptConfig {
    pub model: String,
    pub prompt_template: String,
}

impl PromptConfig {
    fn is_usable(&self) -> bool {
        !self.model.trim().is_empty() && !self.prompt_template.trim().is_empty()
    }
}

/// Where domain prompt configs are stored
#[async_trait]
pub trait PromptSource: Send + Sync + Debug {
    /// `Ok(None)` means the store has no entry for the domain.
    async fn load(
        &self,
        domain: ContentDomain,
    ) -> std::result::Result<Option<PromptConfig>, PromptSourceError>;
}

/// Resolves the prompt config for a domain, degrading to built-in defaults.
#[derive(Debug, Clone)]
pub struct PromptConfigResolver {
    source: Option<Arc<dyn PromptSource>>,
    timeout: Duration,
}

impl PromptConfigResolver {
    pub fn new(source: Arc<dyn PromptSource>, timeout: Duration) -> Self {
        Self {
            source: Some(source),
            timeout,
        }
    }

    /// Resolver with no store; always yields the built-in defaults
    pub fn builtin() -> Self {
        Self {
            source: None,
            timeout: Duration::ZERO,
        }
    }

    pub async fn resolve(&self, domain: ContentDomain) -> PromptConfig {
        let Some(source) = &self.source else {
            debug!(domain = %domain, "No prompt source configured, using built-in prompt");
            return templates::default_prompt_config(domain);
        };

        let loaded = match tokio::time::timeout(self.timeout, source.load(domain)).await {
            Ok(result) => result,
            Err(_) => Err(PromptSourceError::Timeout(self.timeout)),
        };

        match loaded {
            Ok(Some(config)) if config.is_usable() => {
                debug!(domain = %domain, model = %config.model, "Loaded prompt config");
                config
            }
            Ok(Some(_)) => {
                warn!(domain = %domain, "Stored prompt config is blank, using built-in prompt");
                templates::default_prompt_config(domain)
            }
            Ok(None) => {
                warn!(domain = %domain, "No stored prompt config, using built-in prompt");
                templates::default_prompt_config(domain)
            }
            Err(e) => {
                warn!(domain = %domain, error = %e, "Prompt config lookup failed, using built-in prompt");
                templates::default_prompt_config(domain)
            }
        }
    }
}

/// Fills `{question}`, `{spread}`, `{cards}`, `{style}` and `{audience}`.
///
/// Substitution is single-pass, so placeholder-like text inside the caller's
/// values is never expanded. Unknown placeholders are kept verbatim.
pub fn render_prompt(template: &str, input: &GenerationInput) -> String {
    let cards = input.structured_card_or_context.trim();
    let cards = if cards.is_empty() { "(none given)" } else { cards };
    let audience = if input.is_guest_user { "guest" } else { "member" };

    let value_of = |name: &str| match name {
        "question" => Some(input.question.trim()),
        "spread" => Some(input.card_spread_or_context.trim()),
        "cards" => Some(cards),
        "style" => Some(input.style().unwrap_or("balanced")),
        "audience" => Some(audience),
        _ => None,
    };

    let mut rendered = String::with_capacity(template.len() + 256);
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        rendered.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        match after.find('}') {
            Some(close) => {
                let name = &after[..close];
                match value_of(name) {
                    Some(value) => rendered.push_str(value),
                    None => {
                        rendered.push('{');
                        rendered.push_str(name);
                        rendered.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                rendered.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    rendered.push_str(rest);
    rendered
}
