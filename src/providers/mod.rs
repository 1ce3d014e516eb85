// src/providers/mod.rs
//! AI providers and the ordered fallback chain over them.

pub mod chain;
pub mod gemini;
pub mod mock;
pub mod openai;

#[cfg(test)]
mod tests;

pub use chain::{ChainResult, ProviderFallbackChain};
pub use gemini::GeminiProvider;
pub use mock::MockInterpreter;
pub use openai::OpenAiProvider;

use async_trait::async_trait;
use std::fmt::Debug;
use std::time::Duration;

use crate::error::ProviderError;

/// Fully rendered prompt plus the model it targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderRequest {
    pub prompt: String,
    pub model: String,
}

/// Outcome of one attempt against one provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success(String),
    Failure(ProviderError),
}

/// An external text-generation vendor
#[async_trait]
pub trait InterpretationProvider: Send + Sync + Debug {
    /// Stable name used in logs and in the output's source
    fn name(&self) -> &str;

    /// Upper bound the chain puts on a single call
    fn timeout(&self) -> Duration {
        Duration::from_secs(20)
    }

    async fn generate(&self, request: &ProviderRequest) -> Result<String, ProviderError>;
}

// Builds the shared HTTP client; the per-request timeout is applied by the chain too
pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Falling back to default HTTP client");
            reqwest::Client::new()
        })
}

// Turns a non-2xx response into a status error, keeping a bounded slice of the body
pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::Status {
        status: status.as_u16(),
        body: body.chars().take(512).collect(),
    })
}
