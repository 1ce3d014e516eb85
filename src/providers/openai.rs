// src/providers/openai.rs

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::providers::{check_status, http_client, InterpretationProvider, ProviderRequest};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// OpenAI chat completions, tried when Gemini fails.
///
/// Always uses its own configured model; the resolved prompt model names a
/// Gemini model.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    client: Client,
    config: ProviderConfig,
}

impl OpenAiProvider {
    pub fn new(config: ProviderConfig) -> Self {
        debug!(base_url = %config.base_url, model = %config.model, "Creating OpenAI provider");
        Self {
            client: http_client(config.timeout),
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.config.base_url)
    }
}

#[async_trait]
impl InterpretationProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn timeout(&self) -> Duration {
        self.config.timeout
    }

    #[instrument(skip(self, request), fields(model = %self.config.model))]
    async fn generate(&self, request: &ProviderRequest) -> Result<String, ProviderError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(ProviderError::MissingApiKey)?;

        let body = ChatRequest {
            model: &self.config.model,
            messages: [ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let parsed: ChatResponse = check_status(response).await?.json().await?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .ok_or_else(|| {
                ProviderError::MalformedResponse("missing choices[0].message.content".to_string())
            })?;

        if text.trim().is_empty() {
            return Err(ProviderError::EmptyText);
        }
        Ok(text)
    }
}
