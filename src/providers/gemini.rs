// src/providers/gemini.rs

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::providers::{check_status, http_client, InterpretationProvider, ProviderRequest};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Google Gemini `generateContent`, the preferred provider.
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    client: Client,
    config: ProviderConfig,
}

impl GeminiProvider {
    pub fn new(config: ProviderConfig) -> Self {
        debug!(base_url = %config.base_url, "Creating Gemini provider");
        Self {
            client: http_client(config.timeout),
            config,
        }
    }

    // The model is pushed as one path segment so '/' or '?' in it get escaped
    fn endpoint(&self, model: &str) -> Result<Url, ProviderError> {
        let mut url = Url::parse(&self.config.base_url)
            .map_err(|e| ProviderError::Transport(format!("invalid base url: {}", e)))?;
        let method = format!("{}:generateContent", model);
        url.path_segments_mut()
            .map_err(|_| ProviderError::Transport("base url cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(["v1beta", "models", method.as_str()]);
        Ok(url)
    }
}

#[async_trait]
impl InterpretationProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn timeout(&self) -> Duration {
        self.config.timeout
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn generate(&self, request: &ProviderRequest) -> Result<String, ProviderError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(ProviderError::MissingApiKey)?;

        // The resolved prompt config picks the model; fall back to ours if blank
        let model = match request.model.trim() {
            "" => self.config.model.as_str(),
            model => model,
        };

        let body = GenerateContentRequest {
            contents: [Content {
                parts: [Part {
                    text: &request.prompt,
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
                max_output_tokens: self.config.max_tokens,
            },
        };

        let response = self
            .client
            .post(self.endpoint(model)?)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        let parsed: GenerateContentResponse = check_status(response).await?.json().await?;

        let candidate = parsed
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::MalformedResponse("no candidates".to_string()))?;

        let text: String = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ProviderError::EmptyText);
        }
        Ok(text)
    }
}
