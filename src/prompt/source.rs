// src/prompt/source.rs

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::PromptSourceError;
use crate::model::ContentDomain;
use crate::prompt::{PromptConfig, PromptSource};

/// Prompt configs in a JSON file keyed by domain id:
///
/// ```json
/// { "tarot": { "model": "gemini-1.5-pro", "prompt_template": "..." } }
/// ```
///
/// The file is re-read on every lookup so edits apply without a restart.
#[derive(Debug, Clone)]
pub struct FilePromptSource {
    path: PathBuf,
}

impl FilePromptSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl PromptSource for FilePromptSource {
    async fn load(
        &self,
        domain: ContentDomain,
    ) -> Result<Option<PromptConfig>, PromptSourceError> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        let mut entries: HashMap<String, PromptConfig> = serde_json::from_str(&raw)?;
        Ok(entries.remove(domain.as_str()))
    }
}

/// Fixed prompt configs held in memory
#[derive(Debug, Clone, Default)]
pub struct StaticPromptSource {
    entries: HashMap<ContentDomain, PromptConfig>,
}

impl StaticPromptSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, domain: ContentDomain, config: PromptConfig) -> Self {
        self.entries.insert(domain, config);
        self
    }
}

#[async_trait]
impl PromptSource for StaticPromptSource {
    async fn load(
        &self,
        domain: ContentDomain,
    ) -> Result<Option<PromptConfig>, PromptSourceError> {
        Ok(self.entries.get(&domain).cloned())
    }
}
