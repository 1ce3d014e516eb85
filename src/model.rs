// src/model.rs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{GatewayError, Result};
use crate::limiter::{Tier, UsageStats};

/// Longest question accepted, in characters
pub const MAX_QUESTION_CHARS: usize = 2_000;

/// Kind of reading being asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentDomain {
    Tarot,
    Dream,
}

impl ContentDomain {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentDomain::Tarot => "tarot",
            ContentDomain::Dream => "dream",
        }
    }
}

impl fmt::Display for ContentDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentDomain {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tarot" => Ok(ContentDomain::Tarot),
            "dream" => Ok(ContentDomain::Dream),
            other => Err(GatewayError::InvalidInput(format!(
                "unknown domain_id '{}'",
                other
            ))),
        }
    }
}

/// What the caller wants interpreted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationInput {
    pub question: String,

    /// Spread name for tarot, dream narrative for dreams
    pub card_spread_or_context: String,

    /// Drawn cards or extracted dream symbols, free-form; may be empty
    #[serde(default)]
    pub structured_card_or_context: String,

    #[serde(default)]
    pub is_guest_user: bool,

    pub domain_id: String,

    #[serde(default)]
    pub style_id: Option<String>,
}

impl GenerationInput {
    /// Checks required fields and returns the parsed domain.
    pub fn validate(&self) -> Result<ContentDomain> {
        if self.question.trim().is_empty() {
            return Err(GatewayError::InvalidInput(
                "question must not be empty".to_string(),
            ));
        }
        if self.question.chars().count() > MAX_QUESTION_CHARS {
            return Err(GatewayError::InvalidInput(format!(
                "question must be at most {} characters",
                MAX_QUESTION_CHARS
            )));
        }
        if self.card_spread_or_context.trim().is_empty() {
            return Err(GatewayError::InvalidInput(
                "card_spread_or_context must not be empty".to_string(),
            ));
        }
        if self.domain_id.trim().is_empty() {
            return Err(GatewayError::InvalidInput(
                "domain_id must not be empty".to_string(),
            ));
        }
        self.domain_id.parse()
    }

    /// Style id with blanks treated as absent
    pub fn style(&self) -> Option<&str> {
        self.style_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Which stage of the chain produced the text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "lowercase")]
pub enum InterpretationSource {
    Provider(String),
    Fallback,
}

impl fmt::Display for InterpretationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterpretationSource::Provider(name) => write!(f, "provider:{}", name),
            InterpretationSource::Fallback => f.write_str("fallback"),
        }
    }
}

/// The interpretation handed back to the caller; text is never empty
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationOutput {
    pub interpretation_text: String,
    pub source: InterpretationSource,
}

/// Returned instead of an interpretation when the caller is over its limit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimitRejection {
    pub tier: Tier,
    pub reset_time_ms: u64,
    pub message: String,
    pub stats: Option<UsageStats>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GenerateOutcome {
    Generated(GenerationOutput),
    Rejected(RateLimitRejection),
}

impl GenerateOutcome {
    pub fn is_generated(&self) -> bool {
        matches!(self, GenerateOutcome::Generated(_))
    }

    pub fn output(&self) -> Option<&GenerationOutput> {
        match self {
            GenerateOutcome::Generated(output) => Some(output),
            GenerateOutcome::Rejected(_) => None,
        }
    }

    pub fn rejection(&self) -> Option<&RateLimitRejection> {
        match self {
            GenerateOutcome::Generated(_) => None,
            GenerateOutcome::Rejected(rejection) => Some(rejection),
        }
    }
}
