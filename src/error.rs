// for error definitions
use std::time::Duration;

use redis;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    /// Returned when a generation request is missing required fields
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Errors related to the rate-limit storage backend
    #[error("Storage error: {0}")]
    Storage(StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unexpected or internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Storage-specific errors
#[derive(Error, Debug)]
pub enum StorageError {
    /// Redis connection errors
    #[error("Redis connection error: {0}")]
    RedisConnection(String),

    /// Redis command errors
    #[error("Redis command error: {0}")]
    RedisCommand(String),

    /// A counter map lock was poisoned by a panicking writer
    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),

    /// Data serialization/deserialization errors
    #[error("Data serialization error: {0}")]
    Serialization(String),
}

/// Why a single provider attempt produced no usable text.
///
/// These never reach callers of the service; the fallback chain logs them and
/// moves on to the next provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("no API key configured")]
    MissingApiKey,

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("response contained no text")]
    EmptyText,

    #[error("circuit open")]
    CircuitOpen,
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        // URLs may carry credentials; keep them out of messages that get logged
        let err = err.without_url();
        if err.is_decode() {
            ProviderError::MalformedResponse(err.to_string())
        } else {
            ProviderError::Transport(err.to_string())
        }
    }
}

/// Failures while loading a prompt configuration. The resolver recovers from
/// all of these with the built-in defaults.
#[derive(Error, Debug)]
pub enum PromptSourceError {
    #[error("failed to read prompt config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse prompt config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("prompt config lookup timed out after {0:?}")]
    Timeout(Duration),

    #[error("prompt config unavailable: {0}")]
    Unavailable(String),
}

// Implement conversions from redis::RedisError to StorageError
impl From<redis::RedisError> for GatewayError {
    fn from(err: redis::RedisError) -> Self {
        match err.kind() {
            redis::ErrorKind::IoError | redis::ErrorKind::ClientError => {
                GatewayError::Storage(StorageError::RedisConnection(err.to_string()))
            }
            _ => GatewayError::Storage(StorageError::RedisCommand(err.to_string())),
        }
    }
}

// implement conversions from serde_json::Error to GatewayError
impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Storage(StorageError::Serialization(err.to_string()))
    }
}

// define a Result type alias for convenience
pub type Result<T> = std::result::Result<T, GatewayError>;
