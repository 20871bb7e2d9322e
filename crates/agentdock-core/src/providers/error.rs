//! Provider error types

use std::time::Duration;

use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur during provider construction and generation
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Provider tag not handled by any registered strategy
    #[error("unsupported provider: {0}")]
    UnsupportedProvider(String),

    /// No provider config with this id in the store
    #[error("provider config not found: {0}")]
    ConfigNotFound(String),

    /// Config is missing a field its provider needs
    #[error("invalid {provider} config: {message}")]
    InvalidConfig { provider: String, message: String },

    /// Missing API key
    #[error("API key is required for {provider}")]
    MissingApiKey { provider: String },

    /// Raw probe got a non-200 answer
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// API request failed
    #[error("{provider} API error ({status}): {message}")]
    ApiError {
        provider: String,
        status: u16,
        message: String,
    },

    /// Credential discovery or token exchange failed
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Network/HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Server-sent event stream broke
    #[error("stream error: {0}")]
    Stream(String),

    /// Invalid response from provider
    #[error("invalid response from {provider}: {message}")]
    InvalidResponse { provider: String, message: String },

    /// Deadline exceeded
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Request was cancelled
    #[error("request cancelled")]
    Cancelled,

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ProviderError {
    /// Create an API error
    pub fn api_error(provider: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            provider: provider.into(),
            status,
            message: message.into(),
        }
    }

    /// Create a missing API key error
    pub fn missing_api_key(provider: impl Into<String>) -> Self {
        Self::MissingApiKey {
            provider: provider.into(),
        }
    }

    /// Create an invalid config error
    pub fn invalid_config(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create an invalid response error
    pub fn invalid_response(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Whether the error came from a missed deadline
    pub fn is_timeout(&self) -> bool {
        match self {
            ProviderError::Timeout(_) => true,
            ProviderError::Http(e) => e.is_timeout(),
            _ => false,
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;
