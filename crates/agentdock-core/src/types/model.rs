//! Generation provider configuration types

use serde::{Deserialize, Serialize};

/// Configuration record for one generation provider
///
/// The `provider` tag is resolved to a [`ProviderKind`] at build time; the
/// record itself is never mutated by the factory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// Unique identifier for this provider configuration
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Provider tag (gemini, vertexai, openai, ...)
    pub provider: String,
    /// Custom API base URL
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub base_url: String,
    /// API key (gemini and openai)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_key: String,
    /// Model identifier as used by the provider's API
    #[serde(default)]
    pub model_name: String,
    /// Use the Responses API instead of Chat Completions for the openai tag
    #[serde(default)]
    pub use_responses: bool,
    /// Google Cloud project (vertex only)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub project: String,
    /// Google Cloud location (vertex only)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub location: String,
    /// Credential JSON blob (vertex only); ambient discovery when empty
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub credentials_json: String,
}

impl ProviderConfig {
    /// Create a new provider configuration
    pub fn new(
        id: impl Into<String>,
        provider: impl Into<String>,
        model_name: impl Into<String>,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            provider: provider.into(),
            model_name: model_name.into(),
            ..Default::default()
        }
    }

    /// Set the API key
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = key.into();
        self
    }

    /// Set the API base URL
    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        self.base_url = base.into();
        self
    }

    /// Select the Responses API for the openai tag
    pub fn with_responses(mut self, use_responses: bool) -> Self {
        self.use_responses = use_responses;
        self
    }

    /// Set the Google Cloud project and location
    pub fn with_project(mut self, project: impl Into<String>, location: impl Into<String>) -> Self {
        self.project = project.into();
        self.location = location.into();
        self
    }

    /// Set an explicit credential blob
    pub fn with_credentials_json(mut self, json: impl Into<String>) -> Self {
        self.credentials_json = json.into();
        self
    }
}

/// Construction path selected for a provider config
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    Gemini,
    Vertex,
    OpenAiChat,
    OpenAiResponses,
}

impl ProviderKind {
    /// Tags accepted in `ProviderConfig::provider`
    pub const TAGS: &'static [&'static str] = &[
        "gemini",
        "vertexai",
        "vertex",
        "openai",
        "openai-chat",
        "openai-responses",
    ];

    /// Resolve a config's provider tag, case-insensitively
    ///
    /// The plain `openai` tag splits on `use_responses`.
    pub fn resolve(config: &ProviderConfig) -> Option<Self> {
        match config.provider.trim().to_ascii_lowercase().as_str() {
            "gemini" => Some(ProviderKind::Gemini),
            "vertexai" | "vertex" => Some(ProviderKind::Vertex),
            "openai" if config.use_responses => Some(ProviderKind::OpenAiResponses),
            "openai" | "openai-chat" => Some(ProviderKind::OpenAiChat),
            "openai-responses" => Some(ProviderKind::OpenAiResponses),
            _ => None,
        }
    }

    /// Whether this kind speaks an OpenAI-compatible protocol
    pub fn is_openai(&self) -> bool {
        matches!(self, ProviderKind::OpenAiChat | ProviderKind::OpenAiResponses)
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::Gemini => write!(f, "gemini"),
            ProviderKind::Vertex => write!(f, "vertex"),
            ProviderKind::OpenAiChat => write!(f, "openai-chat"),
            ProviderKind::OpenAiResponses => write!(f, "openai-responses"),
        }
    }
}
