//! Generation client trait definition

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use tokio_util::sync::CancellationToken;

use crate::types::{ChatMessage, ProviderKind, StreamChunk, Tool, ToolChoice};
use super::error::ProviderResult;

/// Options for generation requests
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Temperature for response generation (0.0 - 2.0)
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
    /// Stop sequences
    pub stop: Option<Vec<String>>,
    /// Tools available for the model to use
    pub tools: Option<Vec<Tool>>,
    /// Tool choice behavior
    pub tool_choice: Option<ToolChoice>,
}

impl GenerateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    pub fn with_stop(mut self, stop: Vec<String>) -> Self {
        self.stop = Some(stop);
        self
    }

    pub fn with_tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn with_tool_choice(mut self, choice: ToolChoice) -> Self {
        self.tool_choice = Some(choice);
        self
    }

    /// Tools, if any were supplied
    pub(crate) fn tool_list(&self) -> &[Tool] {
        self.tools.as_deref().unwrap_or(&[])
    }
}

/// One generation call
#[derive(Debug, Clone, Default)]
pub struct GenerateRequest {
    pub messages: Vec<ChatMessage>,
    pub options: GenerateOptions,
}

impl GenerateRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            options: GenerateOptions::default(),
        }
    }

    pub fn with_options(mut self, options: GenerateOptions) -> Self {
        self.options = options;
        self
    }
}

/// Type alias for the generated output
pub type StreamResponse = Pin<Box<dyn Stream<Item = ProviderResult<StreamChunk>> + Send>>;

/// Uniform "generate content" client produced by the factory
///
/// With `stream = false` the whole answer arrives before the returned stream
/// yields; with `stream = true` units are yielded as the server sends them.
/// Cancelling `cancel` ends the stream early.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Construction path this client came from
    fn kind(&self) -> ProviderKind;

    /// Model identifier sent to the API
    fn model_name(&self) -> &str;

    /// Base URL every request is issued against
    fn endpoint(&self) -> &str;

    async fn generate(
        &self,
        request: GenerateRequest,
        stream: bool,
        cancel: CancellationToken,
    ) -> ProviderResult<StreamResponse>;
}
