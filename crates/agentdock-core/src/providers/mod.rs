//! Generation provider clients
//!
//! [`ModelFactory`] turns a [`ProviderConfig`](crate::types::ProviderConfig)
//! into an `Arc<dyn GenerativeModel>`:
//!
//! | tag                         | kind               | auth                     |
//! |-----------------------------|--------------------|--------------------------|
//! | `gemini`                    | Gemini API         | `x-goog-api-key` header  |
//! | `vertexai` / `vertex`       | Vertex AI          | OAuth bearer (ADC/JSON)  |
//! | `openai`                    | Chat Completions   | bearer API key           |
//! | `openai` + `useResponses`   | Responses API      | bearer API key           |
//!
//! All HTTP goes through the client supplied by the injected
//! [`TransportProvider`](crate::transport::TransportProvider).
//!
//! ```rust,ignore
//! use agentdock_core::providers::{ModelFactory, GenerateRequest};
//!
//! let factory = ModelFactory::new(transport, logger);
//! factory.test_connectivity(&config).await?;
//! let model = factory.build_client(&config).await?;
//! let stream = model.generate(GenerateRequest::new(messages), true, cancel).await?;
//! ```

mod traits;
mod error;
mod http;
mod auth;
mod google_auth;
mod openai;
mod openai_responses;
mod gemini;
mod factory;

pub use traits::{GenerateOptions, GenerateRequest, GenerativeModel, StreamResponse};
pub use error::{ProviderError, ProviderResult};
pub use auth::{ApiKeyHeader, AuthLayer, AuthenticatedTransport, BearerToken};
pub use google_auth::{
    AccessToken, AuthorizedUser, GoogleCredentials, ServiceAccountKey, TokenSource,
    CLOUD_PLATFORM_SCOPE,
};
pub use openai::{normalize_base_url, OpenAiChatClient, OPENAI_DEFAULT_BASE};
pub use openai_responses::OpenAiResponsesClient;
pub use gemini::{vertex_base_url, GeminiClient, GEMINI_DEFAULT_BASE, VERTEX_DEFAULT_LOCATION};
pub use factory::{
    probe_via_generate, BuildContext, ClientStrategy, ModelFactory, DEFAULT_CONNECTIVITY_TIMEOUT,
    GEMINI_KEY_ENV,
};
