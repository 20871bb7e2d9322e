//! Model provider factory
//!
//! Turns one [`ProviderConfig`] into a uniform [`GenerativeModel`] and probes
//! connectivity. Dispatch goes through a strategy table keyed by
//! [`ProviderKind`]; hosts may register their own strategy for a kind.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use super::auth::{ApiKeyHeader, AuthenticatedTransport, BearerToken};
use super::error::{ProviderError, ProviderResult};
use super::gemini::{vertex_base_url, GeminiClient, VERTEX_DEFAULT_LOCATION};
use super::google_auth::{GoogleCredentials, TokenSource};
use super::openai::{probe_chat_completions, OpenAiChatClient};
use super::openai_responses::OpenAiResponsesClient;
use super::traits::{GenerateOptions, GenerateRequest, GenerativeModel};
use crate::config::ConfigStore;
use crate::logging::{Logger, NoOpLogger};
use crate::transport::TransportProvider;
use crate::types::{ChatMessage, ProviderConfig, ProviderKind};
use crate::{log_debug, log_info, log_warn};

/// Deadline for `test_connectivity` when the caller names none
pub const DEFAULT_CONNECTIVITY_TIMEOUT: Duration = Duration::from_secs(15);

/// What a strategy gets to build with
pub struct BuildContext<'a> {
    /// Client from the injected transport
    pub http: reqwest::Client,
    pub logger: &'a Arc<dyn Logger>,
}

/// One construction path
#[async_trait]
pub trait ClientStrategy: Send + Sync {
    fn kind(&self) -> ProviderKind;

    async fn build(
        &self,
        config: &ProviderConfig,
        ctx: &BuildContext<'_>,
    ) -> ProviderResult<Arc<dyn GenerativeModel>>;

    /// Connectivity probe; defaults to one capped streaming generation
    async fn probe(&self, config: &ProviderConfig, ctx: &BuildContext<'_>) -> ProviderResult<()> {
        let client = self.build(config, ctx).await?;
        probe_via_generate(client.as_ref()).await
    }
}

/// Issue one streaming generation capped at one output token
///
/// Only the first produced unit is inspected; the rest of the stream is
/// dropped unread.
pub async fn probe_via_generate(client: &dyn GenerativeModel) -> ProviderResult<()> {
    let cancel = CancellationToken::new();
    let request = GenerateRequest::new(vec![ChatMessage::user("hi")])
        .with_options(GenerateOptions::new().with_max_tokens(1));

    let mut stream = client.generate(request, true, cancel.clone()).await?;
    let first = stream.next().await;
    cancel.cancel();
    match first {
        Some(Err(e)) => Err(e),
        _ => Ok(()),
    }
}

/// Environment variables consulted for a Gemini key, in order
pub const GEMINI_KEY_ENV: [&str; 2] = ["GOOGLE_API_KEY", "GEMINI_API_KEY"];

/// Configured key, else the first non-empty key from `lookup`
fn gemini_api_key(configured: &str, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    if !configured.trim().is_empty() {
        return Some(configured.trim().to_string());
    }
    GEMINI_KEY_ENV
        .iter()
        .filter_map(|name| lookup(name))
        .map(|key| key.trim().to_string())
        .find(|key| !key.is_empty())
}

struct GeminiStrategy;

#[async_trait]
impl ClientStrategy for GeminiStrategy {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    async fn build(
        &self,
        config: &ProviderConfig,
        ctx: &BuildContext<'_>,
    ) -> ProviderResult<Arc<dyn GenerativeModel>> {
        let api_key = gemini_api_key(&config.api_key, |name| std::env::var(name).ok())
            .ok_or_else(|| ProviderError::missing_api_key("gemini"))?;
        let auth = Arc::new(ApiKeyHeader::new("x-goog-api-key", api_key));
        let transport = AuthenticatedTransport::new(ctx.http.clone(), auth);
        Ok(Arc::new(GeminiClient::gemini(transport, &config.base_url, config.model_name.clone())))
    }
}

struct VertexStrategy;

#[async_trait]
impl ClientStrategy for VertexStrategy {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Vertex
    }

    async fn build(
        &self,
        config: &ProviderConfig,
        ctx: &BuildContext<'_>,
    ) -> ProviderResult<Arc<dyn GenerativeModel>> {
        if config.project.trim().is_empty() {
            return Err(ProviderError::invalid_config("vertex", "project is required"));
        }
        let location = match config.location.trim() {
            "" => VERTEX_DEFAULT_LOCATION,
            location => location,
        };

        let credentials = if config.credentials_json.trim().is_empty() {
            GoogleCredentials::detect_default()?
        } else {
            GoogleCredentials::from_json(&config.credentials_json)?
        };
        log_debug!(
            ctx.logger,
            "[ModelFactory] vertex '{}' uses {} credentials",
            config.id,
            credentials.describe()
        );

        let base_url = if config.base_url.trim().is_empty() {
            vertex_base_url(config.project.trim(), location)
        } else {
            config.base_url.trim().trim_end_matches('/').to_string()
        };

        let auth = Arc::new(TokenSource::new(credentials, ctx.http.clone()));
        let transport = AuthenticatedTransport::new(ctx.http.clone(), auth);
        Ok(Arc::new(GeminiClient::vertex(transport, base_url, config.model_name.clone())))
    }
}

struct OpenAiChatStrategy;

#[async_trait]
impl ClientStrategy for OpenAiChatStrategy {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAiChat
    }

    async fn build(
        &self,
        config: &ProviderConfig,
        ctx: &BuildContext<'_>,
    ) -> ProviderResult<Arc<dyn GenerativeModel>> {
        let auth = Arc::new(BearerToken::new(config.api_key.clone()));
        let transport = AuthenticatedTransport::new(ctx.http.clone(), auth);
        Ok(Arc::new(OpenAiChatClient::new(transport, &config.base_url, config.model_name.clone())))
    }

    async fn probe(&self, config: &ProviderConfig, ctx: &BuildContext<'_>) -> ProviderResult<()> {
        probe_chat_completions(&ctx.http, &config.base_url, &config.api_key, &config.model_name)
            .await
    }
}

struct OpenAiResponsesStrategy;

#[async_trait]
impl ClientStrategy for OpenAiResponsesStrategy {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAiResponses
    }

    async fn build(
        &self,
        config: &ProviderConfig,
        ctx: &BuildContext<'_>,
    ) -> ProviderResult<Arc<dyn GenerativeModel>> {
        let auth = Arc::new(BearerToken::new(config.api_key.clone()));
        let transport = AuthenticatedTransport::new(ctx.http.clone(), auth);
        let model = config.model_name.clone();
        Ok(Arc::new(OpenAiResponsesClient::new(transport, &config.base_url, model)))
    }

    async fn probe(&self, config: &ProviderConfig, ctx: &BuildContext<'_>) -> ProviderResult<()> {
        probe_chat_completions(&ctx.http, &config.base_url, &config.api_key, &config.model_name)
            .await
    }
}

/// Stateless factory for generation clients
pub struct ModelFactory {
    transport: Arc<dyn TransportProvider>,
    logger: Arc<dyn Logger>,
    strategies: HashMap<ProviderKind, Arc<dyn ClientStrategy>>,
}

impl ModelFactory {
    /// Factory with the built-in strategies for every [`ProviderKind`]
    pub fn new(transport: Arc<dyn TransportProvider>, logger: Arc<dyn Logger>) -> Self {
        let builtin: [Arc<dyn ClientStrategy>; 4] = [
            Arc::new(GeminiStrategy),
            Arc::new(VertexStrategy),
            Arc::new(OpenAiChatStrategy),
            Arc::new(OpenAiResponsesStrategy),
        ];
        Self {
            transport,
            logger,
            strategies: builtin.into_iter().map(|s| (s.kind(), s)).collect(),
        }
    }

    /// Factory that logs nothing
    pub fn with_transport(transport: Arc<dyn TransportProvider>) -> Self {
        Self::new(transport, Arc::new(NoOpLogger))
    }

    /// Replace the strategy for `strategy.kind()`
    pub fn with_strategy(mut self, strategy: Arc<dyn ClientStrategy>) -> Self {
        self.strategies.insert(strategy.kind(), strategy);
        self
    }

    /// Provider tags accepted in configs
    pub fn supported_providers() -> &'static [&'static str] {
        ProviderKind::TAGS
    }

    fn strategy(&self, config: &ProviderConfig) -> ProviderResult<&Arc<dyn ClientStrategy>> {
        ProviderKind::resolve(config)
            .and_then(|kind| self.strategies.get(&kind))
            .ok_or_else(|| ProviderError::UnsupportedProvider(config.provider.clone()))
    }

    fn context(&self) -> BuildContext<'_> {
        BuildContext {
            http: self.transport.http_client(),
            logger: &self.logger,
        }
    }

    /// Build the client for one config
    pub async fn build_client(
        &self,
        config: &ProviderConfig,
    ) -> ProviderResult<Arc<dyn GenerativeModel>> {
        let strategy = self.strategy(config)?;
        let client = strategy.build(config, &self.context()).await?;
        log_info!(
            self.logger,
            "[ModelFactory] built {} client for '{}' ({})",
            client.kind(),
            config.id,
            client.model_name()
        );
        Ok(client)
    }

    /// Build the client for the config stored under `id`
    pub async fn build_from_store(
        &self,
        store: &dyn ConfigStore,
        id: &str,
    ) -> ProviderResult<Arc<dyn GenerativeModel>> {
        let config = store
            .provider(id)
            .await?
            .ok_or_else(|| ProviderError::ConfigNotFound(id.to_string()))?;
        self.build_client(&config).await
    }

    /// Probe connectivity within [`DEFAULT_CONNECTIVITY_TIMEOUT`]
    pub async fn test_connectivity(&self, config: &ProviderConfig) -> ProviderResult<()> {
        self.test_connectivity_with_timeout(config, DEFAULT_CONNECTIVITY_TIMEOUT).await
    }

    /// Probe connectivity within `timeout`
    pub async fn test_connectivity_with_timeout(
        &self,
        config: &ProviderConfig,
        timeout: Duration,
    ) -> ProviderResult<()> {
        let strategy = self.strategy(config)?;
        let ctx = self.context();
        let result = match tokio::time::timeout(timeout, strategy.probe(config, &ctx)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(timeout)),
        };
        if let Err(e) = &result {
            log_warn!(
                self.logger,
                "[ModelFactory] connectivity test for '{}' failed: {}",
                config.id,
                e
            );
        }
        result
    }
}

impl std::fmt::Debug for ModelFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<String> = self.strategies.keys().map(|k| k.to_string()).collect();
        kinds.sort();
        f.debug_struct("ModelFactory").field("strategies", &kinds).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryConfigStore;
    use crate::logging::{LogLevel, MemoryLogger};
    use crate::transport::StaticTransport;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn factory() -> ModelFactory {
        ModelFactory::with_transport(Arc::new(StaticTransport::default()))
    }

    #[tokio::test]
    async fn test_unsupported_provider() {
        let config = ProviderConfig::new("x", "anthropic", "claude");
        let err = factory().build_client(&config).await.err().unwrap();
        assert!(matches!(err, ProviderError::UnsupportedProvider(p) if p == "anthropic"));

        let err = factory().test_connectivity(&config).await.unwrap_err();
        assert!(matches!(err, ProviderError::UnsupportedProvider(_)));
    }

    #[tokio::test]
    async fn test_openai_base_url_normalized() {
        let config = ProviderConfig::new("oa", "openai", "gpt-4o").with_api_key("k");
        let client = factory().build_client(&config).await.unwrap();
        assert_eq!(client.kind(), ProviderKind::OpenAiChat);
        assert_eq!(client.endpoint(), "https://api.openai.com/v1");

        let config = config.with_base_url("http://host/v1/").with_responses(true);
        let client = factory().build_client(&config).await.unwrap();
        assert_eq!(client.kind(), ProviderKind::OpenAiResponses);
        assert_eq!(client.endpoint(), "http://host/v1");
    }

    #[tokio::test]
    async fn test_gemini_requires_key() {
        if GEMINI_KEY_ENV.iter().any(|name| std::env::var(name).is_ok_and(|v| !v.trim().is_empty())) {
            return;
        }
        let config = ProviderConfig::new("g", "gemini", "gemini-2.0-flash");
        let err = factory().build_client(&config).await.err().unwrap();
        assert!(matches!(err, ProviderError::MissingApiKey { .. }));
    }

    fn env(vars: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |name| vars.iter().find(|(k, _)| *k == name).map(|(_, v)| v.to_string())
    }

    #[test]
    fn test_gemini_key_falls_back_to_env() {
        assert_eq!(gemini_api_key("cfg-key", env(&[("GOOGLE_API_KEY", "env")])), Some("cfg-key".into()));
        assert_eq!(
            gemini_api_key("", env(&[("GEMINI_API_KEY", "gem"), ("GOOGLE_API_KEY", "goog")])),
            Some("goog".into())
        );
        assert_eq!(
            gemini_api_key(" ", env(&[("GOOGLE_API_KEY", ""), ("GEMINI_API_KEY", "gem")])),
            Some("gem".into())
        );
        assert_eq!(gemini_api_key("", env(&[])), None);
    }

    #[tokio::test]
    async fn test_vertex_requires_project() {
        let config = ProviderConfig::new("v", "vertexai", "gemini-2.0-flash");
        let err = factory().build_client(&config).await.err().unwrap();
        assert!(matches!(err, ProviderError::InvalidConfig { .. }));
    }

    #[tokio::test]
    async fn test_vertex_scoped_to_project_and_location() {
        let creds = json!({
            "type": "authorized_user",
            "client_id": "id",
            "client_secret": "secret",
            "refresh_token": "refresh"
        });
        let config = ProviderConfig::new("v", "vertex", "gemini-2.0-flash")
            .with_project("my-proj", "europe-west4")
            .with_credentials_json(creds.to_string());
        let client = factory().build_client(&config).await.unwrap();
        assert_eq!(client.kind(), ProviderKind::Vertex);
        assert_eq!(
            client.endpoint(),
            "https://europe-west4-aiplatform.googleapis.com/v1/projects/my-proj/locations/europe-west4/publishers/google"
        );
    }

    #[tokio::test]
    async fn test_openai_connectivity_failure_message() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(500)
            .with_body("server error")
            .create_async()
            .await;

        let logger = Arc::new(MemoryLogger::new());
        let factory = ModelFactory::new(Arc::new(StaticTransport::default()), logger.clone());
        let config = ProviderConfig::new("oa", "openai", "gpt-4o")
            .with_api_key("k")
            .with_base_url(server.url());
        let message = factory.test_connectivity(&config).await.unwrap_err().to_string();
        assert!(message.contains("500"));
        assert!(message.contains("server error"));
        assert!(logger.contains(LogLevel::Warn, "[ModelFactory]"));
    }

    #[tokio::test]
    async fn test_openai_connectivity_body_truncated() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(429)
            .with_body("x".repeat(2000))
            .create_async()
            .await;

        let config = ProviderConfig::new("oa", "openai", "gpt-4o").with_base_url(server.url());
        match factory().test_connectivity(&config).await {
            Err(ProviderError::HttpStatus { status, body }) => {
                assert_eq!(status, 429);
                assert_eq!(body.len(), 512);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_openai_connectivity_reports_status_of_stalled_body() {
        let addr = crate::providers::http::tests::stalled_error_server().await;
        let config = ProviderConfig::new("oa", "openai", "gpt-4o").with_base_url(format!("http://{}", addr));

        let err = factory()
            .test_connectivity_with_timeout(&config, Duration::from_secs(2))
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("500"), "{}", message);
        assert!(message.contains("server error"), "{}", message);
    }

    #[tokio::test]
    async fn test_gemini_connectivity_via_stream() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-2.0-flash:streamGenerateContent")
            .match_query(Matcher::UrlEncoded("alt".into(), "sse".into()))
            .match_header("x-goog-api-key", "g-key")
            .match_body(Matcher::PartialJson(json!({"generationConfig": {"maxOutputTokens": 1}})))
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body("data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"H\"}]}}]}\n\n")
            .create_async()
            .await;

        let config = ProviderConfig::new("g", "gemini", "gemini-2.0-flash")
            .with_api_key("g-key")
            .with_base_url(server.url());
        factory().test_connectivity(&config).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_gemini_connectivity_error_status() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/models/gemini-2.0-flash:streamGenerateContent")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"error":{"message":"API key not valid"}}"#)
            .create_async()
            .await;

        let config = ProviderConfig::new("g", "gemini", "gemini-2.0-flash")
            .with_api_key("bad")
            .with_base_url(server.url());
        let err = factory().test_connectivity(&config).await.unwrap_err();
        assert!(err.to_string().contains("API key not valid"));
    }

    #[tokio::test]
    async fn test_vertex_connectivity_end_to_end() {
        let mut server = Server::new_async().await;
        let token = server
            .mock("POST", "/token")
            .with_status(200)
            .with_body(r#"{"access_token":"ya29.vertex","expires_in":3600}"#)
            .create_async()
            .await;
        let generate = server
            .mock("POST", "/models/gemini-2.0-flash:streamGenerateContent")
            .match_query(Matcher::UrlEncoded("alt".into(), "sse".into()))
            .match_header("authorization", "Bearer ya29.vertex")
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body("data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"ok\"}]}}]}\n\n")
            .create_async()
            .await;

        let creds = json!({
            "type": "authorized_user",
            "client_id": "id",
            "client_secret": "secret",
            "refresh_token": "refresh",
            "token_uri": format!("{}/token", server.url())
        });
        let config = ProviderConfig::new("v", "vertexai", "gemini-2.0-flash")
            .with_project("proj", "")
            .with_base_url(server.url())
            .with_credentials_json(creds.to_string());
        factory().test_connectivity(&config).await.unwrap();
        token.assert_async().await;
        generate.assert_async().await;
    }

    #[tokio::test]
    async fn test_connectivity_timeout() {
        // Accepts connections but never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let config = ProviderConfig::new("oa", "openai", "gpt-4o").with_base_url(format!("http://{}", addr));
        let started = std::time::Instant::now();
        let err = factory()
            .test_connectivity_with_timeout(&config, Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Timeout(_)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_build_from_store() {
        let store = MemoryConfigStore::new();
        store.set_providers(vec![ProviderConfig::new("main", "openai", "gpt-4o")]);

        let client = factory().build_from_store(&store, "main").await.unwrap();
        assert_eq!(client.model_name(), "gpt-4o");

        let err = factory().build_from_store(&store, "other").await.err().unwrap();
        assert!(matches!(err, ProviderError::ConfigNotFound(id) if id == "other"));
    }

    struct FixedStrategy;

    #[async_trait]
    impl ClientStrategy for FixedStrategy {
        fn kind(&self) -> ProviderKind {
            ProviderKind::OpenAiChat
        }

        async fn build(&self, _: &ProviderConfig, _: &BuildContext<'_>) -> ProviderResult<Arc<dyn GenerativeModel>> {
            Err(ProviderError::invalid_config("custom", "always fails"))
        }

        async fn probe(&self, _: &ProviderConfig, _: &BuildContext<'_>) -> ProviderResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_registered_strategy_replaces_builtin() {
        let factory = factory().with_strategy(Arc::new(FixedStrategy));
        let config = ProviderConfig::new("oa", "openai", "gpt-4o");
        assert!(factory.build_client(&config).await.is_err());
        assert!(factory.test_connectivity(&config).await.is_ok());
        assert!(ModelFactory::supported_providers().contains(&"vertexai"));
    }
}
