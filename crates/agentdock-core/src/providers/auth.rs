//! Request authentication layers
//!
//! A layer decorates an outgoing request with credentials. The
//! [`AuthenticatedTransport`] pairs the injected HTTP client with one layer so
//! clients never touch credentials directly.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::RequestBuilder;

use super::error::ProviderResult;

/// Adds credentials to an outgoing request
#[async_trait]
pub trait AuthLayer: Send + Sync {
    async fn apply(&self, request: RequestBuilder) -> ProviderResult<RequestBuilder>;
}

/// Static key sent in a named header (`x-goog-api-key` for Gemini)
pub struct ApiKeyHeader {
    header: &'static str,
    key: String,
}

impl ApiKeyHeader {
    pub fn new(header: &'static str, key: impl Into<String>) -> Self {
        Self {
            header,
            key: key.into(),
        }
    }
}

#[async_trait]
impl AuthLayer for ApiKeyHeader {
    async fn apply(&self, request: RequestBuilder) -> ProviderResult<RequestBuilder> {
        Ok(request.header(self.header, &self.key))
    }
}

/// Static bearer token; an empty token sends no header
pub struct BearerToken {
    token: String,
}

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

#[async_trait]
impl AuthLayer for BearerToken {
    async fn apply(&self, request: RequestBuilder) -> ProviderResult<RequestBuilder> {
        if self.token.is_empty() {
            return Ok(request);
        }
        Ok(request.bearer_auth(&self.token))
    }
}

/// Injected client plus the layer that authenticates its requests
#[derive(Clone)]
pub struct AuthenticatedTransport {
    http: reqwest::Client,
    auth: Arc<dyn AuthLayer>,
}

impl AuthenticatedTransport {
    pub fn new(http: reqwest::Client, auth: Arc<dyn AuthLayer>) -> Self {
        Self { http, auth }
    }

    /// Authenticated POST to `url`
    pub async fn post(&self, url: &str) -> ProviderResult<RequestBuilder> {
        self.auth.apply(self.http.post(url)).await
    }
}

impl std::fmt::Debug for AuthenticatedTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatedTransport").finish_non_exhaustive()
    }
}
