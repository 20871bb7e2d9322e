//! Outbound HTTP transport
//!
//! Every outbound request made by this crate, including model calls, OAuth
//! token fetches and tool-server HTTP sessions, goes through a client handed
//! out by a [`TransportProvider`]. The host decides the proxy policy once.

use serde::{Deserialize, Serialize};

/// Supplies the HTTP client used for all outbound traffic
pub trait TransportProvider: Send + Sync {
    /// Client to use for the next request. `reqwest::Client` is a cheap handle.
    fn http_client(&self) -> reqwest::Client;
}

/// Errors building a transport
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Proxy URL required for custom proxy mode")]
    MissingProxyUrl,

    #[error("Invalid proxy '{url}': {source}")]
    InvalidProxy {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
}

/// How outbound traffic reaches the network
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyMode {
    /// Direct connections, environment proxy variables ignored
    None,
    /// Honor HTTP_PROXY / HTTPS_PROXY / NO_PROXY from the environment
    #[default]
    System,
    /// Route through `url`
    Custom,
}

/// Proxy policy as stored in configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxySettings {
    #[serde(default)]
    pub mode: ProxyMode,
    /// Proxy URL (custom mode)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Comma-separated hosts that bypass the proxy (custom mode)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_proxy: Option<String>,
}

/// Transport wrapping an existing client
#[derive(Debug, Clone, Default)]
pub struct StaticTransport {
    client: reqwest::Client,
}

impl StaticTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl TransportProvider for StaticTransport {
    fn http_client(&self) -> reqwest::Client {
        self.client.clone()
    }
}

/// Transport whose client is built from [`ProxySettings`]
#[derive(Debug, Clone)]
pub struct ProxyTransport {
    settings: ProxySettings,
    client: reqwest::Client,
}

impl ProxyTransport {
    /// Build the client for a proxy policy
    pub fn from_settings(settings: &ProxySettings) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder();

        match settings.mode {
            ProxyMode::None => {
                builder = builder.no_proxy();
            }
            ProxyMode::System => {}
            ProxyMode::Custom => {
                let url = settings
                    .url
                    .as_deref()
                    .filter(|u| !u.trim().is_empty())
                    .ok_or(TransportError::MissingProxyUrl)?;
                let proxy = reqwest::Proxy::all(url)
                    .map_err(|source| TransportError::InvalidProxy {
                        url: url.to_string(),
                        source,
                    })?
                    .no_proxy(settings.no_proxy.as_deref().and_then(reqwest::NoProxy::from_string));
                builder = builder.proxy(proxy);
            }
        }

        let client = builder.build().map_err(TransportError::Build)?;
        Ok(Self {
            settings: settings.clone(),
            client,
        })
    }

    pub fn settings(&self) -> &ProxySettings {
        &self.settings
    }
}

impl TransportProvider for ProxyTransport {
    fn http_client(&self) -> reqwest::Client {
        self.client.clone()
    }
}
