//! Configuration store trait

use async_trait::async_trait;

use crate::transport::ProxySettings;
use crate::types::{ProviderConfig, ToolServerConfig};

/// Source of tool-server and generation-provider configuration
///
/// Implementations:
/// - `MemoryConfigStore`: in-memory
/// - `FileConfigStore`: YAML file (~/.config/agentdock/config.yaml)
/// - Host adapters backed by their own settings storage
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// All tool-server configs, disabled ones included, in stored order
    async fn tool_servers(&self) -> ConfigResult<Vec<ToolServerConfig>>;

    /// All generation-provider configs in stored order
    async fn providers(&self) -> ConfigResult<Vec<ProviderConfig>>;

    /// Look up one provider config by id
    async fn provider(&self, id: &str) -> ConfigResult<Option<ProviderConfig>> {
        Ok(self.providers().await?.into_iter().find(|p| p.id == id))
    }

    /// Outbound proxy policy, if the store carries one
    async fn proxy(&self) -> ConfigResult<Option<ProxySettings>> {
        Ok(None)
    }
}

/// Errors that can occur during configuration operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    #[error("Duplicate id: {0}")]
    DuplicateId(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Other(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
