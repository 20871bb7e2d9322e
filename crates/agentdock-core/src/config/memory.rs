//! In-memory configuration store

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::transport::ProxySettings;
use crate::types::{ProviderConfig, ToolServerConfig};
use super::traits::{ConfigResult, ConfigStore};

/// In-memory configuration store
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    tool_servers: RwLock<Vec<ToolServerConfig>>,
    providers: RwLock<Vec<ProviderConfig>>,
    proxy: RwLock<Option<ProxySettings>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with initial contents
    pub fn with_contents(
        tool_servers: Vec<ToolServerConfig>,
        providers: Vec<ProviderConfig>,
    ) -> Self {
        Self {
            tool_servers: RwLock::new(tool_servers),
            providers: RwLock::new(providers),
            proxy: RwLock::new(None),
        }
    }

    /// Replace all tool-server configs
    pub fn set_tool_servers(&self, servers: Vec<ToolServerConfig>) {
        *self.tool_servers.write() = servers;
    }

    /// Replace all provider configs
    pub fn set_providers(&self, providers: Vec<ProviderConfig>) {
        *self.providers.write() = providers;
    }

    pub fn set_proxy(&self, proxy: Option<ProxySettings>) {
        *self.proxy.write() = proxy;
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn tool_servers(&self) -> ConfigResult<Vec<ToolServerConfig>> {
        Ok(self.tool_servers.read().clone())
    }

    async fn providers(&self) -> ConfigResult<Vec<ProviderConfig>> {
        Ok(self.providers.read().clone())
    }

    async fn proxy(&self) -> ConfigResult<Option<ProxySettings>> {
        Ok(self.proxy.read().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_config_store() {
        let store = MemoryConfigStore::new();
        assert!(store.tool_servers().await.unwrap().is_empty());
        assert!(store.proxy().await.unwrap().is_none());

        store.set_providers(vec![
            ProviderConfig::new("a", "openai", "gpt-4o"),
            ProviderConfig::new("b", "gemini", "gemini-2.0-flash"),
        ]);
        let found = store.provider("b").await.unwrap().unwrap();
        assert_eq!(found.provider, "gemini");
        assert!(store.provider("missing").await.unwrap().is_none());

        store.set_tool_servers(vec![ToolServerConfig::command("fs", "Filesystem", "mcp-fs", vec![])]);
        assert_eq!(store.tool_servers().await.unwrap()[0].id, "fs");
    }
}
