//! File-based configuration store (YAML)
//!
//! Lives at `~/.config/agentdock/config.yaml` by default.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::transport::ProxySettings;
use crate::types::{ProviderConfig, ToolServerConfig};
use super::traits::{ConfigError, ConfigResult, ConfigStore};

/// Configuration file structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    /// Tool servers, disabled ones included
    #[serde(default)]
    pub tool_servers: Vec<ToolServerConfig>,

    /// Generation providers
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,

    /// Outbound proxy policy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxySettings>,
}

impl ConfigFile {
    /// Reject duplicate ids within each collection
    pub fn validate(&self) -> ConfigResult<()> {
        let mut seen = HashSet::new();
        for server in &self.tool_servers {
            if !seen.insert(server.id.as_str()) {
                return Err(ConfigError::DuplicateId(server.id.clone()));
            }
        }
        let mut seen = HashSet::new();
        for provider in &self.providers {
            if !seen.insert(provider.id.as_str()) {
                return Err(ConfigError::DuplicateId(provider.id.clone()));
            }
        }
        Ok(())
    }
}

/// File-based configuration store
///
/// Reads lazily and caches the parsed file until `reload` or `save`.
///
/// # Example
///
/// ```no_run
/// use agentdock_core::config::FileConfigStore;
///
/// let store = FileConfigStore::user();
/// let file = store.reload().unwrap();
/// println!("{} tool servers", file.tool_servers.len());
/// ```
pub struct FileConfigStore {
    path: PathBuf,
    cache: RwLock<Option<ConfigFile>>,
}

impl FileConfigStore {
    /// Create a store for a specific path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: RwLock::new(None),
        }
    }

    /// Create the user-level store (~/.config/agentdock/config.yaml)
    pub fn user() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".config")
            });
        Self::new(config_dir.join("agentdock").join("config.yaml"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    fn load(&self) -> ConfigResult<ConfigFile> {
        if !self.path.exists() {
            return Ok(ConfigFile::default());
        }

        let content = fs::read_to_string(&self.path)?;
        let config: ConfigFile = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    fn get_config(&self) -> ConfigResult<ConfigFile> {
        if let Some(config) = self.cache.read().as_ref() {
            return Ok(config.clone());
        }
        self.reload()
    }

    /// Reload from disk, replacing the cache
    pub fn reload(&self) -> ConfigResult<ConfigFile> {
        let config = self.load()?;
        *self.cache.write() = Some(config.clone());
        Ok(config)
    }

    /// Write the whole file and refresh the cache
    pub fn save(&self, config: &ConfigFile) -> ConfigResult<()> {
        config.validate()?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(config)?;
        fs::write(&self.path, content)?;

        *self.cache.write() = Some(config.clone());
        Ok(())
    }
}

impl std::fmt::Debug for FileConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileConfigStore")
            .field("path", &self.path)
            .field("exists", &self.exists())
            .finish()
    }
}

#[async_trait]
impl ConfigStore for FileConfigStore {
    async fn tool_servers(&self) -> ConfigResult<Vec<ToolServerConfig>> {
        Ok(self.get_config()?.tool_servers)
    }

    async fn providers(&self) -> ConfigResult<Vec<ProviderConfig>> {
        Ok(self.get_config()?.providers)
    }

    async fn proxy(&self) -> ConfigResult<Option<ProxySettings>> {
        Ok(self.get_config()?.proxy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ProxyMode;
    use crate::types::TransportType;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::new(dir.path().join("config.yaml"));

        assert!(!store.exists());
        assert!(store.tool_servers().await.unwrap().is_empty());
        assert!(store.providers().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_read_yaml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            r#"
toolServers:
  - id: fs
    name: Filesystem
    transportType: command
    command: mcp-fs
    args: ["/tmp"]
  - id: web
    name: Web
    transportType: streamable-http
    endpoint: http://localhost:9000/mcp
    enabled: false
providers:
  - id: main
    provider: openai
    modelName: gpt-4o
    apiKey: sk-test
proxy:
  mode: custom
  url: http://proxy.local:3128
"#,
        )
        .unwrap();

        let store = FileConfigStore::new(&path);
        let servers = store.tool_servers().await.unwrap();
        assert_eq!(servers.len(), 2);
        assert_eq!(servers[1].transport_type, TransportType::StreamableHttp);
        assert!(!servers[1].enabled);

        let main = store.provider("main").await.unwrap().unwrap();
        assert_eq!(main.model_name, "gpt-4o");

        let proxy = store.proxy().await.unwrap().unwrap();
        assert_eq!(proxy.mode, ProxyMode::Custom);
    }

    #[tokio::test]
    async fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        let store = FileConfigStore::new(&path);

        let file = ConfigFile {
            tool_servers: vec![ToolServerConfig::command("fs", "Filesystem", "mcp-fs", vec![])],
            providers: vec![ProviderConfig::new("g", "gemini", "gemini-2.0-flash")],
            proxy: None,
        };
        store.save(&file).unwrap();
        assert!(store.exists());

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("toolServers"));
        assert!(content.contains("transportType: command"));

        let other = FileConfigStore::new(&path);
        assert_eq!(other.reload().unwrap(), file);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::new(dir.path().join("config.yaml"));
        let file = ConfigFile {
            tool_servers: vec![
                ToolServerConfig::command("fs", "A", "a", vec![]),
                ToolServerConfig::command("fs", "B", "b", vec![]),
            ],
            ..Default::default()
        };
        assert!(matches!(store.save(&file), Err(ConfigError::DuplicateId(id)) if id == "fs"));
    }

    #[test]
    fn test_invalid_yaml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "toolServers: [ {").unwrap();
        assert!(matches!(FileConfigStore::new(&path).reload(), Err(ConfigError::Yaml(_))));
    }
}
