//! Tool connection manager
//!
//! Owns the enabled tool-server configs and a cache of live connections.
//! One async RwLock guards all mutable state: status reads take the read
//! lock, anything that may touch the cache (lazy builds included) holds the
//! write lock for the whole operation. Probes copy the config under the read
//! lock and connect outside it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use super::connection::ToolConnection;
use super::error::{McpError, McpResult};
use super::rmcp_connector::RmcpConnector;
use super::session::{ClientIdentity, Connector};
use super::status::{ServerStatus, ToolInfo};
use crate::config::{ConfigResult, ConfigStore};
use crate::logging::Logger;
use crate::transport::TransportProvider;
use crate::types::{Lifetime, ToolServerConfig};

/// Deadline for `test_connection`
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Deadline for `get_tool_catalog`
pub const CATALOG_TIMEOUT: Duration = Duration::from_secs(10);

/// Deadline for building a cached connection
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Status text for ids with no enabled config
pub const CONFIGURATION_MISSING: &str = "configuration missing";

/// Manager tuning
#[derive(Debug, Clone)]
pub struct ManagerOptions {
    pub probe_timeout: Duration,
    pub catalog_timeout: Duration,
    pub connect_timeout: Duration,
    /// Implementation name sent by cached connections
    pub client_name: String,
    pub client_version: String,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        let identity = ClientIdentity::default();
        Self {
            probe_timeout: PROBE_TIMEOUT,
            catalog_timeout: CATALOG_TIMEOUT,
            connect_timeout: CONNECT_TIMEOUT,
            client_name: identity.name,
            client_version: identity.version,
        }
    }
}

impl ManagerOptions {
    fn identity(&self) -> ClientIdentity {
        ClientIdentity::new(&self.client_name, &self.client_version)
    }
}

#[derive(Default)]
struct ManagerState {
    lifetime: Option<Lifetime>,
    configs: HashMap<String, ToolServerConfig>,
    /// Enabled ids in load order
    order: Vec<String>,
    connections: HashMap<String, Arc<ToolConnection>>,
}

impl ManagerState {
    /// Drop cache entries whose session has ended
    fn evict_closed(&mut self) {
        self.connections.retain(|_, conn| !conn.is_closed());
    }
}

/// Lazily built, cached connections to the enabled tool servers
pub struct McpManager {
    state: RwLock<ManagerState>,
    connector: Arc<dyn Connector>,
    options: ManagerOptions,
    logger: Arc<dyn Logger>,
}

impl McpManager {
    pub fn new(connector: Arc<dyn Connector>, logger: Arc<dyn Logger>) -> Self {
        Self::with_options(connector, logger, ManagerOptions::default())
    }

    pub fn with_options(
        connector: Arc<dyn Connector>,
        logger: Arc<dyn Logger>,
        options: ManagerOptions,
    ) -> Self {
        Self {
            state: RwLock::new(ManagerState::default()),
            connector,
            options,
            logger,
        }
    }

    /// Manager backed by the rmcp connector over `transport`
    pub fn with_transport(transport: Arc<dyn TransportProvider>, logger: Arc<dyn Logger>) -> Self {
        let connector = Arc::new(RmcpConnector::new(transport, logger.clone()));
        Self::new(connector, logger)
    }

    pub fn options(&self) -> &ManagerOptions {
        &self.options
    }

    /// Bind the lifetime scope and warm up every enabled config
    ///
    /// Only the first call binds; later calls are logged and ignored.
    /// Build failures are logged and skipped.
    pub async fn initialize(&self, lifetime: Lifetime) {
        let mut state = self.state.write().await;
        if state.lifetime.is_some() {
            self.logger
                .warn("[McpManager] initialize called more than once, keeping the first scope");
            return;
        }
        state.lifetime = Some(lifetime);
        self.logger.info(&format!(
            "[McpManager] Initialized with {} enabled server(s)",
            state.order.len()
        ));
        self.warm_up(&mut state).await;
    }

    /// Replace the enabled config set and drop every cached connection
    ///
    /// Disabled entries are filtered out; for duplicate ids the first wins.
    /// Handles already given out stay usable until their holders drop them.
    pub async fn load_configs(&self, configs: Vec<ToolServerConfig>) {
        let mut state = self.state.write().await;

        let mut order = Vec::new();
        let mut enabled = HashMap::new();
        for config in configs.into_iter().filter(|c| c.enabled) {
            if enabled.contains_key(&config.id) {
                self.logger
                    .warn(&format!("[McpManager] Duplicate server id '{}' ignored", config.id));
                continue;
            }
            order.push(config.id.clone());
            enabled.insert(config.id.clone(), config);
        }

        let dropped = state.connections.len();
        state.connections.clear();
        state.configs = enabled;
        state.order = order;
        self.logger.info(&format!(
            "[McpManager] Loaded {} enabled server(s), dropped {} cached connection(s)",
            state.order.len(),
            dropped
        ));

        let live = state.lifetime.as_ref().is_some_and(|l| !l.is_cancelled());
        if live {
            self.warm_up(&mut state).await;
        }
    }

    /// Reload the enabled set from a config store
    pub async fn reload_from(&self, store: &dyn ConfigStore) -> ConfigResult<()> {
        let configs = store.tool_servers().await?;
        self.load_configs(configs).await;
        Ok(())
    }

    /// Build a connection for `config` without touching the cache
    pub async fn create_connection(
        &self,
        config: &ToolServerConfig,
    ) -> McpResult<Arc<ToolConnection>> {
        let lifetime = self.state.read().await.lifetime.clone();
        self.build(config, lifetime.as_ref()).await.map(Arc::new)
    }

    /// Cached-or-built connections for `ids`, in input order
    ///
    /// Unknown ids are skipped. Build failures are logged and skipped.
    pub async fn get_connections_by_ids(&self, ids: &[String]) -> Vec<Arc<ToolConnection>> {
        let mut state = self.state.write().await;
        state.evict_closed();

        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if !state.configs.contains_key(id) {
                continue;
            }
            if let Some(conn) = self.get_or_build(&mut state, id).await {
                out.push(conn);
            }
        }
        out
    }

    /// Cached-or-built connection for every enabled config
    pub async fn get_all_connections(&self) -> Vec<Arc<ToolConnection>> {
        let mut state = self.state.write().await;
        state.evict_closed();

        let ids = state.order.clone();
        let mut out = Vec::with_capacity(ids.len());
        for id in &ids {
            if let Some(conn) = self.get_or_build(&mut state, id).await {
                out.push(conn);
            }
        }
        out
    }

    /// One record per enabled config, without any liveness claim
    pub async fn get_all_status(&self) -> Vec<ServerStatus> {
        let state = self.state.read().await;
        state.order.iter().map(ServerStatus::unknown).collect()
    }

    /// Open and discard a fresh session for `id`
    pub async fn test_connection(&self, id: &str) -> ServerStatus {
        let Some(config) = self.config(id).await else {
            return ServerStatus::failed(id, CONFIGURATION_MISSING);
        };

        let identity = ClientIdentity::probe(&config.name);
        let token = CancellationToken::new();
        let connect = self.connector.connect(&config, &identity, token.clone());
        let result = tokio::time::timeout(self.options.probe_timeout, connect).await;
        token.cancel();

        match result {
            Ok(Ok(session)) => {
                session.close();
                ServerStatus::connected(id)
            }
            Ok(Err(e)) => {
                self.logger.warn(&format!("[McpManager] Probe of '{}' failed: {}", id, e));
                ServerStatus::failed(id, e.to_string())
            }
            Err(_) => {
                let e = McpError::Timeout(self.options.probe_timeout);
                self.logger.warn(&format!("[McpManager] Probe of '{}' failed: {}", id, e));
                ServerStatus::failed(id, e.to_string())
            }
        }
    }

    /// List the tools of one server over a fresh session
    ///
    /// Identifies itself like `test_connection`. Unknown ids give an empty list.
    pub async fn get_tool_catalog(&self, id: &str) -> McpResult<Vec<ToolInfo>> {
        let Some(config) = self.config(id).await else {
            return Ok(Vec::new());
        };

        let identity = ClientIdentity::probe(&config.name);
        let token = CancellationToken::new();
        let result = tokio::time::timeout(self.options.catalog_timeout, async {
            let session = self.connector.connect(&config, &identity, token.clone()).await?;
            let tools = session.list_tools().await;
            session.close();
            tools
        })
        .await;
        token.cancel();

        let tools = result.map_err(|_| McpError::Timeout(self.options.catalog_timeout))??;
        Ok(tools
            .into_iter()
            .map(|tool| ToolInfo {
                name: tool.name,
                description: tool.description,
                server_id: config.id.clone(),
                server_name: config.name.clone(),
            })
            .collect())
    }

    /// Catalogs for `ids` concatenated in input order; failures are dropped
    pub async fn get_tool_catalogs(&self, ids: &[String]) -> Vec<ToolInfo> {
        let results = join_all(ids.iter().map(|id| self.get_tool_catalog(id))).await;

        let mut out = Vec::new();
        for (id, result) in ids.iter().zip(results) {
            match result {
                Ok(tools) => out.extend(tools),
                Err(e) => self
                    .logger
                    .warn(&format!("[McpManager] Catalog of '{}' unavailable: {}", id, e)),
            }
        }
        out
    }

    /// Number of cached connections
    pub async fn connection_count(&self) -> usize {
        self.state.read().await.connections.len()
    }

    async fn config(&self, id: &str) -> Option<ToolServerConfig> {
        self.state.read().await.configs.get(id).cloned()
    }

    async fn warm_up(&self, state: &mut ManagerState) {
        let ids = state.order.clone();
        let mut built = 0;
        for id in &ids {
            if self.get_or_build(state, id).await.is_some() {
                built += 1;
            }
        }
        self.logger.debug(&format!(
            "[McpManager] Warm-up built {}/{} connection(s)",
            built,
            ids.len()
        ));
    }

    /// Cached connection for `id`, building and caching it when absent
    async fn get_or_build(
        &self,
        state: &mut ManagerState,
        id: &str,
    ) -> Option<Arc<ToolConnection>> {
        if let Some(conn) = state.connections.get(id) {
            return Some(conn.clone());
        }
        let config = state.configs.get(id)?.clone();

        match self.build(&config, state.lifetime.as_ref()).await {
            Ok(conn) => {
                let conn = Arc::new(conn);
                state.connections.insert(id.to_string(), conn.clone());
                self.logger.debug(&format!("[McpManager] Connected to '{}'", id));
                Some(conn)
            }
            Err(e) => {
                self.logger
                    .error(&format!("[McpManager] Failed to connect to '{}': {}", id, e));
                None
            }
        }
    }

    async fn build(
        &self,
        config: &ToolServerConfig,
        lifetime: Option<&Lifetime>,
    ) -> McpResult<ToolConnection> {
        let scope = match lifetime {
            Some(l) if l.is_cancelled() => return Err(McpError::ScopeCancelled),
            Some(l) => l.child(),
            None => CancellationToken::new(),
        };

        let identity = self.options.identity();
        let connect = self.connector.connect(config, &identity, scope.clone());
        match tokio::time::timeout(self.options.connect_timeout, connect).await {
            Ok(Ok(session)) => Ok(ToolConnection::new(config, session)),
            Ok(Err(e)) => {
                scope.cancel();
                Err(e)
            }
            Err(_) => {
                scope.cancel();
                Err(McpError::Timeout(self.options.connect_timeout))
            }
        }
    }
}

impl std::fmt::Debug for McpManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpManager").field("options", &self.options).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryConfigStore;
    use crate::logging::{LogLevel, MemoryLogger, NoOpLogger};
    use crate::mcp::testing::FakeConnector;
    use serde_json::json;

    fn fs_config() -> ToolServerConfig {
        ToolServerConfig::command("fs", "Filesystem", "mcp-fs", vec!["/tmp".into()])
    }

    fn manager(connector: &Arc<FakeConnector>) -> McpManager {
        McpManager::new(connector.clone(), Arc::new(NoOpLogger::new()))
    }

    fn ids(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_initialize_builds_and_caches() {
        let connector = Arc::new(FakeConnector::new());
        let manager = manager(&connector);
        manager.load_configs(vec![fs_config()]).await;
        manager.initialize(Lifetime::new()).await;

        assert_eq!(connector.builds(), 1);
        assert_eq!(manager.connection_count().await, 1);

        let first = manager.get_connections_by_ids(&ids(&["fs"])).await;
        let second = manager.get_connections_by_ids(&ids(&["fs"])).await;
        assert_eq!(first.len(), 1);
        assert!(Arc::ptr_eq(&first[0], &second[0]));
        assert_eq!(connector.builds(), 1);
        assert_eq!(connector.identities()[0], ClientIdentity::default());
    }

    #[tokio::test]
    async fn test_disabled_configs_are_filtered() {
        let connector = Arc::new(FakeConnector::new());
        let manager = manager(&connector);
        manager
            .load_configs(vec![
                ToolServerConfig::streamable_http("a", "A", "http://localhost:1/mcp"),
                ToolServerConfig::streamable_http("b", "B", "http://localhost:2/mcp").disabled(),
            ])
            .await;

        let status = manager.get_all_status().await;
        assert_eq!(status, vec![ServerStatus::unknown("a")]);
        assert!(manager.get_connections_by_ids(&ids(&["b"])).await.is_empty());
    }

    #[tokio::test]
    async fn test_status_makes_no_liveness_claim() {
        let connector = Arc::new(FakeConnector::new());
        let manager = manager(&connector);
        manager
            .load_configs(vec![
                fs_config(),
                ToolServerConfig::streamable_http("web", "Web", "http://localhost:1/mcp"),
            ])
            .await;
        manager.initialize(Lifetime::new()).await;

        let status = manager.get_all_status().await;
        let got: Vec<_> = status.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(got, vec!["fs", "web"]);
        assert!(status.iter().all(|s| !s.connected && s.error.is_empty()));
    }

    #[tokio::test]
    async fn test_empty_load_clears_cache() {
        let connector = Arc::new(FakeConnector::new());
        let manager = manager(&connector);
        manager.load_configs(vec![fs_config()]).await;
        manager.initialize(Lifetime::new()).await;
        assert_eq!(manager.connection_count().await, 1);

        manager.load_configs(vec![]).await;
        assert_eq!(manager.connection_count().await, 0);
        assert!(manager.get_all_connections().await.is_empty());
        assert!(manager.get_all_status().await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_ids_are_skipped_in_order() {
        let connector = Arc::new(FakeConnector::new());
        let manager = manager(&connector);
        manager
            .load_configs(vec![
                fs_config(),
                ToolServerConfig::streamable_http("web", "Web", "http://localhost:1/mcp"),
            ])
            .await;

        assert!(manager.get_connections_by_ids(&ids(&["missing"])).await.is_empty());

        let got = manager.get_connections_by_ids(&ids(&["web", "missing", "fs"])).await;
        let got: Vec<_> = got.iter().map(|c| c.server_id()).collect();
        assert_eq!(got, vec!["web", "fs"]);
    }

    #[tokio::test]
    async fn test_lazy_build_before_initialize() {
        let connector = Arc::new(FakeConnector::new());
        let manager = manager(&connector);
        manager.load_configs(vec![fs_config()]).await;
        assert_eq!(connector.builds(), 0);

        let all = manager.get_all_connections().await;
        assert_eq!(all.len(), 1);
        assert_eq!(connector.builds(), 1);
        assert_eq!(manager.connection_count().await, 1);
    }

    #[tokio::test]
    async fn test_build_failure_is_logged_and_skipped() {
        let connector = Arc::new(FakeConnector::new());
        connector.fail("broken");
        let logger = Arc::new(MemoryLogger::new());
        let manager = McpManager::new(connector.clone(), logger.clone());

        manager
            .load_configs(vec![
                ToolServerConfig::command("broken", "Broken", "nope", vec![]),
                fs_config(),
            ])
            .await;
        manager.initialize(Lifetime::new()).await;

        assert_eq!(manager.connection_count().await, 1);
        assert!(logger.contains(LogLevel::Error, "broken"));

        let all = manager.get_all_connections().await;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].server_id(), "fs");
    }

    #[tokio::test]
    async fn test_reload_invalidates_even_unchanged_ids() {
        let connector = Arc::new(FakeConnector::new());
        let manager = manager(&connector);
        manager.load_configs(vec![fs_config()]).await;
        manager.initialize(Lifetime::new()).await;

        let before = manager.get_connections_by_ids(&ids(&["fs"])).await.remove(0);
        manager.load_configs(vec![fs_config()]).await;
        let after = manager.get_connections_by_ids(&ids(&["fs"])).await.remove(0);

        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(connector.builds(), 2);

        // borrowed handle outlives the cache entry
        assert!(!before.is_closed());
        drop(before);
        assert_eq!(connector.open_sessions(), 1);
    }

    #[tokio::test]
    async fn test_reload_from_store() {
        let connector = Arc::new(FakeConnector::new());
        let manager = manager(&connector);
        let store = MemoryConfigStore::new();
        store.set_tool_servers(vec![fs_config()]);

        manager.reload_from(&store).await.unwrap();
        assert_eq!(manager.get_all_status().await, vec![ServerStatus::unknown("fs")]);
    }

    #[tokio::test]
    async fn test_second_initialize_is_ignored() {
        let connector = Arc::new(FakeConnector::new());
        let logger = Arc::new(MemoryLogger::new());
        let manager = McpManager::new(connector.clone(), logger.clone());
        manager.load_configs(vec![fs_config()]).await;

        let first = Lifetime::new();
        manager.initialize(first.clone()).await;
        let second = Lifetime::new();
        manager.initialize(second.clone()).await;

        assert!(logger.contains(LogLevel::Warn, "more than once"));
        assert_eq!(connector.builds(), 1);

        // the bound scope is still the first one
        second.cancel();
        assert_eq!(manager.get_all_connections().await.len(), 1);
        first.cancel();
        assert!(manager.get_all_connections().await.is_empty());
    }

    #[tokio::test]
    async fn test_scope_cancel_evicts_and_blocks_builds() {
        let connector = Arc::new(FakeConnector::new());
        let manager = manager(&connector);
        manager.load_configs(vec![fs_config()]).await;
        let lifetime = Lifetime::new();
        manager.initialize(lifetime.clone()).await;

        let conn = manager.get_connections_by_ids(&ids(&["fs"])).await.remove(0);
        lifetime.cancel();
        assert!(conn.is_closed());

        assert!(manager.get_connections_by_ids(&ids(&["fs"])).await.is_empty());
        assert_eq!(manager.connection_count().await, 0);

        let err = manager.create_connection(&fs_config()).await.unwrap_err();
        assert!(matches!(err, McpError::ScopeCancelled));
    }

    #[tokio::test]
    async fn test_create_connection_bypasses_cache() {
        let connector = Arc::new(FakeConnector::new());
        let manager = manager(&connector);
        manager.load_configs(vec![fs_config()]).await;

        let conn = manager.create_connection(&fs_config()).await.unwrap();
        assert_eq!(conn.server_name(), "Filesystem");
        assert_eq!(manager.connection_count().await, 0);

        let out = conn.call_tool("read_file", json!({"path": "a"})).await.unwrap();
        assert_eq!(out.text, r#"read_file:{"path":"a"}"#);
    }

    #[tokio::test]
    async fn test_test_connection_missing_config() {
        let connector = Arc::new(FakeConnector::new());
        let manager = manager(&connector);

        let status = manager.test_connection("missing").await;
        assert_eq!(status, ServerStatus::failed("missing", "configuration missing"));
    }

    #[tokio::test]
    async fn test_test_connection_uses_probe_identity_and_skips_cache() {
        let connector = Arc::new(FakeConnector::new());
        let manager = manager(&connector);
        manager.load_configs(vec![fs_config()]).await;

        let status = manager.test_connection("fs").await;
        assert_eq!(status, ServerStatus::connected("fs"));
        assert_eq!(manager.connection_count().await, 0);
        assert_eq!(connector.open_sessions(), 0);
        assert_eq!(connector.identities()[0], ClientIdentity::probe("Filesystem"));
    }

    #[tokio::test]
    async fn test_test_connection_reports_failure() {
        let connector = Arc::new(FakeConnector::new());
        connector.fail("fs");
        let manager = manager(&connector);
        manager.load_configs(vec![fs_config()]).await;

        let status = manager.test_connection("fs").await;
        assert!(!status.connected);
        assert!(status.error.contains("refused"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_test_connection_times_out() {
        let connector = Arc::new(FakeConnector::new());
        connector.hang("fs");
        let manager = manager(&connector);
        manager.load_configs(vec![fs_config()]).await;

        let started = tokio::time::Instant::now();
        let status = manager.test_connection("fs").await;
        assert!(!status.connected);
        assert!(status.error.contains("timed out"));
        assert!(started.elapsed() < PROBE_TIMEOUT + Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_tool_catalog() {
        let connector = Arc::new(FakeConnector::new());
        let manager = manager(&connector);
        manager.load_configs(vec![fs_config()]).await;
        manager.initialize(Lifetime::new()).await;

        let catalog = manager.get_tool_catalog("fs").await.unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog[0].name, "read_file");
        assert_eq!(catalog[0].server_id, "fs");
        assert_eq!(catalog[0].server_name, "Filesystem");

        // fresh session each time, closed afterwards
        assert_eq!(connector.builds(), 2);
        assert_eq!(connector.open_sessions(), 1);
        assert_eq!(connector.identities()[1], ClientIdentity::probe("Filesystem"));

        assert!(manager.get_tool_catalog("missing").await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tool_catalog_errors() {
        let connector = Arc::new(FakeConnector::new());
        connector.fail("broken");
        connector.hang("slow");
        let manager = manager(&connector);
        manager
            .load_configs(vec![
                ToolServerConfig::command("broken", "Broken", "nope", vec![]),
                ToolServerConfig::streamable_http("slow", "Slow", "http://localhost:1/mcp"),
            ])
            .await;

        let err = manager.get_tool_catalog("broken").await.unwrap_err();
        assert!(matches!(err, McpError::Transport(_)));

        let err = manager.get_tool_catalog("slow").await.unwrap_err();
        assert!(matches!(err, McpError::Timeout(d) if d == CATALOG_TIMEOUT));
    }

    #[tokio::test]
    async fn test_tool_catalogs_drop_failures() {
        let connector = Arc::new(FakeConnector::new());
        connector.fail("broken");
        let logger = Arc::new(MemoryLogger::new());
        let manager = McpManager::new(connector.clone(), logger.clone());
        manager
            .load_configs(vec![
                ToolServerConfig::streamable_http("web", "Web", "http://localhost:1/mcp"),
                ToolServerConfig::command("broken", "Broken", "nope", vec![]),
                fs_config(),
            ])
            .await;

        let tools = manager.get_tool_catalogs(&ids(&["fs", "broken", "missing", "web"])).await;
        let servers: Vec<_> = tools.iter().map(|t| t.server_id.as_str()).collect();
        assert_eq!(servers, vec!["fs", "fs", "web", "web"]);
        assert!(logger.contains(LogLevel::Warn, "broken"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_gets_build_once() {
        let connector = Arc::new(FakeConnector::new());
        let manager = Arc::new(manager(&connector));
        manager.load_configs(vec![fs_config()]).await;

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let manager = manager.clone();
                tokio::spawn(async move { manager.get_connections_by_ids(&ids(&["fs"])).await })
            })
            .collect();

        let mut conns = Vec::new();
        for handle in handles {
            conns.extend(handle.await.unwrap());
        }
        assert_eq!(conns.len(), 16);
        assert!(conns.iter().all(|c| Arc::ptr_eq(c, &conns[0])));
        assert_eq!(connector.builds(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_ids_keep_first() {
        let connector = Arc::new(FakeConnector::new());
        let manager = manager(&connector);
        manager
            .load_configs(vec![
                fs_config(),
                ToolServerConfig::command("fs", "Other", "mcp-other", vec![]),
            ])
            .await;

        let conn = manager.get_all_connections().await.remove(0);
        assert_eq!(conn.server_name(), "Filesystem");
        assert_eq!(manager.get_all_status().await.len(), 1);
    }
}
