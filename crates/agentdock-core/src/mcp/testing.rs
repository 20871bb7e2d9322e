//! In-process connector for tests

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::error::{McpError, McpResult};
use super::session::{
    ClientIdentity, Connector, ServerIdentity, ToolDescriptor, ToolOutput, ToolSession,
};
use crate::types::ToolServerConfig;

#[derive(Default)]
pub(crate) struct FakeConnector {
    builds: AtomicUsize,
    failing: Mutex<HashSet<String>>,
    hanging: Mutex<HashSet<String>>,
    identities: Mutex<Vec<ClientIdentity>>,
    sessions: Mutex<Vec<CancellationToken>>,
}

impl FakeConnector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn fail(&self, id: &str) {
        self.failing.lock().insert(id.to_string());
    }

    pub(crate) fn hang(&self, id: &str) {
        self.hanging.lock().insert(id.to_string());
    }

    /// Sessions opened successfully
    pub(crate) fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    pub(crate) fn identities(&self) -> Vec<ClientIdentity> {
        self.identities.lock().clone()
    }

    /// Sessions whose token is still live
    pub(crate) fn open_sessions(&self) -> usize {
        self.sessions.lock().iter().filter(|t| !t.is_cancelled()).count()
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(
        &self,
        config: &ToolServerConfig,
        identity: &ClientIdentity,
        scope: CancellationToken,
    ) -> McpResult<Box<dyn ToolSession>> {
        self.identities.lock().push(identity.clone());
        if scope.is_cancelled() {
            return Err(McpError::ScopeCancelled);
        }
        if self.hanging.lock().contains(&config.id) {
            std::future::pending::<()>().await;
        }
        if self.failing.lock().contains(&config.id) {
            return Err(McpError::Transport(format!("{} refused connection", config.id)));
        }

        self.builds.fetch_add(1, Ordering::SeqCst);
        let token = scope.child_token();
        self.sessions.lock().push(token.clone());
        Ok(Box::new(FakeSession {
            token,
            server: config.name.clone(),
        }))
    }
}

pub(crate) struct FakeSession {
    token: CancellationToken,
    server: String,
}

#[async_trait]
impl ToolSession for FakeSession {
    async fn list_tools(&self) -> McpResult<Vec<ToolDescriptor>> {
        if self.is_closed() {
            return Err(McpError::Closed);
        }
        Ok(vec![
            ToolDescriptor::new("read_file", "Read a file"),
            ToolDescriptor::new("write_file", "Write a file"),
        ])
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> McpResult<ToolOutput> {
        if self.is_closed() {
            return Err(McpError::Closed);
        }
        if name == "fail" {
            return Ok(ToolOutput::error("tool failed"));
        }
        Ok(ToolOutput::text(format!("{}:{}", name, arguments)))
    }

    fn server_info(&self) -> Option<ServerIdentity> {
        Some(ServerIdentity {
            name: self.server.clone(),
            version: "0.0.1".into(),
        })
    }

    fn is_closed(&self) -> bool {
        self.token.is_cancelled()
    }

    fn close(&self) {
        self.token.cancel();
    }
}
