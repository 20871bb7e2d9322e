//! Live handle to one tool server

use serde_json::Value;

use super::error::McpResult;
use super::session::{ServerIdentity, ToolDescriptor, ToolOutput, ToolSession};
use crate::types::{ToolCall, ToolResult, ToolServerConfig, TransportType};

/// Connection bound to one tool-server config id
///
/// Handed out as `Arc<ToolConnection>`. The session ends when the last
/// handle is dropped, when `close` is called, or when the manager's
/// lifetime scope is cancelled.
pub struct ToolConnection {
    server_id: String,
    server_name: String,
    transport_type: TransportType,
    session: Box<dyn ToolSession>,
}

impl ToolConnection {
    pub fn new(config: &ToolServerConfig, session: Box<dyn ToolSession>) -> Self {
        Self {
            server_id: config.id.clone(),
            server_name: config.name.clone(),
            transport_type: config.transport_type,
            session,
        }
    }

    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    pub fn transport_type(&self) -> TransportType {
        self.transport_type
    }

    pub async fn list_tools(&self) -> McpResult<Vec<ToolDescriptor>> {
        self.session.list_tools().await
    }

    pub async fn call_tool(&self, name: &str, arguments: Value) -> McpResult<ToolOutput> {
        self.session.call_tool(name, arguments).await
    }

    /// Run a model-requested call; failures come back as error results
    pub async fn execute(&self, call: &ToolCall) -> ToolResult {
        match self.call_tool(&call.name, call.input.clone()).await {
            Ok(output) if output.is_error => ToolResult::error(&call.id, output.text),
            Ok(output) => ToolResult::success(&call.id, output.text),
            Err(e) => ToolResult::error(&call.id, e.to_string()),
        }
    }

    pub fn server_info(&self) -> Option<ServerIdentity> {
        self.session.server_info()
    }

    pub fn is_closed(&self) -> bool {
        self.session.is_closed()
    }

    pub fn close(&self) {
        self.session.close();
    }
}

impl Drop for ToolConnection {
    fn drop(&mut self) {
        self.session.close();
    }
}

impl std::fmt::Debug for ToolConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolConnection")
            .field("server_id", &self.server_id)
            .field("transport_type", &self.transport_type)
            .field("closed", &self.is_closed())
            .finish()
    }
}
