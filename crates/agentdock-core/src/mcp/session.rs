//! Connection seams
//!
//! The manager never talks to a transport directly: a [`Connector`] opens a
//! [`ToolSession`] for one config. The rmcp-backed pair lives in
//! `rmcp_connector`; tests plug in their own.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::error::McpResult;
use crate::types::{Tool, ToolServerConfig};

/// Version reported by connectivity probes
pub const PROBE_CLIENT_VERSION: &str = "1.0.0";

/// Implementation name/version sent in the MCP handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    pub name: String,
    pub version: String,
}

impl ClientIdentity {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Identity used when probing: the server's own name, fixed version
    pub fn probe(server_name: &str) -> Self {
        Self::new(server_name, PROBE_CLIENT_VERSION)
    }
}

impl Default for ClientIdentity {
    fn default() -> Self {
        Self::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
    }
}

/// What the server said about itself during the handshake
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerIdentity {
    pub name: String,
    pub version: String,
}

/// A tool as advertised by a server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub input_schema: Value,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: serde_json::json!({ "type": "object", "properties": {} }),
        }
    }

    /// Declaration to offer a generation model
    pub fn to_tool(&self) -> Tool {
        Tool::new(self.name.clone(), self.description.clone())
            .with_schema(self.input_schema.clone())
    }
}

/// Result of one tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolOutput {
    /// Text parts joined by newlines
    pub text: String,
    /// Server flagged the call as failed
    #[serde(default)]
    pub is_error: bool,
    /// Content items as the server sent them
    #[serde(default)]
    pub content: Value,
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            content: serde_json::json!([{ "type": "text", "text": text }]),
            text,
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::text(text)
        }
    }
}

/// One live session with a tool server
#[async_trait]
pub trait ToolSession: Send + Sync {
    async fn list_tools(&self) -> McpResult<Vec<ToolDescriptor>>;

    async fn call_tool(&self, name: &str, arguments: Value) -> McpResult<ToolOutput>;

    fn server_info(&self) -> Option<ServerIdentity>;

    /// Session has ended, by `close`, scope cancellation or transport loss
    fn is_closed(&self) -> bool;

    /// End the session now; idempotent
    fn close(&self);
}

/// Opens sessions for tool-server configs
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a session that ends when `scope` is cancelled
    async fn connect(
        &self,
        config: &ToolServerConfig,
        identity: &ClientIdentity,
        scope: CancellationToken,
    ) -> McpResult<Box<dyn ToolSession>>;
}
