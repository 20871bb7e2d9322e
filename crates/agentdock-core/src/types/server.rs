//! Tool server configuration types

use serde::{Deserialize, Serialize};

/// How a tool server is reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransportType {
    /// Streamable HTTP endpoint
    StreamableHttp,
    /// Local subprocess speaking over stdio
    Command,
    /// Legacy server-sent events endpoint (deprecated)
    Sse,
}

impl std::fmt::Display for TransportType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportType::StreamableHttp => write!(f, "streamable-http"),
            TransportType::Command => write!(f, "command"),
            TransportType::Sse => write!(f, "sse"),
        }
    }
}

/// Configuration for one tool server
///
/// Supplied wholesale through `McpManager::load_configs`, never patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolServerConfig {
    /// Unique identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Transport kind
    pub transport_type: TransportType,
    /// Endpoint URL (streamable-http and sse)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub endpoint: String,
    /// Executable (command)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub command: String,
    /// Executable arguments (command)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// Whether this server participates in the manager (default: true)
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl ToolServerConfig {
    /// A subprocess server
    pub fn command(
        id: impl Into<String>,
        name: impl Into<String>,
        command: impl Into<String>,
        args: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            transport_type: TransportType::Command,
            endpoint: String::new(),
            command: command.into(),
            args,
            enabled: true,
        }
    }

    /// A streamable HTTP server
    pub fn streamable_http(
        id: impl Into<String>,
        name: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            transport_type: TransportType::StreamableHttp,
            endpoint: endpoint.into(),
            command: String::new(),
            args: vec![],
            enabled: true,
        }
    }

    /// A legacy SSE server
    pub fn sse(
        id: impl Into<String>,
        name: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            transport_type: TransportType::Sse,
            ..Self::streamable_http(id, name, endpoint)
        }
    }

    /// Disable the server
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}
