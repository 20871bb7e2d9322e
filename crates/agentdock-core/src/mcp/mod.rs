//! MCP (Model Context Protocol) tool connections
//!
//! [`McpManager`] owns the enabled tool-server configs and caches one live
//! [`ToolConnection`] per id. Sessions are opened through a [`Connector`];
//! [`RmcpConnector`] speaks MCP via the official rmcp SDK over subprocess,
//! Streamable HTTP and (deprecated) SSE transports.
//!
//! # Example
//!
//! ```rust,ignore
//! use agentdock_core::mcp::McpManager;
//! use agentdock_core::types::{Lifetime, ToolServerConfig};
//!
//! let manager = McpManager::with_transport(transport, logger);
//! manager.load_configs(vec![
//!     ToolServerConfig::command("fs", "Filesystem", "mcp-fs", vec!["/tmp".into()]),
//! ]).await;
//! manager.initialize(Lifetime::new()).await;
//!
//! let conns = manager.get_connections_by_ids(&["fs".to_string()]).await;
//! let tools = conns[0].list_tools().await?;
//! ```

mod error;
mod session;
mod status;
mod rmcp_connector;
mod connection;
mod manager;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{McpError, McpResult};
pub use session::{
    ClientIdentity, Connector, ServerIdentity, ToolDescriptor, ToolOutput, ToolSession,
    PROBE_CLIENT_VERSION,
};
pub use status::{ServerStatus, ToolInfo};
pub use rmcp_connector::{RmcpConnector, RmcpSession};
pub use connection::ToolConnection;
pub use manager::{
    ManagerOptions, McpManager, CATALOG_TIMEOUT, CONFIGURATION_MISSING, CONNECT_TIMEOUT,
    PROBE_TIMEOUT,
};
