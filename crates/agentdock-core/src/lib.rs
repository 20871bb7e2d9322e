//! AgentDock Core
//!
//! Runtime-agnostic plumbing between an agent runtime and the outside world:
//! a model factory that turns provider-tagged configs into one uniform
//! generation client, and a manager that keeps live connections to MCP tool
//! servers. Logging, configuration and the HTTP transport are injected.
//!
//! ```rust,ignore
//! use agentdock_core::{McpManager, ModelFactory, Lifetime};
//!
//! let factory = ModelFactory::new(transport.clone(), logger.clone());
//! let model = factory.build_client(&provider_config).await?;
//!
//! let manager = McpManager::with_transport(transport, logger);
//! manager.load_configs(store.tool_servers().await?).await;
//! manager.initialize(Lifetime::new()).await;
//! ```

pub mod types;
pub mod logging;
pub mod config;
pub mod transport;
pub mod providers;
pub mod mcp;

// Re-export commonly used types
pub use types::{
    ChatMessage, ContentPart, MessageRole, MessageContent,
    ProviderConfig, ProviderKind, ToolServerConfig, TransportType,
    Tool, ToolCall, ToolResult, ToolChoice,
    StreamChunk,
    Lifetime,
};

pub use logging::{Logger, NoOpLogger, ConsoleLogger, MemoryLogger};

pub use config::{ConfigStore, ConfigError, MemoryConfigStore, FileConfigStore};

pub use transport::{TransportProvider, StaticTransport, ProxyTransport, ProxySettings};

pub use providers::{GenerativeModel, GenerateRequest, ModelFactory, ProviderError, ProviderResult};

pub use mcp::{McpManager, McpError, McpResult, ToolConnection, ServerStatus, ToolInfo};
