//! Shared types
//!
//! Messages and tool types consumed by generation clients, plus the
//! configuration records for providers and tool servers.

mod message;
mod model;
mod server;
mod tool;
mod stream;
mod lifetime;

pub use message::{ChatMessage, ContentPart, MessageRole, MessageContent};
pub use model::{ProviderConfig, ProviderKind};
pub use server::{ToolServerConfig, TransportType};
pub use tool::{Tool, ToolCall, ToolResult, ToolChoice};
pub use stream::StreamChunk;
pub use lifetime::Lifetime;
