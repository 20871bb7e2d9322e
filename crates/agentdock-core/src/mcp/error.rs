//! MCP error types

use std::time::Duration;

use thiserror::Error;

/// Errors from tool-server connections and the manager
#[derive(Error, Debug)]
pub enum McpError {
    /// Config cannot describe a reachable server
    #[error("invalid tool server config '{id}': {message}")]
    InvalidConfig { id: String, message: String },

    /// Transport could not be created (spawn failure, bad URL, ...)
    #[error("transport error: {0}")]
    Transport(String),

    /// MCP handshake failed
    #[error("initialization failed: {0}")]
    InitializationFailed(String),

    #[error("tool call failed: {0}")]
    ToolCallFailed(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    /// Deadline exceeded
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The manager's lifetime scope has ended
    #[error("lifetime scope cancelled")]
    ScopeCancelled,

    /// Session already ended
    #[error("connection closed")]
    Closed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl McpError {
    pub fn invalid_config(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            id: id.into(),
            message: message.into(),
        }
    }
}

pub type McpResult<T> = Result<T, McpError>;
