//! Serializable records handed to the presentation layer

use serde::{Deserialize, Serialize};

/// Connectivity of one configured server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStatus {
    pub id: String,
    pub connected: bool,
    pub error: String,
}

impl ServerStatus {
    /// No liveness claim either way
    pub fn unknown(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            connected: false,
            error: String::new(),
        }
    }

    pub fn connected(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            connected: true,
            error: String::new(),
        }
    }

    pub fn failed(id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            connected: false,
            error: error.into(),
        }
    }
}

/// One tool in a server's catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub server_id: String,
    pub server_name: String,
}
