//! rmcp-backed connector
//!
//! Opens MCP sessions over a subprocess, Streamable HTTP or legacy SSE. HTTP
//! traffic uses the client from the injected transport.

use std::sync::Arc;

use async_trait::async_trait;
use rmcp::{
    model::{CallToolRequestParam, CallToolResult, ClientInfo, Implementation, RawContent, Tool},
    service::RunningService,
    transport::{
        sse_client::SseClientConfig, streamable_http_client::StreamableHttpClientTransportConfig,
        ConfigureCommandExt, IntoTransport, SseClientTransport, StreamableHttpClientTransport,
        TokioChildProcess,
    },
    RoleClient, ServiceExt,
};
use serde_json::Value;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use super::error::{McpError, McpResult};
use super::session::{
    ClientIdentity, Connector, ServerIdentity, ToolDescriptor, ToolOutput, ToolSession,
};
use crate::logging::Logger;
use crate::transport::TransportProvider;
use crate::types::{ToolServerConfig, TransportType};
use crate::{log_debug, log_warn};

type Service = RunningService<RoleClient, ClientInfo>;

fn client_info(identity: &ClientIdentity) -> ClientInfo {
    ClientInfo {
        client_info: Implementation {
            name: identity.name.clone(),
            version: identity.version.clone(),
            ..Default::default()
        },
        ..Default::default()
    }
}

impl From<Tool> for ToolDescriptor {
    fn from(tool: Tool) -> Self {
        Self {
            name: tool.name.to_string(),
            description: tool.description.map(|d| d.to_string()).unwrap_or_default(),
            input_schema: Value::Object(tool.input_schema.as_ref().clone()),
        }
    }
}

impl From<CallToolResult> for ToolOutput {
    fn from(result: CallToolResult) -> Self {
        let text = result
            .content
            .iter()
            .filter_map(|c| match &c.raw {
                RawContent::Text(t) => Some(t.text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n");
        Self {
            text,
            is_error: result.is_error.unwrap_or(false),
            content: serde_json::to_value(&result.content).unwrap_or(Value::Null),
        }
    }
}

/// Session over a running rmcp client service
pub struct RmcpSession {
    service: Service,
    token: CancellationToken,
}

impl RmcpSession {
    /// Run the MCP handshake over `transport`
    ///
    /// The session ends when `token` is cancelled or the transport closes.
    pub async fn start<T, E, A>(
        transport: T,
        identity: &ClientIdentity,
        token: CancellationToken,
    ) -> McpResult<Self>
    where
        T: IntoTransport<RoleClient, E, A>,
        E: std::error::Error + Send + Sync + 'static,
    {
        let service = client_info(identity)
            .serve_with_ct(transport, token.clone())
            .await
            .map_err(|e| McpError::InitializationFailed(e.to_string()))?;
        Ok(Self { service, token })
    }
}

#[async_trait]
impl ToolSession for RmcpSession {
    async fn list_tools(&self) -> McpResult<Vec<ToolDescriptor>> {
        if self.is_closed() {
            return Err(McpError::Closed);
        }
        let tools = self
            .service
            .list_all_tools()
            .await
            .map_err(|e| McpError::Protocol(e.to_string()))?;
        Ok(tools.into_iter().map(ToolDescriptor::from).collect())
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> McpResult<ToolOutput> {
        if self.is_closed() {
            return Err(McpError::Closed);
        }
        let arguments = match arguments {
            Value::Object(map) => Some(map),
            Value::Null => None,
            other => {
                return Err(McpError::ToolCallFailed(format!(
                    "arguments for '{}' must be a JSON object, got {}",
                    name, other
                )))
            }
        };
        let result = self
            .service
            .call_tool(CallToolRequestParam {
                name: name.to_owned().into(),
                arguments,
            })
            .await
            .map_err(|e| McpError::ToolCallFailed(e.to_string()))?;
        Ok(result.into())
    }

    fn server_info(&self) -> Option<ServerIdentity> {
        self.service.peer_info().map(|info| ServerIdentity {
            name: info.server_info.name.clone(),
            version: info.server_info.version.clone(),
        })
    }

    fn is_closed(&self) -> bool {
        self.token.is_cancelled() || self.service.is_transport_closed()
    }

    fn close(&self) {
        self.token.cancel();
    }
}

/// Connector speaking MCP through rmcp
pub struct RmcpConnector {
    transport: Arc<dyn TransportProvider>,
    logger: Arc<dyn Logger>,
}

impl RmcpConnector {
    pub fn new(transport: Arc<dyn TransportProvider>, logger: Arc<dyn Logger>) -> Self {
        Self { transport, logger }
    }

    fn endpoint<'a>(config: &'a ToolServerConfig) -> McpResult<&'a str> {
        let endpoint = config.endpoint.trim();
        if endpoint.is_empty() {
            return Err(McpError::invalid_config(&config.id, "endpoint is required"));
        }
        Ok(endpoint)
    }

    async fn open(
        &self,
        config: &ToolServerConfig,
        identity: &ClientIdentity,
        token: CancellationToken,
    ) -> McpResult<RmcpSession> {
        match config.transport_type {
            TransportType::Command => {
                let program = config.command.trim();
                if program.is_empty() {
                    return Err(McpError::invalid_config(&config.id, "command is required"));
                }
                let transport = TokioChildProcess::new(Command::new(program).configure(|cmd| {
                    cmd.args(&config.args).stderr(std::process::Stdio::null());
                }))
                .map_err(|e| McpError::Transport(format!("spawn '{}': {}", program, e)))?;
                RmcpSession::start(transport, identity, token).await
            }
            TransportType::StreamableHttp => {
                let endpoint = Self::endpoint(config)?;
                let transport = StreamableHttpClientTransport::with_client(
                    self.transport.http_client(),
                    StreamableHttpClientTransportConfig::with_uri(endpoint.to_string()),
                );
                RmcpSession::start(transport, identity, token).await
            }
            TransportType::Sse => {
                log_warn!(
                    self.logger,
                    "[McpConnector] server '{}' uses the deprecated SSE transport; \
                     migrate to streamable-http",
                    config.id
                );
                let endpoint = Self::endpoint(config)?;
                let sse_config = SseClientConfig {
                    sse_endpoint: endpoint.into(),
                    ..Default::default()
                };
                let http = self.transport.http_client();
                let transport = SseClientTransport::start_with_client(http, sse_config)
                    .await
                    .map_err(|e| McpError::Transport(e.to_string()))?;
                RmcpSession::start(transport, identity, token).await
            }
        }
    }
}

#[async_trait]
impl Connector for RmcpConnector {
    async fn connect(
        &self,
        config: &ToolServerConfig,
        identity: &ClientIdentity,
        scope: CancellationToken,
    ) -> McpResult<Box<dyn ToolSession>> {
        if scope.is_cancelled() {
            return Err(McpError::ScopeCancelled);
        }
        log_debug!(
            self.logger,
            "[McpConnector] connecting to '{}' over {}",
            config.id,
            config.transport_type
        );

        let session = self.open(config, identity, scope.child_token()).await?;
        Ok(Box::new(session))
    }
}
