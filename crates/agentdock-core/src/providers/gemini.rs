//! Gemini `generateContent` client, used for both Gemini API and Vertex AI
//!
//! The two differ only in base URL and in how requests are authenticated.

use std::collections::HashMap;

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use super::auth::AuthenticatedTransport;
use super::error::{ProviderError, ProviderResult};
use super::http::{complete, ensure_success, into_response, sse_data};
use super::traits::{GenerateOptions, GenerateRequest, GenerativeModel, StreamResponse};
use crate::types::{
    ChatMessage, ContentPart, MessageRole, ProviderKind, StreamChunk, ToolCall, ToolChoice,
};

/// Gemini API base
pub const GEMINI_DEFAULT_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Vertex AI location used when a config names none
pub const VERTEX_DEFAULT_LOCATION: &str = "us-central1";

/// Publisher base for a Vertex project/location
pub fn vertex_base_url(project: &str, location: &str) -> String {
    let host = if location == "global" {
        "aiplatform.googleapis.com".to_string()
    } else {
        format!("{}-aiplatform.googleapis.com", location)
    };
    format!(
        "https://{}/v1/projects/{}/locations/{}/publishers/google",
        host, project, location
    )
}

pub struct GeminiClient {
    kind: ProviderKind,
    transport: AuthenticatedTransport,
    base_url: String,
    model: String,
}

impl GeminiClient {
    /// Gemini API client; an empty `base_url` selects the public endpoint
    pub fn gemini(
        transport: AuthenticatedTransport,
        base_url: &str,
        model: impl Into<String>,
    ) -> Self {
        let base = base_url.trim().trim_end_matches('/');
        Self {
            kind: ProviderKind::Gemini,
            transport,
            base_url: if base.is_empty() {
                GEMINI_DEFAULT_BASE.to_string()
            } else {
                base.to_string()
            },
            model: model.into(),
        }
    }

    /// Vertex AI client scoped to one project and location
    pub fn vertex(
        transport: AuthenticatedTransport,
        base_url: String,
        model: impl Into<String>,
    ) -> Self {
        Self {
            kind: ProviderKind::Vertex,
            transport,
            base_url,
            model: model.into(),
        }
    }

    fn provider(&self) -> &'static str {
        match self.kind {
            ProviderKind::Vertex => "vertex",
            _ => "gemini",
        }
    }

    fn url(&self, stream: bool) -> String {
        if stream {
            format!("{}/models/{}:streamGenerateContent?alt=sse", self.base_url, self.model)
        } else {
            format!("{}/models/{}:generateContent", self.base_url, self.model)
        }
    }
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("kind", &self.kind)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> &str {
        &self.base_url
    }

    async fn generate(
        &self,
        request: GenerateRequest,
        stream: bool,
        cancel: CancellationToken,
    ) -> ProviderResult<StreamResponse> {
        let url = self.url(stream);
        let body = request_body(&request.messages, &request.options);
        let provider = self.provider();

        let send = async {
            let response = self.transport.post(&url).await?.json(&body).send().await?;
            ensure_success(provider, response).await
        };
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(ProviderError::Cancelled),
            response = send => response?,
        };

        if !stream {
            let value: Value = response.json().await?;
            return Ok(complete(response_chunks(&value)?));
        }

        let batches = sse_data(response).map(|data| {
            data.and_then(|data| {
                let value: Value = serde_json::from_str(&data)?;
                response_chunks(&value)
            })
        });
        Ok(into_response(batches, cancel))
    }
}

fn request_body(messages: &[ChatMessage], options: &GenerateOptions) -> Value {
    // functionResponse parts are keyed by function name, not call id
    let mut call_names: HashMap<&str, &str> = HashMap::new();
    let mut system = Vec::new();
    let mut contents = Vec::new();

    for message in messages {
        if message.role == MessageRole::System {
            system.push(message.joined_text());
            continue;
        }
        let role = if message.role == MessageRole::Assistant { "model" } else { "user" };

        let parts: Vec<Value> = match message.text() {
            Some(text) => vec![json!({ "text": text })],
            None => message
                .parts()
                .iter()
                .map(|part| match part {
                    ContentPart::Text { text } => json!({ "text": text }),
                    ContentPart::ToolUse { id, name, input } => {
                        call_names.insert(id.as_str(), name.as_str());
                        json!({ "functionCall": { "name": name, "args": input } })
                    }
                    ContentPart::ToolResult { tool_use_id, content } => {
                        let name = call_names
                            .get(tool_use_id.as_str())
                            .copied()
                            .unwrap_or(tool_use_id.as_str());
                        json!({
                            "functionResponse": {
                                "name": name,
                                "response": { "content": content },
                            }
                        })
                    }
                })
                .collect(),
        };
        contents.push(json!({ "role": role, "parts": parts }));
    }

    let mut body = json!({ "contents": contents });
    if !system.is_empty() {
        body["systemInstruction"] = json!({ "parts": [{ "text": system.join("\n") }] });
    }

    let mut generation = serde_json::Map::new();
    if let Some(max_tokens) = options.max_tokens {
        generation.insert("maxOutputTokens".into(), json!(max_tokens));
    }
    if let Some(temperature) = options.temperature {
        generation.insert("temperature".into(), json!(temperature));
    }
    if let Some(stop) = &options.stop {
        generation.insert("stopSequences".into(), json!(stop));
    }
    if !generation.is_empty() {
        body["generationConfig"] = Value::Object(generation);
    }

    if !options.tool_list().is_empty() {
        let declarations: Vec<Value> = options
            .tool_list()
            .iter()
            .map(|t| {
                json!({
                    "name": t.name,
                    "description": t.description,
                    "parameters": t.parameters(),
                })
            })
            .collect();
        body["tools"] = json!([{ "functionDeclarations": declarations }]);
        if let Some(choice) = options.tool_choice {
            let mode = match choice {
                ToolChoice::Auto => "AUTO",
                ToolChoice::None => "NONE",
                ToolChoice::Required => "ANY",
            };
            body["toolConfig"] = json!({ "functionCallingConfig": { "mode": mode } });
        }
    }
    body
}

/// Chunks from one `GenerateContentResponse`
///
/// Gemini has no call ids; the function name doubles as the id.
fn response_chunks(value: &Value) -> ProviderResult<Vec<StreamChunk>> {
    if let Some(message) = value["error"]["message"].as_str() {
        return Err(ProviderError::Stream(message.to_string()));
    }

    let mut chunks = Vec::new();
    let parts = value["candidates"][0]["content"]["parts"].as_array();
    for part in parts.into_iter().flatten() {
        if let Some(text) = part["text"].as_str().filter(|t| !t.is_empty()) {
            chunks.push(StreamChunk::text(text));
        } else if let Some(name) = part["functionCall"]["name"].as_str() {
            let args = part["functionCall"]
                .get("args")
                .cloned()
                .unwrap_or_else(|| json!({}));
            chunks.push(StreamChunk::tool_call(ToolCall::new(name, name, args)));
        }
    }
    Ok(chunks)
}
