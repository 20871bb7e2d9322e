//! OpenAI Chat Completions client
//!
//! Also hosts the helpers shared with the Responses client: base URL
//! normalization and the raw connectivity probe.

use std::collections::BTreeMap;

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use super::auth::AuthenticatedTransport;
use super::error::{ProviderError, ProviderResult};
use super::http::{complete, ensure_success, into_response, read_error_body, sse_data};
use super::traits::{GenerateRequest, GenerativeModel, StreamResponse};
use crate::types::{ChatMessage, ContentPart, MessageRole, ProviderKind, StreamChunk, ToolCall};

/// Canonical OpenAI API base
pub const OPENAI_DEFAULT_BASE: &str = "https://api.openai.com/v1";

const PROVIDER: &str = "openai";

/// Normalize a configured base URL
///
/// Empty becomes [`OPENAI_DEFAULT_BASE`]. Otherwise trailing slashes are
/// trimmed and `/v1` is appended only when the path does not already end in
/// it. Applying this twice gives the same result.
pub fn normalize_base_url(base: &str) -> String {
    let trimmed = base.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return OPENAI_DEFAULT_BASE.to_string();
    }
    if trimmed.ends_with("/v1") {
        trimmed.to_string()
    } else {
        format!("{}/v1", trimmed)
    }
}

/// Minimal real request against `{base}/chat/completions`
///
/// Success means HTTP 200. Anything else becomes `HTTP {status}: {body}`
/// with at most 512 bytes of body.
pub(crate) async fn probe_chat_completions(
    http: &reqwest::Client,
    base_url: &str,
    api_key: &str,
    model: &str,
) -> ProviderResult<()> {
    let url = format!("{}/chat/completions", normalize_base_url(base_url));
    let body = json!({
        "model": model,
        "max_tokens": 1,
        "messages": [{ "role": "user", "content": "hi" }],
    });

    let mut request = http.post(&url).json(&body);
    if !api_key.is_empty() {
        request = request.bearer_auth(api_key);
    }
    let response = request.send().await?;

    let status = response.status();
    if status == reqwest::StatusCode::OK {
        return Ok(());
    }
    Err(ProviderError::HttpStatus {
        status: status.as_u16(),
        body: read_error_body(response).await,
    })
}

/// Parse tool arguments; malformed JSON is kept as a string
pub(crate) fn parse_arguments(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return json!({});
    }
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Client for `{base}/chat/completions`
pub struct OpenAiChatClient {
    transport: AuthenticatedTransport,
    base_url: String,
    model: String,
}

impl OpenAiChatClient {
    pub fn new(
        transport: AuthenticatedTransport,
        base_url: &str,
        model: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            base_url: normalize_base_url(base_url),
            model: model.into(),
        }
    }

    fn request_body(&self, request: &GenerateRequest, stream: bool) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": convert_messages(&request.messages),
            "stream": stream,
        });

        let options = &request.options;
        if let Some(max_tokens) = options.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        if let Some(temperature) = options.temperature {
            body["temperature"] = json!(temperature);
        }
        if let Some(stop) = &options.stop {
            body["stop"] = json!(stop);
        }
        if !options.tool_list().is_empty() {
            let tools: Vec<Value> = options
                .tool_list()
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters(),
                        }
                    })
                })
                .collect();
            body["tools"] = json!(tools);
            if let Some(choice) = options.tool_choice {
                body["tool_choice"] = json!(choice.as_str());
            }
        }
        body
    }
}

impl std::fmt::Debug for OpenAiChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiChatClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

#[async_trait]
impl GenerativeModel for OpenAiChatClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAiChat
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
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.request_body(&request, stream);

        let send = async {
            let response = self.transport.post(&url).await?.json(&body).send().await?;
            ensure_success(PROVIDER, response).await
        };
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(ProviderError::Cancelled),
            response = send => response?,
        };

        if !stream {
            let completion: Completion = response.json().await?;
            return Ok(complete(completion.into_chunks()?));
        }

        let batches = sse_data(response).scan(ToolCallAccumulator::default(), |acc, data| {
            let batch = data.and_then(|data| acc.accept(&data));
            futures::future::ready(Some(batch))
        });
        Ok(into_response(batches, cancel))
    }
}

/// Chat Completions message list
///
/// Tool results become `tool` messages; tool uses ride on the assistant
/// message as `tool_calls`.
fn convert_messages(messages: &[ChatMessage]) -> Vec<Value> {
    let mut out = Vec::with_capacity(messages.len());
    for message in messages {
        let text = message.joined_text();
        match message.role {
            MessageRole::System => out.push(json!({ "role": "system", "content": text })),
            MessageRole::User => {
                for part in message.parts() {
                    if let ContentPart::ToolResult { tool_use_id, content } = part {
                        out.push(json!({
                            "role": "tool",
                            "tool_call_id": tool_use_id,
                            "content": content,
                        }));
                    }
                }
                if !text.is_empty() || message.parts().is_empty() {
                    out.push(json!({ "role": "user", "content": text }));
                }
            }
            MessageRole::Assistant => {
                let tool_calls: Vec<Value> = message
                    .parts()
                    .iter()
                    .filter_map(|part| match part {
                        ContentPart::ToolUse { id, name, input } => Some(json!({
                            "id": id,
                            "type": "function",
                            "function": { "name": name, "arguments": input.to_string() },
                        })),
                        _ => None,
                    })
                    .collect();
                let mut entry = json!({ "role": "assistant", "content": text });
                if !tool_calls.is_empty() {
                    if text.is_empty() {
                        entry["content"] = Value::Null;
                    }
                    entry["tool_calls"] = json!(tool_calls);
                }
                out.push(entry);
            }
        }
    }
    out
}

#[derive(Debug, Deserialize)]
struct Completion {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<CompletionToolCall>,
}

#[derive(Debug, Deserialize)]
struct CompletionToolCall {
    id: String,
    function: FunctionCall,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

impl Completion {
    fn into_chunks(self) -> ProviderResult<Vec<StreamChunk>> {
        let choice = self
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::invalid_response(PROVIDER, "no choices in response"))?;

        let mut chunks = Vec::new();
        if let Some(text) = choice.message.content.filter(|t| !t.is_empty()) {
            chunks.push(StreamChunk::text(text));
        }
        for call in choice.message.tool_calls {
            chunks.push(StreamChunk::tool_call(ToolCall::new(
                call.id,
                call.function.name,
                parse_arguments(&call.function.arguments),
            )));
        }
        Ok(chunks)
    }
}

#[derive(Debug, Deserialize)]
struct ChunkEvent {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCallFragment>,
}

#[derive(Debug, Deserialize)]
struct ToolCallFragment {
    #[serde(default)]
    index: u32,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<FunctionFragment>,
}

#[derive(Debug, Deserialize)]
struct FunctionFragment {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Default)]
struct PartialCall {
    id: String,
    name: String,
    arguments: String,
}

/// Stitches streamed tool-call fragments back into whole calls
#[derive(Debug, Default)]
struct ToolCallAccumulator {
    calls: BTreeMap<u32, PartialCall>,
}

impl ToolCallAccumulator {
    fn accept(&mut self, data: &str) -> ProviderResult<Vec<StreamChunk>> {
        let event: ChunkEvent = serde_json::from_str(data)?;
        if let Some(error) = event.error {
            return Err(ProviderError::Stream(error.message));
        }

        let mut chunks = Vec::new();
        for choice in event.choices {
            if let Some(text) = choice.delta.content.filter(|t| !t.is_empty()) {
                chunks.push(StreamChunk::text(text));
            }
            for fragment in choice.delta.tool_calls {
                let call = self.calls.entry(fragment.index).or_default();
                if let Some(id) = fragment.id {
                    call.id = id;
                }
                let (name, arguments) = match fragment.function {
                    Some(f) => (f.name, f.arguments),
                    None => (None, None),
                };
                if let Some(name) = &name {
                    call.name.push_str(name);
                }
                if let Some(arguments) = &arguments {
                    call.arguments.push_str(arguments);
                }
                chunks.push(StreamChunk::ToolCallDelta {
                    id: call.id.clone(),
                    name,
                    input_delta: arguments,
                });
            }
            if choice.finish_reason.is_some() {
                chunks.extend(self.flush());
            }
        }
        Ok(chunks)
    }

    fn flush(&mut self) -> Vec<StreamChunk> {
        std::mem::take(&mut self.calls)
            .into_values()
            .map(|c| {
                let input = parse_arguments(&c.arguments);
                StreamChunk::tool_call(ToolCall::new(c.id, c.name, input))
            })
            .collect()
    }
}
