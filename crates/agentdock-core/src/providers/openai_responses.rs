//! OpenAI Responses API client (`{base}/responses`)

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use super::auth::AuthenticatedTransport;
use super::error::{ProviderError, ProviderResult};
use super::http::{complete, ensure_success, into_response, sse_data};
use super::openai::{normalize_base_url, parse_arguments};
use super::traits::{GenerateRequest, GenerativeModel, StreamResponse};
use crate::types::{ChatMessage, ContentPart, MessageRole, ProviderKind, StreamChunk, ToolCall};

const PROVIDER: &str = "openai-responses";

pub struct OpenAiResponsesClient {
    transport: AuthenticatedTransport,
    base_url: String,
    model: String,
}

impl OpenAiResponsesClient {
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
        let (instructions, input) = convert_input(&request.messages);
        let mut body = json!({
            "model": self.model,
            "input": input,
            "stream": stream,
        });
        if let Some(instructions) = instructions {
            body["instructions"] = json!(instructions);
        }

        let options = &request.options;
        if let Some(max_tokens) = options.max_tokens {
            body["max_output_tokens"] = json!(max_tokens);
        }
        if let Some(temperature) = options.temperature {
            body["temperature"] = json!(temperature);
        }
        if !options.tool_list().is_empty() {
            let tools: Vec<Value> = options
                .tool_list()
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters(),
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

#[async_trait]
impl GenerativeModel for OpenAiResponsesClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAiResponses
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
        let url = format!("{}/responses", self.base_url);
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
            let value: Value = response.json().await?;
            return Ok(complete(output_chunks(&value)));
        }

        let batches = sse_data(response).map(|data| data.and_then(|data| stream_event(&data)));
        Ok(into_response(batches, cancel))
    }
}

/// System text goes to `instructions`; everything else becomes input items
fn convert_input(messages: &[ChatMessage]) -> (Option<String>, Vec<Value>) {
    let mut instructions: Vec<String> = Vec::new();
    let mut input = Vec::new();

    for message in messages {
        let text = message.joined_text();
        if message.role == MessageRole::System {
            instructions.push(text);
            continue;
        }
        for part in message.parts() {
            match part {
                ContentPart::ToolUse { id, name, input: args } => input.push(json!({
                    "type": "function_call",
                    "call_id": id,
                    "name": name,
                    "arguments": args.to_string(),
                })),
                ContentPart::ToolResult { tool_use_id, content } => input.push(json!({
                    "type": "function_call_output",
                    "call_id": tool_use_id,
                    "output": content,
                })),
                ContentPart::Text { .. } => {}
            }
        }
        if !text.is_empty() || message.parts().is_empty() {
            input.push(json!({ "role": message.role.to_string(), "content": text }));
        }
    }

    let instructions = (!instructions.is_empty()).then(|| instructions.join("\n"));
    (instructions, input)
}

fn function_call(item: &Value) -> Option<ToolCall> {
    if item["type"] != "function_call" {
        return None;
    }
    let id = item["call_id"].as_str().or_else(|| item["id"].as_str())?;
    let name = item["name"].as_str()?;
    Some(ToolCall::new(
        id,
        name,
        parse_arguments(item["arguments"].as_str().unwrap_or_default()),
    ))
}

/// Chunks from a complete (non-streamed) response object
fn output_chunks(response: &Value) -> Vec<StreamChunk> {
    let mut chunks = Vec::new();
    for item in response["output"].as_array().into_iter().flatten() {
        match item["type"].as_str() {
            Some("message") => {
                for content in item["content"].as_array().into_iter().flatten() {
                    if let Some(text) = content["text"].as_str().filter(|t| !t.is_empty()) {
                        chunks.push(StreamChunk::text(text));
                    }
                }
            }
            Some("function_call") => {
                if let Some(call) = function_call(item) {
                    chunks.push(StreamChunk::tool_call(call));
                }
            }
            _ => {}
        }
    }
    chunks
}

/// Chunks for one streamed event; unknown event types yield nothing
fn stream_event(data: &str) -> ProviderResult<Vec<StreamChunk>> {
    let event: Value = serde_json::from_str(data)?;
    let chunks = match event["type"].as_str().unwrap_or_default() {
        "response.output_text.delta" => event["delta"]
            .as_str()
            .filter(|d| !d.is_empty())
            .map(|d| vec![StreamChunk::text(d)])
            .unwrap_or_default(),
        "response.output_item.added" if event["item"]["type"] == "function_call" => {
            vec![StreamChunk::ToolCallDelta {
                id: event["item"]["call_id"].as_str().unwrap_or_default().to_string(),
                name: event["item"]["name"].as_str().map(str::to_string),
                input_delta: None,
            }]
        }
        "response.function_call_arguments.delta" => vec![StreamChunk::ToolCallDelta {
            id: event["item_id"].as_str().unwrap_or_default().to_string(),
            name: None,
            input_delta: event["delta"].as_str().map(str::to_string),
        }],
        "response.output_item.done" => function_call(&event["item"])
            .map(|call| vec![StreamChunk::tool_call(call)])
            .unwrap_or_default(),
        "response.failed" => {
            let message = event["response"]["error"]["message"]
                .as_str()
                .unwrap_or("response failed");
            return Err(ProviderError::Stream(message.to_string()));
        }
        "error" => {
            let message = event["message"].as_str().unwrap_or("unknown error");
            return Err(ProviderError::Stream(message.to_string()));
        }
        _ => Vec::new(),
    };
    Ok(chunks)
}
