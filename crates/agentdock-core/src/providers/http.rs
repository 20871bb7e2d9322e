//! Response helpers shared by the generation clients

use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use reqwest::Response;
use tokio_util::sync::CancellationToken;

use super::error::{ProviderError, ProviderResult};
use super::traits::StreamResponse;
use crate::types::StreamChunk;

/// Largest slice of an error body carried in an error message
pub(crate) const MAX_ERROR_BODY: usize = 512;

/// At most [`MAX_ERROR_BODY`] bytes of an error body
///
/// Stops reading once the limit is reached, so a server that keeps the body
/// open cannot hold the caller past its status line.
pub(crate) async fn read_error_body(mut response: Response) -> String {
    let mut buf: Vec<u8> = Vec::with_capacity(MAX_ERROR_BODY);
    while buf.len() < MAX_ERROR_BODY {
        match response.chunk().await {
            Ok(Some(chunk)) => buf.extend_from_slice(&chunk),
            _ => break,
        }
    }
    buf.truncate(MAX_ERROR_BODY);

    let text = match std::str::from_utf8(&buf) {
        Ok(text) => text,
        Err(e) => std::str::from_utf8(&buf[..e.valid_up_to()]).unwrap_or_default(),
    };
    text.trim().to_string()
}

/// Turn a non-2xx response into an API error
pub(crate) async fn ensure_success(provider: &str, response: Response) -> ProviderResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = read_error_body(response).await;
    Err(ProviderError::api_error(provider, status.as_u16(), body))
}

/// Data payloads of a server-sent event body, `[DONE]` markers dropped
pub(crate) fn sse_data(response: Response) -> impl Stream<Item = ProviderResult<String>> + Send {
    response
        .bytes_stream()
        .eventsource()
        .filter_map(|event| async move {
            match event {
                Ok(event) if event.data.is_empty() || event.data == "[DONE]" => None,
                Ok(event) => Some(Ok(event.data)),
                Err(e) => Some(Err(ProviderError::Stream(e.to_string()))),
            }
        })
}

/// Flatten per-event chunk batches and stop when `cancel` fires
pub(crate) fn into_response<S>(batches: S, cancel: CancellationToken) -> StreamResponse
where
    S: Stream<Item = ProviderResult<Vec<StreamChunk>>> + Send + 'static,
{
    let chunks = batches.flat_map(|batch| {
        let items: Vec<ProviderResult<StreamChunk>> = match batch {
            Ok(chunks) => chunks.into_iter().map(Ok).collect(),
            Err(e) => vec![Err(e)],
        };
        futures::stream::iter(items)
    });
    Box::pin(chunks.take_until(cancel.cancelled_owned()))
}

/// Stream over an already complete answer
pub(crate) fn complete(chunks: Vec<StreamChunk>) -> StreamResponse {
    Box::pin(futures::stream::iter(chunks.into_iter().map(Ok)))
}
