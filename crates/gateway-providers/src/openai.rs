//! OpenAI provider adapter.
//!
//! Speaks the chat-completions API over reqwest. The wire types are shared
//! with the Azure adapter, which serves the same dialect from a different
//! URL scheme.

use async_stream::try_stream;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures_util::StreamExt;
use gateway_core::{
    ChatChunk, ChatCompletionRequest, Choice, ChunkChoice, ChunkDelta, FinishReason, GatewayError,
    GatewayOutput, GatewayResponse, GatewayResult, LLMProvider, MessageContent, MessageRole,
    ProviderDescriptor, ProviderKind, ResponseMessage, ToolCallPayload, Usage,
};
use reqwest::{Client, RequestBuilder};
use reqwest_eventsource::{Event, EventSource};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Default OpenAI API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// OpenAI adapter configuration.
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// API key sent as a bearer token
    pub api_key: SecretString,
    /// Base URL, overridable for proxies and tests
    pub base_url: String,
    /// Per-attempt HTTP timeout
    pub timeout: Duration,
}

impl OpenAIConfig {
    /// Create a configuration with the default base URL.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: crate::registry::DEFAULT_TIMEOUT,
        }
    }

    /// Override the base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the per-attempt timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build a configuration from a descriptor.
    ///
    /// # Errors
    /// Fails when neither the descriptor nor `OPENAI_API_KEY` supplies a key.
    pub fn from_descriptor(
        descriptor: &ProviderDescriptor,
        timeout: Duration,
    ) -> GatewayResult<Self> {
        let api_key =
            crate::registry::resolve_api_key(descriptor.api_key.clone(), "OPENAI_API_KEY")?;
        Ok(Self {
            api_key,
            base_url: descriptor
                .endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout,
        })
    }
}

/// OpenAI provider adapter.
pub struct OpenAIProvider {
    config: OpenAIConfig,
    client: Client,
}

impl OpenAIProvider {
    /// Create the adapter.
    ///
    /// # Errors
    /// Returns an internal error if the HTTP client cannot be built.
    pub fn new(config: OpenAIConfig) -> GatewayResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::internal(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn request_builder(&self, wire: &WireRequest) -> RequestBuilder {
        self.client
            .post(self.completions_url())
            .bearer_auth(self.config.api_key.expose_secret())
            .json(wire)
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    async fn chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> GatewayResult<GatewayResponse> {
        let wire = build_wire_request(request, false);
        debug!(model = %request.model, url = %self.completions_url(), "sending chat completion");

        let response = self
            .request_builder(&wire)
            .send()
            .await
            .map_err(|e| map_transport_error(self.kind(), &e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(map_status_error(self.kind(), status, &body));
        }

        let wire_response: WireResponse = response
            .json()
            .await
            .map_err(|e| map_transport_error(self.kind(), &e))?;

        normalize_response(wire_response, self.kind())
    }

    async fn chat_completion_stream(
        &self,
        request: &ChatCompletionRequest,
    ) -> GatewayResult<BoxStream<'static, GatewayResult<ChatChunk>>> {
        let wire = build_wire_request(request, true);
        debug!(model = %request.model, "opening chat completion stream");

        let event_source = EventSource::new(self.request_builder(&wire)).map_err(|e| {
            GatewayError::streaming(format!("failed to open event source: {e}"))
        })?;

        Ok(openai_chunk_stream(event_source, self.kind()))
    }
}

// ============================================================================
// Shared OpenAI-dialect wire types (also used by the Azure adapter)
// ============================================================================

#[derive(Debug, Serialize)]
pub(crate) struct WireRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    n: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<gateway_translate::openai::Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<gateway_translate::openai::WireToolChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<serde_json::Value>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: String,
    content: MessageContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

/// Map the unified request into the OpenAI wire shape.
///
/// The streaming mode is forced by the entry point, never taken from the
/// request's own flag. The token limit is taken from whichever dialect name
/// carries it.
pub(crate) fn build_wire_request(request: &ChatCompletionRequest, stream: bool) -> WireRequest {
    WireRequest {
        model: request.model.clone(),
        messages: request
            .messages
            .iter()
            .map(|m| WireMessage {
                role: m.role.to_string(),
                content: m.content.clone(),
                name: m.name.clone(),
            })
            .collect(),
        temperature: request.temperature,
        top_p: request.top_p,
        n: request.n,
        max_completion_tokens: request.token_limit(),
        tools: request
            .tools
            .as_ref()
            .map(|tools| tools.iter().map(gateway_translate::openai::encode_tool).collect()),
        tool_choice: request
            .tool_choice
            .as_ref()
            .map(gateway_translate::openai::encode_tool_choice),
        response_format: request
            .response_format
            .as_ref()
            .map(|rf| serde_json::json!({"type": rf.format_type})),
        metadata: request.metadata.clone(),
        stream,
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireResponse {
    id: String,
    #[serde(default)]
    created: i64,
    #[serde(default)]
    model: String,
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    index: u32,
    message: WireResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunctionCall,
}

#[derive(Debug, Deserialize)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

pub(crate) fn map_finish_reason(reason: &str) -> Option<FinishReason> {
    match reason {
        "stop" => Some(FinishReason::Stop),
        "length" => Some(FinishReason::Length),
        "tool_calls" | "function_call" => Some(FinishReason::ToolCalls),
        "content_filter" => Some(FinishReason::ContentFilter),
        _ => None,
    }
}

/// Normalize an OpenAI-dialect response and attach the output tag.
///
/// # Errors
/// Returns [`GatewayError::EmptyResponse`] when no choices came back.
pub(crate) fn normalize_response(
    wire: WireResponse,
    kind: ProviderKind,
) -> GatewayResult<GatewayResponse> {
    if wire.choices.is_empty() {
        return Err(GatewayError::empty_response(kind.as_str()));
    }

    let choices: Vec<Choice> = wire
        .choices
        .into_iter()
        .map(|c| Choice {
            index: c.index,
            message: ResponseMessage {
                role: MessageRole::Assistant,
                content: c.message.content,
                tool_calls: c.message.tool_calls.map(|calls| {
                    calls
                        .into_iter()
                        .map(|tc| ToolCallPayload {
                            id: tc.id,
                            name: tc.function.name,
                            arguments: tc.function.arguments,
                        })
                        .collect()
                }),
            },
            finish_reason: c.finish_reason.as_deref().and_then(map_finish_reason),
        })
        .collect();

    let output = choices.first().and_then(GatewayOutput::from_choice);

    Ok(GatewayResponse {
        id: wire.id,
        model: wire.model,
        created: wire.created,
        provider: kind,
        choices,
        usage: wire.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }),
        output,
    })
}

#[derive(Debug, Deserialize)]
struct WireErrorBody {
    error: WireErrorDetail,
}

#[derive(Debug, Deserialize)]
struct WireErrorDetail {
    message: String,
    #[serde(default)]
    code: Option<String>,
}

/// Map a non-success HTTP response into a provider error, preserving the
/// status and vendor error code for the retry classifier.
pub(crate) fn map_status_error(kind: ProviderKind, status: u16, body: &str) -> GatewayError {
    let (message, code) = match serde_json::from_str::<WireErrorBody>(body) {
        Ok(parsed) => (parsed.error.message, parsed.error.code),
        Err(_) => (format!("HTTP {status}: {body}"), None),
    };
    GatewayError::provider(kind.as_str(), message, Some(status), code)
}

/// Map a reqwest transport failure, tagging timeouts and connection drops
/// with the codes the retry classifier looks for.
pub(crate) fn map_transport_error(kind: ProviderKind, error: &reqwest::Error) -> GatewayError {
    let code = if error.is_timeout() {
        Some("timeout".to_string())
    } else if error.is_connect() {
        Some("connection_reset".to_string())
    } else {
        None
    };
    GatewayError::provider(
        kind.as_str(),
        format!("request failed: {error}"),
        error.status().map(|s| s.as_u16()),
        code,
    )
}

// ============================================================================
// Streaming
// ============================================================================

#[derive(Debug, Deserialize)]
struct WireChunk {
    id: String,
    #[serde(default)]
    created: i64,
    #[serde(default)]
    model: String,
    choices: Vec<WireChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct WireChunkChoice {
    index: u32,
    delta: WireChunkDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireChunkDelta {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

/// Decode an OpenAI-dialect SSE stream into gateway chunks.
///
/// Lazy and pull-based; the stream ends on the `[DONE]` sentinel.
pub(crate) fn openai_chunk_stream(
    event_source: EventSource,
    kind: ProviderKind,
) -> BoxStream<'static, GatewayResult<ChatChunk>> {
    let stream = try_stream! {
        let mut es = event_source;
        while let Some(event) = es.next().await {
            match event {
                Ok(Event::Open) => trace!("stream opened"),
                Ok(Event::Message(msg)) => {
                    let data = msg.data.trim();
                    if data == "[DONE]" {
                        break;
                    }
                    match serde_json::from_str::<WireChunk>(data) {
                        Ok(chunk) => {
                            yield ChatChunk {
                                id: chunk.id,
                                model: chunk.model,
                                created: chunk.created,
                                provider: kind,
                                choices: chunk
                                    .choices
                                    .into_iter()
                                    .map(|c| ChunkChoice {
                                        index: c.index,
                                        delta: ChunkDelta {
                                            role: c.delta.role.as_deref().and_then(|r| match r {
                                                "assistant" => Some(MessageRole::Assistant),
                                                "user" => Some(MessageRole::User),
                                                "system" => Some(MessageRole::System),
                                                _ => None,
                                            }),
                                            content: c.delta.content,
                                        },
                                        finish_reason: c
                                            .finish_reason
                                            .as_deref()
                                            .and_then(map_finish_reason),
                                    })
                                    .collect(),
                            };
                        }
                        Err(e) => warn!(error = %e, data = %data, "failed to parse chunk"),
                    }
                }
                Err(e) => {
                    Err(GatewayError::streaming(format!("stream error: {e}")))?;
                }
            }
        }
    };
    Box::pin(stream)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_core::{ChatMessage, ToolChoice, ToolSpec};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request_with_tools() -> ChatCompletionRequest {
        ChatCompletionRequest::builder()
            .model("gpt-4")
            .message(ChatMessage::user("look up the weather"))
            .max_completion_tokens(128)
            .tools(vec![ToolSpec::new("lookup").with_description("find things")])
            .tool_choice(ToolChoice::Auto)
            .build()
            .unwrap()
    }

    fn provider_for(server: &MockServer) -> OpenAIProvider {
        OpenAIProvider::new(OpenAIConfig::new("test-key").with_base_url(server.uri())).unwrap()
    }

    fn completion_body(choices: serde_json::Value) -> serde_json::Value {
        serde_json::json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1_700_000_000,
            "model": "gpt-4",
            "choices": choices,
            "usage": {"prompt_tokens": 5, "completion_tokens": 7, "total_tokens": 12}
        })
    }

    #[test]
    fn wire_request_forces_stream_mode() {
        let mut request = request_with_tools();
        request.stream = true;

        let wire = build_wire_request(&request, false);
        let json = serde_json::to_value(&wire).unwrap();
        assert_eq!(json["stream"], false);
        assert_eq!(json["max_completion_tokens"], 128);
        assert_eq!(json["tools"][0]["type"], "function");
        assert_eq!(json["tool_choice"], "auto");
    }

    #[test]
    fn wire_request_uses_anthropic_token_limit_when_present() {
        let request = ChatCompletionRequest::builder()
            .model("gpt-4")
            .message(ChatMessage::user("hi"))
            .max_tokens(64)
            .build()
            .unwrap();
        let wire = build_wire_request(&request, false);
        let json = serde_json::to_value(&wire).unwrap();
        assert_eq!(json["max_completion_tokens"], 64);
    }

    #[tokio::test]
    async fn completion_success_attaches_text_output() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(serde_json::json!({"stream": false})))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(
                serde_json::json!([{
                    "index": 0,
                    "message": {"role": "assistant", "content": "sunny"},
                    "finish_reason": "stop"
                }]),
            )))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let response = provider.chat_completion(&request_with_tools()).await.unwrap();

        assert_eq!(response.provider, ProviderKind::OpenAi);
        assert_eq!(response.first_text(), Some("sunny"));
        assert_eq!(
            response.output,
            Some(GatewayOutput::Text {
                content: "sunny".to_string()
            })
        );
        assert_eq!(response.usage.unwrap().total_tokens, 12);
    }

    #[tokio::test]
    async fn tool_call_output_uses_last_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(
                serde_json::json!([{
                    "index": 0,
                    "message": {
                        "role": "assistant",
                        "content": null,
                        "tool_calls": [
                            {"id": "call_1", "type": "function",
                             "function": {"name": "first", "arguments": "{}"}},
                            {"id": "call_2", "type": "function",
                             "function": {"name": "lookup", "arguments": "{\"city\":\"oslo\"}"}}
                        ]
                    },
                    "finish_reason": "tool_calls"
                }]),
            )))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let response = provider.chat_completion(&request_with_tools()).await.unwrap();

        match response.output.unwrap() {
            GatewayOutput::ToolCalls { calls } => {
                assert_eq!(calls.len(), 1);
                assert_eq!(calls[0].tool_name, "lookup");
                assert_eq!(calls[0].arguments, serde_json::json!({"city": "oslo"}));
            }
            GatewayOutput::Text { .. } => panic!("expected tool calls"),
        }
    }

    #[tokio::test]
    async fn empty_choices_is_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(completion_body(serde_json::json!([]))),
            )
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let err = provider
            .chat_completion(&request_with_tools())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::EmptyResponse { .. }));
    }

    #[tokio::test]
    async fn rate_limit_preserves_status_and_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": {"message": "Rate limit reached", "type": "requests",
                          "code": "rate_limit_exceeded"}
            })))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let err = provider
            .chat_completion(&request_with_tools())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(429));
        assert_eq!(err.error_code(), Some("rate_limit_exceeded"));
    }

    #[tokio::test]
    async fn bad_request_is_terminal_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {"message": "Invalid model", "type": "invalid_request_error", "code": null}
            })))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let err = provider
            .chat_completion(&request_with_tools())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(400));
        assert!(err.to_string().contains("Invalid model"));
    }

    #[tokio::test]
    async fn stream_yields_chunks_until_done() {
        let server = MockServer::start().await;
        let body = concat!(
            "data: {\"id\":\"c1\",\"created\":1,\"model\":\"gpt-4\",\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\",\"content\":\"Mock\"},\"finish_reason\":null}]}\n\n",
            "data: {\"id\":\"c1\",\"created\":1,\"model\":\"gpt-4\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\" stream\"},\"finish_reason\":\"stop\"}]}\n\n",
            "data: [DONE]\n\n",
        );
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(serde_json::json!({"stream": true})))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_raw(body, "text/event-stream"),
            )
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let mut stream = provider
            .chat_completion_stream(&request_with_tools())
            .await
            .unwrap();

        let mut contents = Vec::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.unwrap();
            if let Some(text) = &chunk.choices[0].delta.content {
                contents.push(text.clone());
            }
        }
        assert_eq!(contents, vec!["Mock".to_string(), " stream".to_string()]);
    }
}
